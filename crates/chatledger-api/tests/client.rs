//! Integration tests for the API client.
//!
//! These tests run the client against a local TCP listener serving
//! canned HTTP responses, without a real remote server. The listener
//! captures each request head so query parameters can be asserted.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use chatledger_api::{AccessToken, ApiClient, Cursor, Error, GroupId};

/// Serve one canned response per connection, in order, and capture the
/// request heads the client sends.
async fn canned_server(responses: Vec<String>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&requests);

    tokio::spawn(async move {
        let mut responses: VecDeque<String> = responses.into();
        while let Some(response) = responses.pop_front() {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let mut head = String::new();
            let mut buf = vec![0_u8; 4096];
            loop {
                let Ok(n) = stream.read(&mut buf).await else {
                    break;
                };
                if n == 0 {
                    break;
                }
                head.push_str(&String::from_utf8_lossy(&buf[..n]));
                if head.contains("\r\n\r\n") {
                    break;
                }
            }
            captured.lock().unwrap().push(head);
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (format!("http://{addr}"), requests)
}

fn http_response(status_line: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn client_for(base_url: &str) -> ApiClient {
    ApiClient::new()
        .with_base_url(base_url)
        .with_page_delay(Duration::ZERO)
}

fn token() -> AccessToken {
    AccessToken::new("t")
}

#[tokio::test]
async fn messages_page_parses_envelope_and_sends_cursor_params() {
    let body = r#"{"response":{"messages":[
        {"id":"2","group_id":"g1","user_id":"u1","name":"Alice",
         "text":"hi","favorited_by":["u2"],"created_at":200},
        {"id":"1","group_id":"g1","user_id":"u1","name":"Alice",
         "created_at":100}
    ]}}"#;
    let (base_url, requests) = canned_server(vec![http_response("200 OK", body)]).await;
    let client = client_for(&base_url);

    let page = client
        .messages_page(&token(), &GroupId::new("g1"), &Cursor::Before("42".to_owned()))
        .await
        .unwrap();

    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, "2");
    assert_eq!(page[0].favorited_by, vec!["u2"]);
    assert_eq!(page[1].id, "1");
    assert!(page[1].text.is_none());

    let head = requests.lock().unwrap()[0].clone();
    assert!(head.starts_with("GET /groups/g1/messages?"));
    assert!(head.contains("token=t"));
    assert!(head.contains("limit=100"));
    assert!(head.contains("before_id=42"));
}

#[tokio::test]
async fn messages_page_sends_after_cursor_for_forward_paging() {
    let body = r#"{"response":{"messages":[]}}"#;
    let (base_url, requests) = canned_server(vec![http_response("200 OK", body)]).await;
    let client = client_for(&base_url);

    let page = client
        .messages_page(&token(), &GroupId::new("g1"), &Cursor::After("5".to_owned()))
        .await
        .unwrap();

    assert!(page.is_empty());
    let head = requests.lock().unwrap()[0].clone();
    assert!(head.contains("after_id=5"));
    assert!(!head.contains("before_id"));
}

#[tokio::test]
async fn non_200_message_page_reads_as_end_of_data() {
    let (base_url, _requests) =
        canned_server(vec![http_response("500 Internal Server Error", "oops")]).await;
    let client = client_for(&base_url);

    let page = client
        .messages_page(&token(), &GroupId::new("g1"), &Cursor::None)
        .await
        .unwrap();

    assert!(page.is_empty());
}

#[tokio::test]
async fn groups_page_parses_envelope_and_sends_offset_params() {
    let body = r#"{"response":[
        {"id":"g1","name":"Climbing","image_url":null,"created_at":100,"updated_at":200}
    ]}"#;
    let (base_url, requests) = canned_server(vec![http_response("200 OK", body)]).await;
    let client = client_for(&base_url);

    let page = client.groups_page(&token(), 2).await.unwrap();

    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, "g1");
    assert_eq!(page[0].name, "Climbing");

    let head = requests.lock().unwrap()[0].clone();
    assert!(head.starts_with("GET /groups?"));
    assert!(head.contains("page=2"));
    assert!(head.contains("per_page=100"));
}

#[tokio::test]
async fn non_200_group_page_reads_as_end_of_listing() {
    let (base_url, _requests) = canned_server(vec![http_response("404 Not Found", "")]).await;
    let client = client_for(&base_url);

    let page = client.groups_page(&token(), 1).await.unwrap();
    assert!(page.is_empty());
}

#[tokio::test]
async fn current_user_parses_the_authenticated_user() {
    let body = r#"{"response":{"id":"u1","name":"Alice","email":"alice@example.com",
        "image_url":"https://i.example/a.png"}}"#;
    let (base_url, requests) = canned_server(vec![http_response("200 OK", body)]).await;
    let client = client_for(&base_url);

    let user = client.current_user(&token()).await.unwrap();
    assert_eq!(user.id, "u1");
    assert_eq!(user.email, "alice@example.com");

    let head = requests.lock().unwrap()[0].clone();
    assert!(head.starts_with("GET /users/me?"));
    assert!(head.contains("token=t"));
}

#[tokio::test]
async fn current_user_surfaces_non_200_as_a_status_error() {
    let (base_url, _requests) =
        canned_server(vec![http_response("401 Unauthorized", "")]).await;
    let client = client_for(&base_url);

    let err = client.current_user(&token()).await.unwrap_err();
    assert!(matches!(err, Error::Status { status: 401 }));
}
