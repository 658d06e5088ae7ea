//! Remote page fetcher.
//!
//! [`ApiClient`] issues one HTTP GET per call and parses the JSON
//! envelope into typed records. Paging endpoints treat a non-200
//! status the same as an empty result: the caller sees "no more data",
//! never an error. The `users/me` lookup is the exception, since it is
//! not a paging terminator.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::pager::{Cursor, PageSource};
use crate::types::{AccessToken, GroupId, RawGroup, RawMessage, RawUser};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.groupme.com/v3";

/// Default records per page.
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Default pacing delay between successive page requests.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(500);

/// Default hard cap on pages per paging loop.
pub const DEFAULT_MAX_PAGES: u32 = 10_000;

/// Envelope wrapping every remote response body.
#[derive(Deserialize)]
struct Envelope<T> {
    response: T,
}

/// Body of the messages listing. Older API variants returned the
/// array directly under `response`; that shape is a migration artifact
/// and is not accepted.
#[derive(Deserialize)]
struct MessagesBody {
    messages: Vec<Value>,
}

/// Client for the remote group-chat API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    page_limit: u32,
    page_delay: Duration,
    max_pages: u32,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiClient {
    /// Create a client against the default API base URL.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            http: reqwest::Client::new(),
            page_limit: DEFAULT_PAGE_LIMIT,
            page_delay: DEFAULT_PAGE_DELAY,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Override the API base URL (tests point this at a local server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the per-page record limit.
    #[must_use]
    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = limit;
        self
    }

    /// Override the pacing delay between page requests.
    ///
    /// Tests set this to zero so paging loops run without real sleeps.
    #[must_use]
    pub const fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// Override the hard page-count cap per paging loop.
    #[must_use]
    pub const fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Fetch one page of messages for a group.
    ///
    /// Returns records in arrival order. An empty list or any non-200
    /// status yields an empty vec, which the pager reads as the end of
    /// data.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or if a record cannot be
    /// parsed.
    pub async fn messages_page(
        &self,
        token: &AccessToken,
        group_id: &GroupId,
        cursor: &Cursor,
    ) -> Result<Vec<RawMessage>> {
        let url = format!("{}/groups/{}/messages", self.base_url, group_id);
        let mut query: Vec<(&str, String)> = vec![
            ("token", token.as_str().to_owned()),
            ("limit", self.page_limit.to_string()),
        ];
        match cursor {
            Cursor::None => {}
            Cursor::Before(id) => query.push(("before_id", id.clone())),
            Cursor::After(id) => query.push(("after_id", id.clone())),
        }

        let Some(body) = self.get_page::<Envelope<MessagesBody>>(&url, &query).await? else {
            debug!(group = %group_id, "message page unavailable, treating as end of data");
            return Ok(Vec::new());
        };
        body.response
            .messages
            .iter()
            .map(RawMessage::from_value)
            .collect()
    }

    /// Fetch one page of the groups listing (offset-style paging,
    /// `page` starts at 1).
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or if a record cannot be
    /// parsed.
    pub async fn groups_page(&self, token: &AccessToken, page: u32) -> Result<Vec<RawGroup>> {
        let url = format!("{}/groups", self.base_url);
        let query: Vec<(&str, String)> = vec![
            ("token", token.as_str().to_owned()),
            ("page", page.to_string()),
            ("per_page", self.page_limit.to_string()),
        ];

        let Some(body) = self.get_page::<Envelope<Vec<Value>>>(&url, &query).await? else {
            debug!(page, "group page unavailable, treating as end of listing");
            return Ok(Vec::new());
        };
        body.response.iter().map(RawGroup::from_value).collect()
    }

    /// Look up the authenticated user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`] on any non-200 response; this is a
    /// single lookup, not a paging terminator.
    pub async fn current_user(&self, token: &AccessToken) -> Result<RawUser> {
        let url = format!("{}/users/me", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("token", token.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::Status {
                status: status.as_u16(),
            });
        }

        let envelope: Envelope<RawUser> = response.json().await?;
        Ok(envelope.response)
    }

    /// Issue one paging GET. `None` means the page is unavailable
    /// (non-200), which paging callers treat as exhaustion.
    async fn get_page<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        let response = self.http.get(url).query(query).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            debug!(%url, status = status.as_u16(), "non-200 page response");
            return Ok(None);
        }
        Ok(Some(response.json().await?))
    }
}

impl PageSource for ApiClient {
    async fn messages_page(
        &self,
        token: &AccessToken,
        group_id: &GroupId,
        cursor: &Cursor,
    ) -> Result<Vec<RawMessage>> {
        Self::messages_page(self, token, group_id, cursor).await
    }

    async fn groups_page(&self, token: &AccessToken, page: u32) -> Result<Vec<RawGroup>> {
        Self::groups_page(self, token, page).await
    }

    fn page_delay(&self) -> Duration {
        self.page_delay
    }

    fn max_pages(&self) -> u32 {
        self.max_pages
    }
}
