//! Cursor pagination over the remote API.
//!
//! Each function drives a [`PageSource`] to exhaustion with an
//! explicit iterative loop and accumulator. The terminal conditions
//! are: an empty page, a transport error (logged, pagination stops and
//! the accumulated prefix is returned so the surrounding run can still
//! finish), or the source's hard page-count cap. A pacing delay runs
//! between successive requests, never before the first one.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::Result;
use crate::types::{AccessToken, GroupId, RawGroup, RawMessage};

/// Paging position within a group's message history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// No cursor: the newest page.
    None,
    /// Page backward: records older than this message id.
    Before(String),
    /// Page forward: records newer than this message id.
    After(String),
}

/// A source of remote record pages.
///
/// Implemented by [`ApiClient`](crate::ApiClient); tests script page
/// sequences with an in-memory implementation, with a zero delay so
/// loops run without real sleeps.
pub trait PageSource {
    /// Fetch one page of messages for a group at the given cursor.
    fn messages_page(
        &self,
        token: &AccessToken,
        group_id: &GroupId,
        cursor: &Cursor,
    ) -> impl Future<Output = Result<Vec<RawMessage>>> + Send;

    /// Fetch one page of the groups listing (offset paging, from 1).
    fn groups_page(
        &self,
        token: &AccessToken,
        page: u32,
    ) -> impl Future<Output = Result<Vec<RawGroup>>> + Send;

    /// Pacing delay between successive page requests.
    fn page_delay(&self) -> Duration;

    /// Hard cap on pages fetched per paging loop.
    fn max_pages(&self) -> u32;
}

/// Fetch a group's entire message history, newest to oldest.
///
/// Full-backfill paging: starts at the newest page and follows
/// `before_id` cursors (the last record of each page) with no lower
/// bound until a page comes back empty.
pub async fn fetch_all_messages<S: PageSource>(
    source: &S,
    token: &AccessToken,
    group_id: &GroupId,
) -> Vec<RawMessage> {
    let mut cursor = Cursor::None;
    let mut records = Vec::new();

    for page_no in 0..source.max_pages() {
        if page_no > 0 {
            tokio::time::sleep(source.page_delay()).await;
        }
        let page = match source.messages_page(token, group_id, &cursor).await {
            Ok(page) => page,
            Err(err) => {
                warn!(group = %group_id, error = %err, "message page fetch failed, stopping pagination");
                break;
            }
        };
        let Some(last) = page.last() else { break };
        cursor = Cursor::Before(last.id.clone());
        records.extend(page);
    }

    records
}

/// Fetch a group's messages newer than `after_id`, oldest to newest.
///
/// Incremental paging: follows `after_id` cursors (the FIRST record of
/// each page, which the API returns closest to the resume point) until
/// a page comes back empty.
pub async fn fetch_messages_since<S: PageSource>(
    source: &S,
    token: &AccessToken,
    group_id: &GroupId,
    after_id: &str,
) -> Vec<RawMessage> {
    let mut cursor = Cursor::After(after_id.to_owned());
    let mut records = Vec::new();

    for page_no in 0..source.max_pages() {
        if page_no > 0 {
            tokio::time::sleep(source.page_delay()).await;
        }
        let page = match source.messages_page(token, group_id, &cursor).await {
            Ok(page) => page,
            Err(err) => {
                warn!(group = %group_id, error = %err, "message page fetch failed, stopping pagination");
                break;
            }
        };
        let Some(first) = page.first() else { break };
        cursor = Cursor::After(first.id.clone());
        records.extend(page);
    }

    records
}

/// Fetch every group visible to the credential (offset paging).
pub async fn fetch_groups<S: PageSource>(source: &S, token: &AccessToken) -> Vec<RawGroup> {
    let mut records = Vec::new();

    for page_no in 0..source.max_pages() {
        if page_no > 0 {
            tokio::time::sleep(source.page_delay()).await;
        }
        let page = match source.groups_page(token, page_no + 1).await {
            Ok(page) => page,
            Err(err) => {
                warn!(error = %err, "group page fetch failed, stopping pagination");
                break;
            }
        };
        if page.is_empty() {
            break;
        }
        records.extend(page);
    }

    records
}
