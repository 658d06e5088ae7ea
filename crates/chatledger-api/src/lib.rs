//! # chatledger-api
//!
//! Async client for the remote group-chat HTTP API.
//!
//! This crate owns the wire side of the cache: it issues single page
//! requests ([`ApiClient`]), parses the JSON envelopes into typed raw
//! records ([`types`]), and drives cursor pagination to exhaustion
//! ([`pager`]). It knows nothing about local storage; downstream crates
//! normalize and persist the records it returns.
//!
//! Pagination against this API is cursor-based for messages
//! (`before_id` / `after_id`) and offset-based for the groups listing
//! (`page`). An empty page signals the end of data, and so does any
//! non-200 status on a paging endpoint.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod client;
mod error;
pub mod pager;
pub mod types;

pub use client::ApiClient;
pub use error::{Error, Result};
pub use pager::{Cursor, PageSource, fetch_all_messages, fetch_groups, fetch_messages_since};
pub use types::{AccessToken, GroupId, RawGroup, RawMessage, RawUser};
