//! # chatledger-core
//!
//! Sync engine and local storage for the chatledger message cache.
//!
//! This crate provides:
//! - SQLite repositories for groups, messages, and cache runs
//! - Record normalization from raw remote payloads
//! - The sync strategy selector (full backfill vs incremental)
//! - The cache-run lifecycle with its once-per-day eligibility guard
//! - Detached asynchronous run execution
//!
//! A cache run is created synchronously (validate + persist), then
//! executed in a detached task. Within one run paging is strictly
//! sequential; runs for different groups may execute concurrently, and
//! all persistence is idempotent upsert-by-remote-id, so replays are
//! safe.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod db;
mod error;
pub mod group;
pub mod message;
pub mod run;
pub mod service;
mod time;

pub use chatledger_api::{AccessToken, GroupId};
pub use error::{Error, Result};
pub use group::{Group, GroupRepository, normalize_group};
pub use message::{Message, MessageRepository, normalize_message};
pub use run::{CacheRun, EligibilityError, RunId, RunRepository};
pub use service::SyncEngine;
