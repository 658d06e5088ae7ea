//! Message data model and normalization.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use chatledger_api::{GroupId, RawMessage};

use crate::time::datetime_from_epoch;

/// A cached chat message.
///
/// `favorites_count` is derived from `favorited_by` and recomputed on
/// every write; it is never trusted from input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    /// Remote message id, unique key, immutable.
    pub id: String,
    /// Owning group.
    pub group_id: GroupId,
    /// Sending user's remote id.
    pub user_id: String,
    /// Sender display name snapshot.
    pub sender_name: String,
    /// Sender avatar URL.
    pub avatar_url: Option<String>,
    /// Message body text.
    pub text: Option<String>,
    /// User ids who favorited the message.
    pub favorited_by: Vec<String>,
    /// Derived favorite count; always `favorited_by.len()`.
    pub favorites_count: u32,
    /// Structured attachments blob.
    pub attachments: Value,
    /// Original raw payload, kept for forward compatibility.
    pub raw: Value,
    /// Creation time from the remote record, authoritative for ordering.
    pub created_at: DateTime<Utc>,
    /// Local time of the last upsert.
    pub updated_at: DateTime<Utc>,
}

/// Derived favorite count for a favorited-by list.
pub(crate) fn favorite_count(favorited_by: &[String]) -> u32 {
    u32::try_from(favorited_by.len()).unwrap_or(u32::MAX)
}

/// Map a raw remote message record into the persisted shape.
///
/// Pure: remote id becomes the primary key, epoch seconds become a UTC
/// timestamp, the favorite count is derived from the favorited-by
/// list, and the entire raw payload is carried through.
#[must_use]
pub fn normalize_message(raw: &RawMessage, now: DateTime<Utc>) -> Message {
    Message {
        id: raw.id.clone(),
        group_id: GroupId::new(raw.group_id.clone()),
        user_id: raw.user_id.clone(),
        sender_name: raw.name.clone(),
        avatar_url: raw.avatar_url.clone(),
        text: raw.text.clone(),
        favorited_by: raw.favorited_by.clone(),
        favorites_count: favorite_count(&raw.favorited_by),
        attachments: raw.attachments.clone(),
        raw: raw.raw.clone(),
        created_at: datetime_from_epoch(raw.created_at),
        updated_at: now,
    }
}
