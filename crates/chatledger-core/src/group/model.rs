//! Group data model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use chatledger_api::{GroupId, RawGroup};

use crate::time::datetime_from_epoch;

/// A remote chat group mirrored into local storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    /// Remote group id, immutable after creation.
    pub id: GroupId,
    /// Group display name.
    pub name: String,
    /// Group image URL.
    pub image_url: Option<String>,
    /// Creation time, from the remote record.
    pub created_at: DateTime<Utc>,
    /// Last remote update time.
    pub updated_at: DateTime<Utc>,
}

/// Map a raw remote group record into the persisted shape.
///
/// Pure: epoch seconds become UTC timestamps, everything else copies
/// through.
#[must_use]
pub fn normalize_group(raw: &RawGroup) -> Group {
    Group {
        id: GroupId::new(raw.id.clone()),
        name: raw.name.clone(),
        image_url: raw.image_url.clone(),
        created_at: datetime_from_epoch(raw.created_at),
        updated_at: datetime_from_epoch(raw.updated_at),
    }
}
