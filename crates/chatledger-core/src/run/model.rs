//! Cache run data model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use chatledger_api::GroupId;

/// Unique identifier for a cache run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RunId(pub i64);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One synchronization attempt for one group.
///
/// Created by the eligibility check, executed asynchronously, and
/// marked ended exactly once when the attempt completes. A run with no
/// end time is still running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheRun {
    /// Run id.
    pub id: RunId,
    /// Group this run synchronizes.
    pub group_id: GroupId,
    /// When the run was created.
    pub started_at: DateTime<Utc>,
    /// When the attempt completed. `None` while running.
    pub ended_at: Option<DateTime<Utc>>,
    /// Remote user id of the initiating credential.
    pub started_by: String,
}

impl CacheRun {
    /// Whether the run is still executing.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Whether the run has ended, as observed at `now`: the end time
    /// is present and not in the future.
    #[must_use]
    pub fn is_ended(&self, now: DateTime<Utc>) -> bool {
        self.ended_at.is_some_and(|ended| ended <= now)
    }
}
