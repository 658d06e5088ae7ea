//! Message synchronization engine.
//!
//! [`SyncEngine`] ties the remote pager to local storage. Starting a
//! cache run is synchronous and fast: validate eligibility, persist
//! the run record, dispatch a detached task, return. The detached
//! execution looks the run and its group up fresh by id (only the id
//! and the credential cross the async boundary), picks the sync
//! strategy, pages, normalizes, upserts, and marks the run ended.
//!
//! A paging truncation (non-200 or transport failure mid-history) is
//! not an execution failure: whatever accumulated is persisted and the
//! run still ends. Only a storage failure leaves a run in the running
//! state, for an external re-dispatch to retry; upserts are idempotent
//! so the replay is safe.

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use chatledger_api::{AccessToken, GroupId, PageSource, pager};

use crate::error::{Error, Result};
use crate::group::{Group, GroupRepository, normalize_group};
use crate::message::{Message, MessageRepository, normalize_message};
use crate::run::{CacheRun, RunId, RunRepository};

/// The sync engine: strategy selection, run lifecycle, and dispatch.
///
/// Generic over the page source so tests drive it with a scripted
/// in-memory remote.
#[derive(Debug, Clone)]
pub struct SyncEngine<S> {
    source: S,
    groups: GroupRepository,
    messages: MessageRepository,
    runs: RunRepository,
}

impl<S> SyncEngine<S>
where
    S: PageSource + Clone + Send + Sync + 'static,
{
    /// Assemble an engine from a page source and repositories.
    pub const fn new(
        source: S,
        groups: GroupRepository,
        messages: MessageRepository,
        runs: RunRepository,
    ) -> Self {
        Self {
            source,
            groups,
            messages,
            runs,
        }
    }

    /// Start a cache run for a group.
    ///
    /// Creates the run record (the eligibility guard runs atomically
    /// with the insert), dispatches detached execution, and returns
    /// the accepted run immediately. The caller observes completion
    /// only by re-reading the run's end timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GroupNotFound`] for an unknown group,
    /// [`Error::Ineligible`] when the guard rejects the run, or a
    /// database error.
    pub async fn start_run(
        &self,
        group_id: &GroupId,
        started_by: &str,
        token: &AccessToken,
    ) -> Result<CacheRun> {
        let now = Utc::now();
        let group = self
            .groups
            .find(group_id)
            .await?
            .ok_or_else(|| Error::GroupNotFound(group_id.clone()))?;

        let run = self
            .runs
            .create(&group.id, started_by, now, None, now)
            .await?;
        info!(run = %run.id, group = %group.id, "cache run accepted");

        self.dispatch(run.id, token.clone());
        Ok(run)
    }

    /// Dispatch detached execution of a run.
    ///
    /// Fire-and-forget: the handle is returned for callers that want
    /// to await completion (tests do), but nothing requires it.
    pub fn dispatch(&self, run_id: RunId, token: AccessToken) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            if let Err(err) = engine.execute_run(run_id, &token).await {
                error!(run = %run_id, %err, "cache run execution failed");
            }
        })
    }

    /// Execute a run to completion.
    ///
    /// Looks the run and its group up fresh by id, synchronizes, and
    /// marks the run ended.
    ///
    /// # Errors
    ///
    /// Returns an error if the run or group cannot be found or a
    /// storage operation fails. Paging failures do not surface here.
    pub async fn execute_run(&self, run_id: RunId, token: &AccessToken) -> Result<()> {
        let run = self
            .runs
            .find(run_id)
            .await?
            .ok_or(Error::RunNotFound(run_id))?;
        let group = self
            .groups
            .find(&run.group_id)
            .await?
            .ok_or_else(|| Error::GroupNotFound(run.group_id.clone()))?;

        self.sync_group(&group, token).await?;

        self.runs.mark_ended(run_id, Utc::now()).await?;
        info!(run = %run_id, group = %group.id, "cache run ended");
        Ok(())
    }

    /// Synchronize one group's messages.
    ///
    /// Zero stored messages means full backfill: page backward from
    /// the newest message with no lower bound. Otherwise incremental:
    /// page forward from the most recently created stored message, so
    /// each run's cost is bounded by new activity.
    ///
    /// # Errors
    ///
    /// Returns an error if a storage operation fails.
    pub async fn sync_group(&self, group: &Group, token: &AccessToken) -> Result<()> {
        let raw = match self.messages.latest_message_id(&group.id).await? {
            Some(after_id) => {
                debug!(group = %group.id, after_id, "incremental sync from latest stored message");
                pager::fetch_messages_since(&self.source, token, &group.id, &after_id).await
            }
            None => {
                debug!(group = %group.id, "no stored messages, full backfill");
                pager::fetch_all_messages(&self.source, token, &group.id).await
            }
        };

        if raw.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let batch: Vec<Message> = raw.iter().map(|record| normalize_message(record, now)).collect();
        self.messages.upsert_batch(&batch).await?;
        info!(group = %group.id, count = batch.len(), "messages cached");
        Ok(())
    }

    /// Refresh the locally known groups from the remote listing.
    ///
    /// # Errors
    ///
    /// Returns an error if a storage operation fails.
    pub async fn sync_groups(&self, token: &AccessToken) -> Result<()> {
        let raw = pager::fetch_groups(&self.source, token).await;
        let batch: Vec<Group> = raw.iter().map(normalize_group).collect();
        self.groups.upsert_batch(&batch).await?;
        info!(count = batch.len(), "groups cached");
        Ok(())
    }

    /// The group repository this engine persists into.
    #[must_use]
    pub const fn groups(&self) -> &GroupRepository {
        &self.groups
    }

    /// The message repository this engine persists into.
    #[must_use]
    pub const fn messages(&self) -> &MessageRepository {
        &self.messages
    }

    /// The run repository this engine records lifecycle in.
    #[must_use]
    pub const fn runs(&self) -> &RunRepository {
        &self.runs
    }
}
