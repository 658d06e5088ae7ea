//! Cache run storage repository.

use chrono::{DateTime, Duration, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::{debug, warn};

use chatledger_api::GroupId;

use super::eligibility::{EligibilityError, validate_window};
use super::model::{CacheRun, RunId};
use crate::{Error, Result};

/// Repository for cache run storage and the eligibility guard.
#[derive(Debug, Clone)]
pub struct RunRepository {
    pool: SqlitePool,
}

impl RunRepository {
    /// Create a repository on a shared pool.
    ///
    /// Creates the table if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema
    /// creation fails.
    pub async fn in_memory() -> Result<Self> {
        Self::new(crate::db::connect_in_memory().await?).await
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS cache_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                group_id TEXT NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT,
                started_by TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_cache_runs_group_started
            ON cache_runs(group_id, started_at)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Create a cache run, enforcing eligibility.
    ///
    /// The trailing-day exclusion and the insert are one guarded SQL
    /// statement, so concurrent creation requests for the same group
    /// admit exactly one run. Nothing is persisted on rejection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Ineligible`] with every violated rule, or a
    /// database error.
    pub async fn create(
        &self,
        group_id: &GroupId,
        started_by: &str,
        started_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<CacheRun> {
        validate_window(started_at, ended_at, now).map_err(Error::Ineligible)?;

        let cutoff = (now - Duration::hours(24)).to_rfc3339();
        let result = sqlx::query(
            r"
            INSERT INTO cache_runs (group_id, started_at, ended_at, started_by)
            SELECT ?, ?, ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM cache_runs
                WHERE group_id = ? AND started_at >= ?
            )
            ",
        )
        .bind(group_id.as_str())
        .bind(started_at.to_rfc3339())
        .bind(ended_at.map(|ts| ts.to_rfc3339()))
        .bind(started_by)
        .bind(group_id.as_str())
        .bind(&cutoff)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::Ineligible(vec![
                EligibilityError::AlreadyCachedToday,
            ]));
        }

        let id = RunId(result.last_insert_rowid());
        debug!(run = %id, group = %group_id, "cache run created");
        Ok(CacheRun {
            id,
            group_id: group_id.clone(),
            started_at,
            ended_at,
            started_by: started_by.to_owned(),
        })
    }

    /// Find a run by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find(&self, id: RunId) -> Result<Option<CacheRun>> {
        let row = sqlx::query(
            r"
            SELECT id, group_id, started_at, ended_at, started_by
            FROM cache_runs
            WHERE id = ?
            ",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().and_then(map_run))
    }

    /// The most recently started run for a group, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn last_for_group(&self, group_id: &GroupId) -> Result<Option<CacheRun>> {
        let row = sqlx::query(
            r"
            SELECT id, group_id, started_at, ended_at, started_by
            FROM cache_runs
            WHERE group_id = ?
            ORDER BY started_at DESC
            LIMIT 1
            ",
        )
        .bind(group_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().and_then(map_run))
    }

    /// Whether any run for the group started within the trailing 24
    /// hours of `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn exists_in_trailing_day(
        &self,
        group_id: &GroupId,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let cutoff = (now - Duration::hours(24)).to_rfc3339();
        let row = sqlx::query(
            r"
            SELECT COUNT(*) as count FROM cache_runs
            WHERE group_id = ? AND started_at >= ?
            ",
        )
        .bind(group_id.as_str())
        .bind(&cutoff)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("count") > 0)
    }

    /// Mark a run ended. Transitions at most once; a second call is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn mark_ended(&self, id: RunId, now: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE cache_runs
            SET ended_at = ?
            WHERE id = ? AND ended_at IS NULL
            ",
        )
        .bind(now.to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(run = %id, "mark_ended on a run that is not running");
        }
        Ok(())
    }
}

fn map_run(row: &SqliteRow) -> Option<CacheRun> {
    Some(CacheRun {
        id: RunId(row.get("id")),
        group_id: GroupId::new(row.get::<String, _>("group_id")),
        started_at: parse_timestamp(&row.get::<String, _>("started_at"))?,
        ended_at: row
            .get::<Option<String>, _>("ended_at")
            .as_deref()
            .and_then(parse_timestamp),
        started_by: row.get("started_by"),
    })
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gid() -> GroupId {
        GroupId::new("g1")
    }

    #[tokio::test]
    async fn create_and_find() {
        let repo = RunRepository::in_memory().await.unwrap();
        let now = Utc::now();

        let run = repo.create(&gid(), "u1", now, None, now).await.unwrap();
        assert!(run.is_running());

        let found = repo.find(run.id).await.unwrap().unwrap();
        assert_eq!(found.group_id, gid());
        assert_eq!(found.started_by, "u1");
        assert!(found.ended_at.is_none());
    }

    #[tokio::test]
    async fn rejects_future_start() {
        let repo = RunRepository::in_memory().await.unwrap();
        let now = Utc::now();

        let err = repo
            .create(&gid(), "u1", now + Duration::minutes(1), None, now)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Ineligible(reasons) if reasons == vec![EligibilityError::StartInFuture]
        ));

        // No record persists after a rejection.
        assert!(!repo.exists_in_trailing_day(&gid(), now).await.unwrap());
    }

    #[tokio::test]
    async fn rejects_end_not_after_start() {
        let repo = RunRepository::in_memory().await.unwrap();
        let now = Utc::now();
        let start = now - Duration::minutes(5);

        let err = repo
            .create(&gid(), "u1", start, Some(start), now)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Ineligible(reasons) if reasons == vec![EligibilityError::EndBeforeStart]
        ));
    }

    #[tokio::test]
    async fn rejects_second_run_within_trailing_day() {
        let repo = RunRepository::in_memory().await.unwrap();
        let now = Utc::now();

        repo.create(&gid(), "u1", now - Duration::hours(2), None, now)
            .await
            .unwrap();

        let err = repo.create(&gid(), "u2", now, None, now).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Ineligible(reasons) if reasons == vec![EligibilityError::AlreadyCachedToday]
        ));

        // A different group is unaffected.
        repo.create(&GroupId::new("g2"), "u1", now, None, now)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn accepts_run_more_than_a_day_after_the_last() {
        let repo = RunRepository::in_memory().await.unwrap();
        let now = Utc::now();

        repo.create(&gid(), "u1", now - Duration::hours(25), None, now)
            .await
            .unwrap();

        repo.create(&gid(), "u1", now, None, now).await.unwrap();
    }

    #[tokio::test]
    async fn mark_ended_transitions_once() {
        let repo = RunRepository::in_memory().await.unwrap();
        let now = Utc::now();

        let run = repo
            .create(&gid(), "u1", now - Duration::minutes(1), None, now)
            .await
            .unwrap();

        let first_end = now;
        repo.mark_ended(run.id, first_end).await.unwrap();
        repo.mark_ended(run.id, first_end + Duration::minutes(10))
            .await
            .unwrap();

        let found = repo.find(run.id).await.unwrap().unwrap();
        assert_eq!(
            found.ended_at.unwrap().timestamp(),
            first_end.timestamp()
        );
        assert!(found.is_ended(first_end + Duration::minutes(1)));
    }

    #[tokio::test]
    async fn last_for_group_returns_most_recent() {
        let repo = RunRepository::in_memory().await.unwrap();
        let now = Utc::now();

        repo.create(&gid(), "u1", now - Duration::hours(30), None, now)
            .await
            .unwrap();
        let newer = repo
            .create(&gid(), "u1", now - Duration::hours(1), None, now)
            .await
            .unwrap();

        let last = repo.last_for_group(&gid()).await.unwrap().unwrap();
        assert_eq!(last.id, newer.id);
    }
}
