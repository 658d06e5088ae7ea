//! Message storage repository.
//!
//! All writes go through idempotent upsert-by-remote-id, so replaying
//! an overlapping batch (a retried run, a backfill crossing an earlier
//! incremental sync) never duplicates records or double-counts
//! favorites. Nothing here deletes messages.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::debug;

use chatledger_api::GroupId;

use super::model::{Message, favorite_count};
use crate::Result;

/// Repository for cached message storage and retrieval.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    /// Create a repository on a shared pool.
    ///
    /// Creates the table and indexes if they don't exist.
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
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                group_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                sender_name TEXT NOT NULL DEFAULT '',
                avatar_url TEXT,
                text TEXT,
                favorited_by TEXT NOT NULL DEFAULT '[]',
                favorites_count INTEGER NOT NULL DEFAULT 0,
                attachments TEXT NOT NULL DEFAULT 'null',
                raw TEXT NOT NULL DEFAULT 'null',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Indexes for the incremental-sync cursor and the read side
        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_messages_group_created
            ON messages(group_id, created_at)
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_messages_group_favorites
            ON messages(group_id, favorites_count)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Upsert a batch of messages, keyed by remote message id.
    ///
    /// Insert if absent, overwrite every mapped column if present.
    /// The favorite count is recomputed from the favorited-by list at
    /// bind time, so a caller-built message with a stale count cannot
    /// persist an inconsistent pair.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or a database query fails.
    pub async fn upsert_batch(&self, messages: &[Message]) -> Result<()> {
        for message in messages {
            self.upsert(message).await?;
        }
        debug!(count = messages.len(), "upserted message batch");
        Ok(())
    }

    async fn upsert(&self, message: &Message) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO messages
                (id, group_id, user_id, sender_name, avatar_url, text,
                 favorited_by, favorites_count, attachments, raw, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                group_id = excluded.group_id,
                user_id = excluded.user_id,
                sender_name = excluded.sender_name,
                avatar_url = excluded.avatar_url,
                text = excluded.text,
                favorited_by = excluded.favorited_by,
                favorites_count = excluded.favorites_count,
                attachments = excluded.attachments,
                raw = excluded.raw,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at
            ",
        )
        .bind(&message.id)
        .bind(message.group_id.as_str())
        .bind(&message.user_id)
        .bind(&message.sender_name)
        .bind(&message.avatar_url)
        .bind(&message.text)
        .bind(serde_json::to_string(&message.favorited_by)?)
        .bind(favorite_count(&message.favorited_by))
        .bind(serde_json::to_string(&message.attachments)?)
        .bind(serde_json::to_string(&message.raw)?)
        .bind(message.created_at.to_rfc3339())
        .bind(message.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Id of the most recently created stored message for a group, the
    /// cursor an incremental sync resumes from.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn latest_message_id(&self, group_id: &GroupId) -> Result<Option<String>> {
        let row = sqlx::query(
            r"
            SELECT id FROM messages
            WHERE group_id = ?
            ORDER BY created_at DESC
            LIMIT 1
            ",
        )
        .bind(group_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row.get("id")))
    }

    /// Number of stored messages for a group.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count(&self, group_id: &GroupId) -> Result<i64> {
        let row = sqlx::query(r"SELECT COUNT(*) as count FROM messages WHERE group_id = ?")
            .bind(group_id.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("count"))
    }

    /// Most recent messages for a group, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn recent(&self, group_id: &GroupId, limit: i64) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            r"
            SELECT id, group_id, user_id, sender_name, avatar_url, text,
                   favorited_by, favorites_count, attachments, raw, created_at, updated_at
            FROM messages
            WHERE group_id = ?
            ORDER BY created_at DESC
            LIMIT ?
            ",
        )
        .bind(group_id.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(map_message).collect())
    }

    /// Most favorited messages for a group, ties broken oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn most_favorited(
        &self,
        group_id: &GroupId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            r"
            SELECT id, group_id, user_id, sender_name, avatar_url, text,
                   favorited_by, favorites_count, attachments, raw, created_at, updated_at
            FROM messages
            WHERE group_id = ?
            ORDER BY favorites_count DESC, created_at ASC
            LIMIT ? OFFSET ?
            ",
        )
        .bind(group_id.as_str())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(map_message).collect())
    }
}

fn map_message(row: &SqliteRow) -> Option<Message> {
    let favorited_by: Vec<String> =
        serde_json::from_str(&row.get::<String, _>("favorited_by")).ok()?;

    Some(Message {
        id: row.get("id"),
        group_id: GroupId::new(row.get::<String, _>("group_id")),
        user_id: row.get("user_id"),
        sender_name: row.get("sender_name"),
        avatar_url: row.get("avatar_url"),
        text: row.get("text"),
        favorites_count: favorite_count(&favorited_by),
        favorited_by,
        attachments: serde_json::from_str(&row.get::<String, _>("attachments")).ok()?,
        raw: serde_json::from_str(&row.get::<String, _>("raw")).ok()?,
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
    })
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
