//! Group storage repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};

use chatledger_api::GroupId;

use super::model::Group;
use crate::Result;

/// Repository for group storage and retrieval.
#[derive(Debug, Clone)]
pub struct GroupRepository {
    pool: SqlitePool,
}

impl GroupRepository {
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
            CREATE TABLE IF NOT EXISTS groups (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                image_url TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Upsert one group, keyed by remote id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn upsert(&self, group: &Group) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO groups (id, name, image_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                image_url = excluded.image_url,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at
            ",
        )
        .bind(group.id.as_str())
        .bind(&group.name)
        .bind(&group.image_url)
        .bind(group.created_at.to_rfc3339())
        .bind(group.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Upsert a batch of groups. Replay-safe.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn upsert_batch(&self, groups: &[Group]) -> Result<()> {
        for group in groups {
            self.upsert(group).await?;
        }
        Ok(())
    }

    /// Find a group by remote id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find(&self, id: &GroupId) -> Result<Option<Group>> {
        let row = sqlx::query(
            r"
            SELECT id, name, image_url, created_at, updated_at
            FROM groups
            WHERE id = ?
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().and_then(map_group))
    }

    /// List all known groups, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<Group>> {
        let rows = sqlx::query(
            r"
            SELECT id, name, image_url, created_at, updated_at
            FROM groups
            ORDER BY name
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(map_group).collect())
    }
}

fn map_group(row: &SqliteRow) -> Option<Group> {
    Some(Group {
        id: GroupId::new(row.get::<String, _>("id")),
        name: row.get("name"),
        image_url: row.get("image_url"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
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

    fn group(id: &str, name: &str) -> Group {
        Group {
            id: GroupId::new(id),
            name: name.to_owned(),
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_and_find() {
        let repo = GroupRepository::in_memory().await.unwrap();

        repo.upsert(&group("g1", "Climbing")).await.unwrap();

        let found = repo.find(&GroupId::new("g1")).await.unwrap().unwrap();
        assert_eq!(found.name, "Climbing");
        assert!(repo.find(&GroupId::new("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_overwrites_on_conflict() {
        let repo = GroupRepository::in_memory().await.unwrap();

        repo.upsert(&group("g1", "Old name")).await.unwrap();
        repo.upsert(&group("g1", "New name")).await.unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "New name");
    }

    #[tokio::test]
    async fn list_orders_by_name() {
        let repo = GroupRepository::in_memory().await.unwrap();

        repo.upsert_batch(&[group("g2", "Beta"), group("g1", "Alpha")])
            .await
            .unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|g| g.name).collect();
        assert_eq!(names, ["Alpha", "Beta"]);
    }
}
