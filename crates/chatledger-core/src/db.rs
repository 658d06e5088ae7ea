//! SQLite connection helpers.
//!
//! Repositories share one pool; each repository creates its own tables
//! idempotently at construction, so the order they are built in does
//! not matter.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::Result;

/// Open (or create) the cache database at the given path.
///
/// # Errors
///
/// Returns an error if the database connection fails.
pub async fn connect(database_path: &str) -> Result<SqlitePool> {
    let url = format!("sqlite:{database_path}?mode=rwc");
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;
    Ok(pool)
}

/// Open an in-memory database, for tests.
///
/// A single connection keeps every repository on the same database.
///
/// # Errors
///
/// Returns an error if the database connection fails.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    Ok(pool)
}
