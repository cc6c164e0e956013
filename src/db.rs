use std::path::Path;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// The `users` table. `AUTOINCREMENT` guarantees ids are strictly increasing
/// and never reused after a delete. `created_at` defaults to RFC 3339 text so
/// it round-trips through sqlx's `OffsetDateTime` decoding.
const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
)
"#;

/// Open the SQLite database at `path`, creating the file and its parent
/// directory if absent.
pub async fn connect(path: &Path) -> anyhow::Result<SqlitePool> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create data directory {}", dir.display()))?;
    }
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("open database {}", path.display()))?;
    Ok(pool)
}

/// Create the schema if it does not exist yet. Safe to run on every start.
pub async fn init_schema(db: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(CREATE_USERS_TABLE)
        .execute(db)
        .await
        .context("initialize users table")?;
    Ok(())
}

/// In-memory pool for tests. A single connection keeps every query on the
/// same private in-memory database.
#[cfg(test)]
pub async fn connect_in_memory() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(SqliteConnectOptions::new().in_memory(true))
        .await
        .expect("open in-memory database");
    init_schema(&pool).await.expect("initialize schema");
    pool
}
