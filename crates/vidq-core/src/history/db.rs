//! SQLite-backed history store implementation.
//!
//! Handles connection, migrations, and timestamp helpers. Row reads and writes live in `records`.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;

use super::error::StorageError;

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Handle to the SQLite-backed download history.
///
/// The database file is stored under the XDG state directory:
/// `~/.local/state/vidq/history.db` on Debian.
#[derive(Clone)]
pub struct HistoryStore {
    pub(crate) pool: Pool<Sqlite>,
}

impl HistoryStore {
    /// Open (or create) the default history database and run migrations.
    pub async fn open_default() -> Result<Self, StorageError> {
        let state_dir =
            crate::logging::state_dir().map_err(|e| StorageError::Location(e.to_string()))?;
        Self::open_at(state_dir.join("history.db")).await
    }

    /// Open (or create) the database at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&uri)
            .await?;
        let store = HistoryStore { pool };
        store.migrate().await?;
        tracing::debug!(path = %path.display(), "history store opened");
        Ok(store)
    }

    /// Open a private in-memory database (no disk I/O), for tests and dry runs.
    pub async fn open_in_memory() -> Result<Self, StorageError> {
        // Single long-lived connection: every new in-memory connection is a fresh, empty DB.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let store = HistoryStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StorageError> {
        // All timestamps are Unix seconds (UTC).
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS downloads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                platform TEXT,
                download_path TEXT NOT NULL,
                video_format TEXT NOT NULL,
                resolution TEXT NOT NULL,
                status TEXT NOT NULL,
                scheduled_time INTEGER,
                start_time INTEGER,
                end_time INTEGER,
                error_message TEXT,
                retries INTEGER NOT NULL DEFAULT 0,
                max_retries INTEGER NOT NULL DEFAULT 3,
                output_path TEXT,
                created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS downloads_url_open
            ON downloads (url, end_time);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Close the pool, waiting for in-flight statements.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Current time as Unix seconds (for DB timestamps).
pub(crate) fn unix_timestamp() -> i64 {
    Utc::now().timestamp()
}

pub(crate) fn to_unix(at: DateTime<Utc>) -> i64 {
    at.timestamp()
}

pub(crate) fn from_unix(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
