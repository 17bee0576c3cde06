//! History read operations: recent rows, per-URL history, statistics.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::BTreeMap;

use super::super::db::{from_unix, HistoryStore};
use super::super::error::StorageError;
use super::super::types::{HistoryRecord, HistoryStats};
use crate::task::DownloadStatus;

const RECORD_COLUMNS: &str = r#"
    id, url, platform, download_path, video_format, resolution, status,
    scheduled_time, start_time, end_time, error_message, retries,
    max_retries, output_path, created_at
"#;

impl HistoryStore {
    /// Up to `limit` most recently created rows, newest first.
    pub async fn recent(&self, limit: u32) -> Result<Vec<HistoryRecord>, StorageError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM downloads ORDER BY created_at DESC, id DESC LIMIT ?1"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(record_from_row).collect())
    }

    /// The newest row of every URL whose newest row is still unfinished
    /// (pending, queued, in_progress or scheduled), newest first. Not bounded:
    /// an interrupted task is found however far back it was added.
    pub async fn unfinished(&self) -> Result<Vec<HistoryRecord>, StorageError> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS} FROM downloads AS d
            WHERE d.end_time IS NULL
              AND d.status IN ('pending', 'queued', 'in_progress', 'scheduled')
              AND NOT EXISTS (
                SELECT 1 FROM downloads AS n
                WHERE n.url = d.url
                  AND (n.created_at > d.created_at
                       OR (n.created_at = d.created_at AND n.id > d.id))
              )
            ORDER BY d.created_at DESC, d.id DESC
            "#
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(record_from_row).collect())
    }

    /// Every row recorded for `url`, newest first.
    pub async fn history_for(&self, url: &str) -> Result<Vec<HistoryRecord>, StorageError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM downloads WHERE url = ?1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql).bind(url).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(record_from_row).collect())
    }

    /// Totals, today's count (local calendar date), and counts per status.
    pub async fn stats(&self) -> Result<HistoryStats, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS count
            FROM downloads
            GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        let mut status_counts = BTreeMap::new();
        for row in rows {
            let status: String = row.get("status");
            let count: i64 = row.get("count");
            status_counts.insert(status, count);
        }

        let total_downloads: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM downloads")
            .fetch_one(&self.pool)
            .await?;

        let today_downloads: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM downloads
            WHERE date(created_at, 'unixepoch', 'localtime') = date('now', 'localtime')
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(HistoryStats {
            total_downloads,
            today_downloads,
            status_counts,
        })
    }
}

fn record_from_row(row: &SqliteRow) -> HistoryRecord {
    let status_str: String = row.get("status");
    let scheduled_time: Option<i64> = row.get("scheduled_time");
    let start_time: Option<i64> = row.get("start_time");
    let end_time: Option<i64> = row.get("end_time");
    let retries: i64 = row.get("retries");
    let max_retries: i64 = row.get("max_retries");
    let created_at: i64 = row.get("created_at");

    HistoryRecord {
        id: row.get("id"),
        url: row.get("url"),
        platform: row.get("platform"),
        download_path: row.get("download_path"),
        video_format: row.get("video_format"),
        resolution: row.get("resolution"),
        status: DownloadStatus::parse_persisted(&status_str),
        scheduled_time: scheduled_time.map(from_unix),
        start_time: start_time.map(from_unix),
        end_time: end_time.map(from_unix),
        error_message: row.get("error_message"),
        retries: u32::try_from(retries).unwrap_or(0),
        max_retries: u32::try_from(max_retries).unwrap_or(0),
        output_path: row.get("output_path"),
        created_at: from_unix(created_at),
    }
}
