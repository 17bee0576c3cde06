//! History write operations: record, update status, purge.

use std::time::Duration;

use super::super::db::{to_unix, unix_timestamp, HistoryStore};
use super::super::error::StorageError;
use super::super::types::RecordId;
use crate::task::{DownloadStatus, DownloadTask};

impl HistoryStore {
    /// Insert a new row for a task at submission time.
    ///
    /// The row stores the task's parameters and current status; it stays
    /// "open" (no end time) until the task completes.
    pub async fn record(&self, task: &DownloadTask) -> Result<RecordId, StorageError> {
        let now = unix_timestamp();
        let row_id = sqlx::query(
            r#"
            INSERT INTO downloads (
                url, platform, download_path, video_format,
                resolution, status, scheduled_time, start_time,
                end_time, error_message, retries, max_retries,
                output_path, created_at
            ) VALUES (?1, ?2, ?3, ?4,
                      ?5, ?6, ?7, NULL,
                      NULL, ?8, ?9, ?10,
                      NULL, ?11)
            "#,
        )
        .bind(task.url())
        .bind(&task.platform)
        .bind(&task.download_path)
        .bind(&task.video_format)
        .bind(&task.resolution)
        .bind(task.status.as_str())
        .bind(task.scheduled_time.map(to_unix))
        .bind(&task.error_message)
        .bind(i64::from(task.retries))
        .bind(i64::from(task.max_retries))
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(row_id)
    }

    /// Move the newest open row for the task's URL to `status`.
    ///
    /// Also persists the task's retry count, stamps `start_time` on the first
    /// `in_progress`, and stamps `end_time` (closing the row) on `completed`.
    /// Returns the number of rows changed (0 when no open row exists).
    pub async fn update_status(
        &self,
        task: &DownloadTask,
        status: DownloadStatus,
        error_message: Option<&str>,
    ) -> Result<u64, StorageError> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE downloads
            SET status = ?1,
                error_message = ?2,
                retries = ?3,
                output_path = COALESCE(?4, output_path),
                start_time = CASE
                    WHEN ?1 = 'in_progress' AND start_time IS NULL THEN ?5
                    ELSE start_time
                END,
                end_time = CASE WHEN ?1 = 'completed' THEN ?5 ELSE end_time END
            WHERE id = (
                SELECT id FROM downloads
                WHERE url = ?6 AND end_time IS NULL
                ORDER BY id DESC
                LIMIT 1
            )
            "#,
        )
        .bind(status.as_str())
        .bind(error_message)
        .bind(i64::from(task.retries))
        .bind(&task.output_path)
        .bind(now)
        .bind(task.url())
        .execute(&self.pool)
        .await?;

        Ok(r.rows_affected())
    }

    /// Delete rows created more than `older_than` ago. Returns the number removed.
    ///
    /// Maintenance only; the scheduler never calls this.
    pub async fn purge(&self, older_than: Duration) -> Result<u64, StorageError> {
        let age = i64::try_from(older_than.as_secs()).unwrap_or(i64::MAX);
        let cutoff = unix_timestamp().saturating_sub(age);
        let r = sqlx::query(
            r#"
            DELETE FROM downloads
            WHERE created_at < ?1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected())
    }
}
