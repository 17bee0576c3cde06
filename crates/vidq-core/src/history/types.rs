//! Types returned by the history store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::task::{DownloadStatus, DownloadTask};

/// Row identifier in the `downloads` table.
pub type RecordId = i64;

/// One persisted submission of a task.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryRecord {
    pub id: RecordId,
    pub url: String,
    pub platform: Option<String>,
    pub download_path: String,
    pub video_format: String,
    pub resolution: String,
    pub status: DownloadStatus,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub retries: u32,
    pub max_retries: u32,
    pub output_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// Rebuild the live task this row describes.
    pub fn to_task(&self) -> DownloadTask {
        let mut task = DownloadTask::new(
            self.url.clone(),
            self.download_path.clone(),
            self.video_format.clone(),
            self.resolution.clone(),
        )
        .with_max_retries(self.max_retries);
        task.platform = self.platform.clone();
        task.status = self.status;
        task.scheduled_time = self.scheduled_time;
        task.retries = self.retries.min(self.max_retries);
        task.error_message = self.error_message.clone();
        task.output_path = self.output_path.clone();
        task
    }
}

/// Aggregate counters over the whole table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub total_downloads: i64,
    /// Rows created today, by local calendar date.
    pub today_downloads: i64,
    /// Row count per persisted status string (e.g. "completed").
    pub status_counts: BTreeMap<String, i64>,
}
