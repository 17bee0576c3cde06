//! Download task model: one requested video download and its lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of automatic retries after the first failed attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Lifecycle status of a task, stored as a lowercase string in the history table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Pending,
    Queued,
    InProgress,
    Completed,
    Failed,
    Scheduled,
}

impl DownloadStatus {
    pub const ALL: [DownloadStatus; 6] = [
        DownloadStatus::Pending,
        DownloadStatus::Queued,
        DownloadStatus::InProgress,
        DownloadStatus::Completed,
        DownloadStatus::Failed,
        DownloadStatus::Scheduled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DownloadStatus::Pending => "pending",
            DownloadStatus::Queued => "queued",
            DownloadStatus::InProgress => "in_progress",
            DownloadStatus::Completed => "completed",
            DownloadStatus::Failed => "failed",
            DownloadStatus::Scheduled => "scheduled",
        }
    }

    /// Parse a persisted status. Unknown strings map to `Failed` so a corrupt
    /// row stays visible instead of being silently re-run.
    pub fn parse_persisted(s: &str) -> Self {
        match s {
            "pending" => DownloadStatus::Pending,
            "queued" => DownloadStatus::Queued,
            "in_progress" => DownloadStatus::InProgress,
            "completed" => DownloadStatus::Completed,
            "failed" => DownloadStatus::Failed,
            "scheduled" => DownloadStatus::Scheduled,
            _ => DownloadStatus::Failed,
        }
    }

    /// Terminal statuses accept no further automatic transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, DownloadStatus::Completed | DownloadStatus::Failed)
    }
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requested (or finished) download.
///
/// `url` is the natural identity of a task: the scheduler keys its active set
/// by it and the history store matches open rows on it. Every other field is
/// mutated only by the scheduler or the history store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTask {
    url: String,
    pub download_path: String,
    pub video_format: String,
    pub resolution: String,
    pub platform: Option<String>,
    pub status: DownloadStatus,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub retries: u32,
    pub max_retries: u32,
    pub error_message: Option<String>,
    /// Final saved file, set once the executor reports success.
    pub output_path: Option<String>,
}

impl DownloadTask {
    pub fn new(
        url: impl Into<String>,
        download_path: impl Into<String>,
        video_format: impl Into<String>,
        resolution: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            download_path: download_path.into(),
            video_format: video_format.into(),
            resolution: resolution.into(),
            platform: None,
            status: DownloadStatus::Pending,
            scheduled_time: None,
            retries: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            error_message: None,
            output_path: None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_scheduled_time(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_time = Some(at);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// True while another automatic attempt is allowed after a failure.
    pub fn can_retry(&self) -> bool {
        self.retries < self.max_retries
    }

    /// True when `scheduled_time` lies strictly after `now`.
    pub fn is_deferred(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_time.map(|at| at > now).unwrap_or(false)
    }
}
