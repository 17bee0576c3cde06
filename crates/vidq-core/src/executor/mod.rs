//! Download executors: the black box that fetches one video per call.
//!
//! The scheduler depends only on [`DownloadExecutor`]; concrete executors
//! (the `yt-dlp` process runner, test doubles) and the per-platform
//! [`ExecutorRouter`] implement it.

mod router;
mod ytdlp;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::control::CancelToken;
use crate::task::DownloadTask;

pub use router::ExecutorRouter;
pub use ytdlp::YtDlpExecutor;

/// Parameters for one download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub destination: PathBuf,
    pub video_format: String,
    pub resolution: String,
    pub platform: Option<String>,
}

impl DownloadRequest {
    pub fn from_task(task: &DownloadTask) -> Self {
        Self {
            url: task.url().to_string(),
            destination: PathBuf::from(&task.download_path),
            video_format: task.video_format.clone(),
            resolution: task.resolution.clone(),
            platform: task.platform.clone(),
        }
    }
}

/// Successful result: where the file landed and what it is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub file_path: PathBuf,
    pub title: String,
}

/// Why an attempt failed. Every variant except `Cancelled` is retryable.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("download cancelled")]
    Cancelled,
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no executor registered for platform {0}")]
    NoExecutor(String),
    #[error("prepare destination: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Failed(String),
}

impl ExecutorError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecutorError::Cancelled)
    }
}

/// Performs the network transfer for one task.
///
/// Implementations may try several strategies internally; the scheduler sees a
/// single call per attempt. They should return `ExecutorError::Cancelled`
/// promptly once `cancel` fires.
#[async_trait]
pub trait DownloadExecutor: Send + Sync {
    async fn download(
        &self,
        request: &DownloadRequest,
        cancel: &CancelToken,
    ) -> Result<DownloadOutcome, ExecutorError>;
}
