//! Observable scheduler output: per-task transitions and queue counters.

use serde::Serialize;

use crate::task::{DownloadStatus, DownloadTask};

/// One status transition of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskEvent {
    pub url: String,
    pub status: DownloadStatus,
    pub retries: u32,
    pub max_retries: u32,
    pub error_message: Option<String>,
    pub output_path: Option<String>,
}

impl TaskEvent {
    pub fn from_task(task: &DownloadTask) -> Self {
        Self {
            url: task.url().to_string(),
            status: task.status,
            retries: task.retries,
            max_retries: task.max_retries,
            error_message: task.error_message.clone(),
            output_path: task.output_path.clone(),
        }
    }
}

/// Sizes of the scheduler's collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub queued: usize,
    pub active: usize,
    pub scheduled: usize,
    pub completed: usize,
    pub failed: usize,
}

impl QueueCounts {
    /// Nothing left to run now or later.
    pub fn is_idle(&self) -> bool {
        self.queued == 0 && self.active == 0 && self.scheduled == 0
    }
}
