//! Scheduler error types.

use crate::history::StorageError;

/// Why a task was refused at submission. Refused tasks are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("download URL is required")]
    MissingUrl,
    #[error("download path is required")]
    MissingPath,
    #[error("unsupported platform for URL: {0}")]
    UnsupportedPlatform(String),
    #[error("already queued, running or scheduled: {0}")]
    Duplicate(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Only surfaced by `restore`; other history failures are logged.
    #[error("history: {0}")]
    Storage(#[from] StorageError),
}

impl SchedulerError {
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            SchedulerError::Validation(v) => Some(v),
            _ => None,
        }
    }
}
