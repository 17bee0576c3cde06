//! Errors raised by the history store.

/// The history database could not be opened, read, or written.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("history database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("history directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("locate history directory: {0}")]
    Location(String),
}
