//! Persistent download history (SQLite via sqlx).
//!
//! One row per submission of a task; status transitions update the newest
//! open row (no end time) for the task URL. Rows survive restarts and feed
//! startup rehydration, per-URL history, and aggregate statistics.

mod db;
mod error;
mod records;
mod types;

pub use db::HistoryStore;
pub use error::StorageError;
pub use types::*;
