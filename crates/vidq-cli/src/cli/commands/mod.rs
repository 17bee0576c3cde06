//! CLI command handlers, one file per command.

mod add;
mod cancel;
mod completions;
mod history;
mod platforms;
mod purge;
mod run;
mod stats;
mod status;

pub use add::{run_add, AddOptions};
pub use cancel::run_cancel;
pub use completions::{run_completions, run_man};
pub use history::run_history;
pub use platforms::run_platforms;
pub use purge::run_purge;
pub use run::run_scheduler;
pub use stats::run_stats;
pub use status::run_status;

use chrono::{DateTime, Local, Utc};

/// Timestamp in the user's local time for table output.
pub(crate) fn local_time(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}
