//! `vidq purge` – drop old history rows.

use anyhow::Result;
use std::time::Duration;
use vidq_core::history::HistoryStore;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

pub async fn run_purge(db: &HistoryStore, days: u64) -> Result<()> {
    let removed = db
        .purge(Duration::from_secs(days.saturating_mul(SECS_PER_DAY)))
        .await?;
    tracing::info!(removed, days, "history purged");
    println!("Removed {removed} history row(s) older than {days} day(s).");
    Ok(())
}
