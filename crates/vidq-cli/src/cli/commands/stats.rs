//! `vidq stats` – aggregate counters over the whole history.

use anyhow::Result;
use vidq_core::history::HistoryStore;

pub async fn run_stats(db: &HistoryStore) -> Result<()> {
    let stats = db.stats().await?;
    println!("Total downloads: {}", stats.total_downloads);
    println!("Added today:     {}", stats.today_downloads);
    if !stats.status_counts.is_empty() {
        println!("By status:");
        for (status, count) in &stats.status_counts {
            println!("  {:<12} {}", status, count);
        }
    }
    Ok(())
}
