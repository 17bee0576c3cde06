//! `vidq status` – show the most recent downloads.

use anyhow::Result;
use vidq_core::history::HistoryStore;

use super::local_time;

pub async fn run_status(db: &HistoryStore, limit: u32) -> Result<()> {
    let rows = db.recent(limit).await?;
    if rows.is_empty() {
        println!("No downloads in history.");
        return Ok(());
    }
    println!(
        "{:<6} {:<12} {:<7} {:<15} {:<19} {}",
        "ID", "STATUS", "TRIES", "PLATFORM", "ADDED", "URL"
    );
    for r in rows {
        println!(
            "{:<6} {:<12} {:<7} {:<15} {:<19} {}",
            r.id,
            r.status.as_str(),
            format!("{}/{}", r.retries, r.max_retries),
            r.platform.as_deref().unwrap_or("-"),
            local_time(Some(r.created_at)),
            r.url
        );
        if let Some(err) = &r.error_message {
            println!("       error: {err}");
        }
    }
    Ok(())
}
