//! `vidq history <url>` – every recorded submission of one URL.

use anyhow::Result;
use vidq_core::history::HistoryStore;

use super::local_time;

pub async fn run_history(db: &HistoryStore, url: &str) -> Result<()> {
    let rows = db.history_for(url.trim()).await?;
    if rows.is_empty() {
        println!("No history for {url}");
        return Ok(());
    }
    println!(
        "{:<6} {:<12} {:<7} {:<19} {:<19} {:<19}",
        "ID", "STATUS", "TRIES", "ADDED", "STARTED", "FINISHED"
    );
    for r in &rows {
        println!(
            "{:<6} {:<12} {:<7} {:<19} {:<19} {:<19}",
            r.id,
            r.status.as_str(),
            format!("{}/{}", r.retries, r.max_retries),
            local_time(Some(r.created_at)),
            local_time(r.start_time),
            local_time(r.end_time)
        );
        if let Some(at) = r.scheduled_time {
            println!("       scheduled for {}", local_time(Some(at)));
        }
        if let Some(path) = &r.output_path {
            println!("       saved to {path}");
        }
        if let Some(err) = &r.error_message {
            println!("       error: {err}");
        }
    }
    Ok(())
}
