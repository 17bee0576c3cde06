//! `vidq cancel <url>` – stop a download.
//!
//! If `vidq run` is active, asks it over the control socket. Otherwise (or if
//! the running queue does not know the URL) the open history row is marked
//! failed so the next run does not pick it up.

use anyhow::Result;
use vidq_core::history::HistoryStore;
use vidq_core::scheduler::CANCELLED_MESSAGE;
use vidq_core::task::DownloadStatus;

use crate::cli::control_socket;

pub async fn run_cancel(db: &HistoryStore, url: &str) -> Result<()> {
    let url = url.trim();
    if let Ok(path) = vidq_core::control::default_control_socket_path() {
        match control_socket::send_cancel(&path, url).await {
            Ok(Some(true)) => {
                println!("Cancelled {url}");
                return Ok(());
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("control socket: {:#}", e),
        }
    }

    let Some(newest) = db.history_for(url).await?.into_iter().next() else {
        anyhow::bail!("no download found for {url}");
    };
    if newest.status.is_terminal() {
        anyhow::bail!("{url} is already {}", newest.status);
    }
    db.update_status(
        &newest.to_task(),
        DownloadStatus::Failed,
        Some(CANCELLED_MESSAGE),
    )
    .await?;
    println!("Cancelled {url}");
    Ok(())
}
