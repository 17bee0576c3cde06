//! `vidq run` – restore queued work from history and process it until idle.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use vidq_core::config::VidqConfig;
use vidq_core::executor::{ExecutorRouter, YtDlpExecutor};
use vidq_core::history::HistoryStore;
use vidq_core::scheduler::{Scheduler, SchedulerOptions, TaskEvent};
use vidq_core::task::DownloadStatus;

use crate::cli::control_socket;

pub async fn run_scheduler(
    db: &HistoryStore,
    cfg: &VidqConfig,
    jobs: Option<usize>,
    retry_failed: bool,
) -> Result<()> {
    let mut options = SchedulerOptions::from_config(cfg);
    if let Some(jobs) = jobs {
        options.max_concurrent = jobs;
    }
    let executor =
        ExecutorRouter::new().with_fallback(Arc::new(YtDlpExecutor::new(&cfg.yt_dlp_path)));
    let scheduler = Scheduler::new(db.clone(), Arc::new(executor), options)?;
    let mut events = scheduler.subscribe();

    let socket_path = vidq_core::control::default_control_socket_path().ok();
    let listener = socket_path.as_ref().and_then(|path| {
        match control_socket::spawn_control_listener(scheduler.clone(), path) {
            Ok(handle) => {
                tracing::debug!(path = %path.display(), "control socket listening");
                Some(handle)
            }
            Err(e) => {
                tracing::warn!("control socket unavailable: {:#}", e);
                None
            }
        }
    });

    let restored = scheduler.restore(cfg.history_restore_limit).await?;
    tracing::info!(?restored, "restore finished");
    if retry_failed {
        let n = scheduler.retry_failed().await;
        if n > 0 {
            println!("Retrying {n} failed download(s).");
        }
    }

    let start = scheduler.counts();
    if start.is_idle() {
        println!("No queued downloads.");
    } else {
        println!(
            "{} queued, {} running, {} scheduled (max {} at once).",
            start.queued,
            start.active,
            start.scheduled,
            scheduler.concurrency_limit().await
        );

        let idle = scheduler.wait_idle();
        tokio::pin!(idle);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        loop {
            tokio::select! {
                ev = events.recv() => match ev {
                    Ok(ev) => print_event(&ev),
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!("skipped {} queue events", n);
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = &mut idle => {
                    while let Ok(ev) = events.try_recv() {
                        print_event(&ev);
                    }
                    break;
                }
                _ = &mut ctrl_c => {
                    println!("Interrupted; unfinished downloads resume on the next run.");
                    break;
                }
            }
        }

        let end = scheduler.counts();
        println!("{} completed, {} failed.", end.completed, end.failed);
    }

    if let Some(handle) = listener {
        handle.abort();
    }
    if let Some(path) = socket_path {
        let _ = std::fs::remove_file(path);
    }
    Ok(())
}

fn print_event(ev: &TaskEvent) {
    match ev.status {
        DownloadStatus::InProgress => println!("start      {}", ev.url),
        DownloadStatus::Completed => println!(
            "done       {} -> {}",
            ev.url,
            ev.output_path.as_deref().unwrap_or("?")
        ),
        DownloadStatus::Queued if ev.retries > 0 => println!(
            "retry {}/{}  {}: {}",
            ev.retries,
            ev.max_retries,
            ev.url,
            ev.error_message.as_deref().unwrap_or("unknown error")
        ),
        DownloadStatus::Failed => println!(
            "failed     {}: {}",
            ev.url,
            ev.error_message.as_deref().unwrap_or("unknown error")
        ),
        DownloadStatus::Queued | DownloadStatus::Scheduled | DownloadStatus::Pending => {
            tracing::debug!(url = %ev.url, status = %ev.status, "queue event");
        }
    }
}
