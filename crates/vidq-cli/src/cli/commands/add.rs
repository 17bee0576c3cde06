//! `vidq add <url>` – validate a download and record it for the next run.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use std::path::PathBuf;
use vidq_core::config::VidqConfig;
use vidq_core::history::HistoryStore;
use vidq_core::platform::PlatformCatalog;
use vidq_core::scheduler::validate_task;
use vidq_core::task::{DownloadStatus, DownloadTask};

#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    pub url: String,
    pub dir: Option<PathBuf>,
    pub format: Option<String>,
    pub resolution: Option<String>,
    pub max_retries: Option<u32>,
    pub at: Option<String>,
}

pub async fn run_add(db: &HistoryStore, cfg: &VidqConfig, opts: AddOptions) -> Result<()> {
    let dir = match opts.dir.or_else(|| cfg.download_dir.clone()) {
        Some(dir) => dir,
        None => std::env::current_dir().context("resolve current directory")?,
    };
    let mut task = DownloadTask::new(
        opts.url.trim(),
        dir.to_string_lossy(),
        opts.format.unwrap_or_else(|| cfg.default_format.clone()),
        opts.resolution
            .unwrap_or_else(|| cfg.default_resolution.clone()),
    )
    .with_max_retries(opts.max_retries.unwrap_or(cfg.max_retries));

    let catalog = PlatformCatalog::builtin();
    let platform = validate_task(&task, &catalog)?;
    if !platform.supports_format(&task.video_format) {
        println!(
            "Note: {} lists {} as supported formats; requesting {} anyway.",
            platform.name,
            platform.supported_formats.join(", "),
            task.video_format
        );
    }
    task.platform = Some(platform.name.clone());

    if let Some(newest) = db.history_for(task.url()).await?.first() {
        if !newest.status.is_terminal() {
            anyhow::bail!(
                "{} is already {} (run `vidq cancel` first to replace it)",
                task.url(),
                newest.status
            );
        }
    }

    let at = opts.at.as_deref().map(parse_at).transpose()?;
    match at {
        Some(at) if at > Utc::now() => {
            task.scheduled_time = Some(at);
            task.status = DownloadStatus::Scheduled;
        }
        _ => task.status = DownloadStatus::Pending,
    }

    let id = db.record(&task).await?;
    tracing::info!(id, url = %task.url(), status = %task.status, "download added");
    match task.scheduled_time {
        Some(at) => println!(
            "Scheduled download {id} ({}) for {}: {}",
            platform.name,
            at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            task.url()
        ),
        None => println!("Added download {id} ({}): {}", platform.name, task.url()),
    }
    Ok(())
}

/// Parse `--at`: RFC 3339 with offset, or a naive local date-time.
pub(crate) fn parse_at(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .ok_or_else(|| anyhow::anyhow!("{s} does not exist in the local time zone"));
        }
    }
    anyhow::bail!("invalid time {s:?}: expected RFC 3339 or \"YYYY-MM-DD HH:MM[:SS]\"")
}
