//! CLI for the vidq video download queue.

mod commands;
mod control_socket;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use vidq_core::config;
use vidq_core::history::HistoryStore;

use commands::{
    run_add, run_cancel, run_completions, run_history, run_man, run_platforms, run_purge,
    run_scheduler, run_stats, run_status, AddOptions,
};

/// Top-level CLI for vidq.
#[derive(Debug, Parser)]
#[command(name = "vidq")]
#[command(about = "vidq: queue, schedule and retry video downloads", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Add a video to the queue (picked up by the next `vidq run`).
    Add {
        /// Video page URL (YouTube, Vimeo, Dailymotion, Twitch, Facebook).
        url: String,
        /// Directory to save into (default: config download_dir, else current directory).
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
        /// Container format, e.g. mp4 or webm (default from config).
        #[arg(long)]
        format: Option<String>,
        /// Target resolution, e.g. 720p (default from config).
        #[arg(long)]
        resolution: Option<String>,
        /// Automatic retries after the first failed attempt (default from config).
        #[arg(long, value_name = "N")]
        max_retries: Option<u32>,
        /// Do not start before this time: RFC 3339, or local "YYYY-MM-DD HH:MM[:SS]".
        #[arg(long, value_name = "TIME")]
        at: Option<String>,
    },

    /// Process the queue until nothing is left to download.
    Run {
        /// Concurrent downloads (1-10, default from config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
        /// Requeue previously failed downloads with a fresh retry budget.
        #[arg(long)]
        retry_failed: bool,
    },

    /// Show the most recent downloads.
    Status {
        /// Number of rows to show.
        #[arg(long, default_value = "20", value_name = "N")]
        limit: u32,
    },

    /// Show aggregate download statistics.
    Stats,

    /// Show every recorded attempt for one URL.
    History {
        /// Video page URL.
        url: String,
    },

    /// Delete history rows older than the given number of days.
    Purge {
        #[arg(long, default_value = "30", value_name = "N")]
        days: u64,
    },

    /// Cancel a queued, scheduled or running download.
    Cancel {
        /// Video page URL.
        url: String,
    },

    /// List supported platforms.
    Platforms,

    /// Print shell completions to stdout.
    Completions {
        shell: clap_complete::Shell,
    },

    /// Print the man page to stdout.
    Man,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        // Commands that need neither config nor history.
        match &cli.command {
            CliCommand::Platforms => return run_platforms(),
            CliCommand::Completions { shell } => return run_completions(*shell, Cli::command()),
            CliCommand::Man => return run_man(Cli::command()),
            _ => {}
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let db = HistoryStore::open_default().await?;

        match cli.command {
            CliCommand::Add {
                url,
                dir,
                format,
                resolution,
                max_retries,
                at,
            } => {
                let opts = AddOptions {
                    url,
                    dir,
                    format,
                    resolution,
                    max_retries,
                    at,
                };
                run_add(&db, &cfg, opts).await?
            }
            CliCommand::Run { jobs, retry_failed } => {
                run_scheduler(&db, &cfg, jobs, retry_failed).await?
            }
            CliCommand::Status { limit } => run_status(&db, limit).await?,
            CliCommand::Stats => run_stats(&db).await?,
            CliCommand::History { url } => run_history(&db, &url).await?,
            CliCommand::Purge { days } => run_purge(&db, days).await?,
            CliCommand::Cancel { url } => run_cancel(&db, &url).await?,
            CliCommand::Platforms | CliCommand::Completions { .. } | CliCommand::Man => {}
        }

        db.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
