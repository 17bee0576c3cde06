//! Startup rehydration from the history store.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use super::{Inner, SchedulerError};
use crate::history::HistoryRecord;
use crate::task::DownloadStatus;

/// How many tasks `restore` placed in each collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RestoreSummary {
    pub queued: usize,
    pub scheduled: usize,
    pub completed: usize,
    pub failed: usize,
}

impl RestoreSummary {
    pub fn total(&self) -> usize {
        self.queued + self.scheduled + self.completed + self.failed
    }
}

impl Inner {
    /// Rebuild collections from the newest row of each URL. Completed and
    /// failed rows come from the last `limit` rows only; unfinished rows
    /// (pending, queued, in_progress, scheduled) are loaded however old they
    /// are and go back to the queue or the scheduled set. Rows are reused,
    /// never re-inserted.
    pub(super) async fn restore(self: &Arc<Self>, limit: u32) -> Result<RestoreSummary, SchedulerError> {
        let recent = self.history.recent(limit).await?;
        let unfinished = self.history.unfinished().await?;

        let mut seen = HashSet::new();
        let mut newest: Vec<HistoryRecord> = recent
            .into_iter()
            .chain(unfinished)
            .filter(|r| seen.insert(r.url.clone()))
            .collect();
        newest.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let mut state = self.state.lock().await;
        let now = Utc::now();
        let mut summary = RestoreSummary::default();

        // Oldest first so the queue keeps submission order.
        for row in newest.into_iter().rev() {
            if state.contains(&row.url) {
                continue;
            }
            let mut task = row.to_task();
            if task.platform.is_none() {
                task.platform = self.platforms.lookup(task.url()).map(|p| p.name.clone());
            }
            match row.status {
                DownloadStatus::Completed => {
                    state.push_completed(task);
                    summary.completed += 1;
                }
                DownloadStatus::Failed => {
                    state.failed.push(task);
                    summary.failed += 1;
                }
                DownloadStatus::Scheduled if task.is_deferred(now) => {
                    if let Some(at) = task.scheduled_time {
                        state.push_scheduled(at, task);
                        summary.scheduled += 1;
                    }
                }
                DownloadStatus::Scheduled
                | DownloadStatus::Pending
                | DownloadStatus::Queued
                | DownloadStatus::InProgress => {
                    task.status = DownloadStatus::Queued;
                    self.persist_status(&task).await;
                    state.queue.push_back(task);
                    summary.queued += 1;
                }
            }
        }

        tracing::info!(
            queued = summary.queued,
            scheduled = summary.scheduled,
            completed = summary.completed,
            failed = summary.failed,
            "restored queue state from history"
        );
        if summary.scheduled > 0 {
            self.timer.notify_one();
        }
        self.dispatch_locked(&mut state).await;
        Ok(summary)
    }
}
