//! Deferred activation: moves scheduled tasks to the queue when they fall due.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use super::Inner;
use crate::task::DownloadStatus;

/// Timer loop. Holds only a weak handle so it stops once the scheduler is gone;
/// `wake` is signalled whenever an earlier entry may have been added.
pub(super) async fn run(inner: Weak<Inner>, wake: Arc<Notify>) {
    loop {
        let next = {
            let Some(inner) = inner.upgrade() else {
                tracing::debug!("scheduler dropped, timer loop exiting");
                return;
            };
            inner.fire_due().await
        };
        match next {
            Some(at) => {
                let wait = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = wake.notified() => {}
                }
            }
            None => wake.notified().await,
        }
    }
}

impl Inner {
    /// Queue every entry whose time has come. Returns the next fire time.
    async fn fire_due(self: &Arc<Self>) -> Option<DateTime<Utc>> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let mut fired = 0usize;
        while let Some(mut task) = state.pop_due(now) {
            task.status = DownloadStatus::Queued;
            tracing::info!(url = %task.url(), "scheduled time reached, queueing");
            self.persist_status(&task).await;
            self.emit(&task);
            state.queue.push_back(task);
            fired += 1;
        }
        if fired > 0 {
            self.dispatch_locked(&mut state).await;
        }
        state.next_fire_time()
    }
}
