//! Status transitions: admission, dispatch to workers, and result handling.
//!
//! Every function taking `&mut QueueState` runs with the scheduler mutex held,
//! so transitions of one task are totally ordered.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::events::TaskEvent;
use super::state::QueueState;
use super::{validate_task, Inner, SchedulerError, ValidationError, CANCELLED_MESSAGE};
use crate::control::CancelToken;
use crate::executor::{DownloadOutcome, DownloadRequest, ExecutorError};
use crate::task::{DownloadStatus, DownloadTask};

impl Inner {
    /// Admit a new task: validate, record a history row, then hold it as
    /// scheduled or append it to the queue.
    pub(super) async fn enqueue_new(
        self: &Arc<Self>,
        state: &mut QueueState,
        mut task: DownloadTask,
    ) -> Result<(), SchedulerError> {
        let platform = validate_task(&task, &self.platforms)?;
        if state.is_live(task.url()) {
            return Err(ValidationError::Duplicate(task.url().to_string()).into());
        }
        task.platform = Some(platform.name.clone());
        task.error_message = None;
        task.output_path = None;

        match task.scheduled_time.filter(|_| task.is_deferred(Utc::now())) {
            Some(at) => {
                task.status = DownloadStatus::Scheduled;
                self.persist_new(&task).await;
                tracing::info!(url = %task.url(), at = %at, "download scheduled");
                self.emit(&task);
                state.push_scheduled(at, task);
                self.timer.notify_one();
                self.publish_counts(state);
            }
            None => {
                task.status = DownloadStatus::Queued;
                self.persist_new(&task).await;
                tracing::info!(url = %task.url(), "download queued");
                self.emit(&task);
                state.queue.push_back(task);
                self.dispatch_locked(state).await;
            }
        }
        Ok(())
    }

    /// Start queued tasks, in FIFO order, until the concurrency limit is reached.
    pub(super) async fn dispatch_locked(self: &Arc<Self>, state: &mut QueueState) {
        while state.active.len() < state.max_concurrent {
            let Some(mut task) = state.queue.pop_front() else {
                break;
            };
            task.status = DownloadStatus::InProgress;
            self.persist_status(&task).await;
            let cancel = self.control.register(task.url());
            state.active.insert(task.url().to_string(), task.clone());
            tracing::debug!(
                url = %task.url(),
                attempt = task.retries + 1,
                active = state.active.len(),
                "dispatching download"
            );
            self.emit(&task);

            tokio::spawn(Arc::clone(self).run_worker(task, cancel));
        }
        self.publish_counts(state);
    }

    /// Boxed: the worker re-enters `dispatch_locked`, which spawns workers.
    fn run_worker(
        self: Arc<Self>,
        task: DownloadTask,
        cancel: CancelToken,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            let delay = self.retry.delay_for(task.retries);
            let result = if wait_backoff(delay, &cancel).await {
                self.execute(&task, &cancel).await
            } else {
                Err(ExecutorError::Cancelled)
            };
            self.finish(task, result).await;
        })
    }

    /// Run the executor on its own task so a panic inside it becomes an
    /// ordinary failure instead of leaving the task active forever.
    async fn execute(
        &self,
        task: &DownloadTask,
        cancel: &CancelToken,
    ) -> Result<DownloadOutcome, ExecutorError> {
        let executor = Arc::clone(&self.executor);
        let request = DownloadRequest::from_task(task);
        let cancel = cancel.clone();
        match tokio::spawn(async move { executor.download(&request, &cancel).await }).await {
            Ok(result) => result,
            Err(e) => Err(ExecutorError::Failed(format!("executor task aborted: {e}"))),
        }
    }

    /// Apply an executor result to the task that produced it.
    async fn finish(
        self: &Arc<Self>,
        mut task: DownloadTask,
        result: Result<DownloadOutcome, ExecutorError>,
    ) {
        let mut state = self.state.lock().await;
        self.control.unregister(task.url());
        state.active.remove(task.url());

        match result {
            Ok(outcome) => {
                task.status = DownloadStatus::Completed;
                task.error_message = None;
                task.output_path = Some(outcome.file_path.to_string_lossy().into_owned());
                tracing::info!(url = %task.url(), title = %outcome.title, "download completed");
                self.persist_status(&task).await;
                self.emit(&task);
                state.push_completed(task);
            }
            Err(e) if !e.is_cancelled() && task.can_retry() => {
                task.retries += 1;
                task.status = DownloadStatus::Queued;
                task.error_message = Some(e.to_string());
                tracing::warn!(
                    url = %task.url(),
                    retry = task.retries,
                    max_retries = task.max_retries,
                    "download failed, requeueing: {}",
                    e
                );
                self.persist_status(&task).await;
                self.emit(&task);
                state.queue.push_back(task);
            }
            Err(e) => {
                task.status = DownloadStatus::Failed;
                task.error_message = Some(if e.is_cancelled() {
                    CANCELLED_MESSAGE.to_string()
                } else {
                    e.to_string()
                });
                tracing::error!(url = %task.url(), retries = task.retries, "download failed: {}", e);
                self.persist_status(&task).await;
                self.emit(&task);
                state.failed.push(task);
            }
        }

        self.dispatch_locked(&mut state).await;
    }

    pub(super) async fn cancel_locked(self: &Arc<Self>, state: &mut QueueState, url: &str) -> bool {
        if let Some(mut task) = state.take_pending(url) {
            task.status = DownloadStatus::Failed;
            task.error_message = Some(CANCELLED_MESSAGE.to_string());
            tracing::info!(url = %url, "cancelled before start");
            self.persist_status(&task).await;
            self.emit(&task);
            state.failed.push(task);
            self.publish_counts(state);
            return true;
        }
        if state.active.contains_key(url) {
            tracing::info!(url = %url, "cancelling running download");
            return self.control.request_cancel(url);
        }
        false
    }

    pub(super) async fn retry_failed_locked(self: &Arc<Self>, state: &mut QueueState) -> usize {
        let failed = std::mem::take(&mut state.failed);
        if failed.is_empty() {
            return 0;
        }
        tracing::info!(count = failed.len(), "retrying failed downloads");
        let mut resubmitted = 0;
        for original in failed {
            let mut task = original.clone();
            task.retries = 0;
            task.status = DownloadStatus::Pending;
            task.error_message = None;
            // A task cancelled while scheduled still carries its future time.
            task.scheduled_time = None;
            match self.enqueue_new(state, task).await {
                Ok(()) => resubmitted += 1,
                Err(e) => {
                    tracing::warn!(url = %original.url(), "cannot retry: {}", e);
                    state.failed.push(original);
                }
            }
        }
        self.publish_counts(state);
        resubmitted
    }

    async fn persist_new(&self, task: &DownloadTask) {
        if let Err(e) = self.history.record(task).await {
            tracing::warn!(url = %task.url(), "history record failed: {}", e);
        }
    }

    /// Mirror the task's current status onto its open history row.
    pub(super) async fn persist_status(&self, task: &DownloadTask) {
        match self
            .history
            .update_status(task, task.status, task.error_message.as_deref())
            .await
        {
            Ok(0) => tracing::debug!(url = %task.url(), "no open history row to update"),
            Ok(_) => {}
            Err(e) => tracing::warn!(url = %task.url(), "history update failed: {}", e),
        }
    }

    pub(super) fn emit(&self, task: &DownloadTask) {
        // Err only means nobody is subscribed.
        let _ = self.events.send(TaskEvent::from_task(task));
    }

    pub(super) fn publish_counts(&self, state: &QueueState) {
        self.counts.send_replace(state.counts());
    }
}

/// Sleep out the retry backoff. Returns false if cancelled while waiting.
async fn wait_backoff(delay: Duration, cancel: &CancelToken) -> bool {
    if delay.is_zero() {
        return !cancel.is_cancelled();
    }
    tracing::debug!(delay_ms = delay.as_millis() as u64, "waiting before retry");
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = cancel.cancelled() => false,
    }
}
