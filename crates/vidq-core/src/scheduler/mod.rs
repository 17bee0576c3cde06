//! Download queue scheduler.
//!
//! Owns every live task and is the only place a task's status changes:
//! submit → (scheduled →) queued → in_progress → completed / re-queued / failed.
//! All bookkeeping happens under one async mutex; executor calls run on
//! spawned tasks outside it, at most `max_concurrent` at a time. Deferred
//! tasks sit in a min-heap drained by a background timer loop.

mod dispatch;
mod error;
mod events;
mod restore;
mod state;
mod timer;
mod validate;


use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch, Mutex, Notify};

use crate::config::{VidqConfig, MAX_CONCURRENT, MIN_CONCURRENT};
use crate::control::TaskControl;
use crate::executor::DownloadExecutor;
use crate::history::HistoryStore;
use crate::platform::PlatformCatalog;
use crate::retry::RetryPolicy;
use crate::task::DownloadTask;

pub use error::{SchedulerError, ValidationError};
pub use events::{QueueCounts, TaskEvent};
pub use restore::RestoreSummary;
pub use state::QueueSnapshot;
pub use validate::validate_task;

use state::QueueState;

/// Error text stored on tasks stopped by [`Scheduler::cancel`].
pub const CANCELLED_MESSAGE: &str = "cancelled";

const EVENT_CAPACITY: usize = 256;

/// Tunables for a [`Scheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub max_concurrent: usize,
    pub completed_capacity: usize,
    pub retry: RetryPolicy,
    pub platforms: PlatformCatalog,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            completed_capacity: 100,
            retry: RetryPolicy::default(),
            platforms: PlatformCatalog::builtin(),
        }
    }
}

impl SchedulerOptions {
    pub fn from_config(cfg: &VidqConfig) -> Self {
        Self {
            max_concurrent: cfg.max_concurrent,
            completed_capacity: cfg.completed_capacity,
            retry: cfg.retry_policy(),
            platforms: PlatformCatalog::builtin(),
        }
    }

    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Shared state behind every [`Scheduler`] handle and worker.
pub(crate) struct Inner {
    state: Mutex<QueueState>,
    history: HistoryStore,
    executor: Arc<dyn DownloadExecutor>,
    platforms: PlatformCatalog,
    control: TaskControl,
    retry: RetryPolicy,
    timer: Arc<Notify>,
    counts: watch::Sender<QueueCounts>,
    events: broadcast::Sender<TaskEvent>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Wake the timer loop so it sees the dropped handle and exits.
        self.timer.notify_one();
    }
}

/// Cloneable handle to one download queue.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    /// Build a scheduler and start its timer loop.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        history: HistoryStore,
        executor: Arc<dyn DownloadExecutor>,
        options: SchedulerOptions,
    ) -> Result<Self, SchedulerError> {
        check_concurrency(options.max_concurrent)?;
        if options.completed_capacity == 0 {
            return Err(SchedulerError::Config(
                "completed_capacity must be at least 1".to_string(),
            ));
        }

        let (counts, _) = watch::channel(QueueCounts::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let inner = Arc::new(Inner {
            state: Mutex::new(QueueState::new(
                options.max_concurrent,
                options.completed_capacity,
            )),
            history,
            executor,
            platforms: options.platforms,
            control: TaskControl::new(),
            retry: options.retry,
            timer: Arc::new(Notify::new()),
            counts,
            events,
        });
        tokio::spawn(timer::run(Arc::downgrade(&inner), Arc::clone(&inner.timer)));
        tracing::debug!(max_concurrent = options.max_concurrent, "scheduler started");
        Ok(Self { inner })
    }

    /// Validate, record, and enqueue a task (or hold it until its scheduled time).
    pub async fn submit(&self, task: DownloadTask) -> Result<(), SchedulerError> {
        let mut state = self.inner.state.lock().await;
        self.inner.enqueue_new(&mut state, task).await
    }

    /// Submit `task` to start no earlier than `at`.
    pub async fn schedule(
        &self,
        task: DownloadTask,
        at: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        self.submit(task.with_scheduled_time(at)).await
    }

    /// Stop a task. Queued and scheduled tasks are failed right away; an
    /// active one is signalled and failed once its executor returns.
    /// Returns false when no live task has this URL.
    pub async fn cancel(&self, url: &str) -> bool {
        let mut state = self.inner.state.lock().await;
        self.inner.cancel_locked(&mut state, url).await
    }

    /// Requeue every failed task with a fresh retry budget. Returns how many
    /// were resubmitted.
    pub async fn retry_failed(&self) -> usize {
        let mut state = self.inner.state.lock().await;
        self.inner.retry_failed_locked(&mut state).await
    }

    /// Change the number of concurrent downloads. Running tasks are never
    /// interrupted; a higher limit starts queued tasks immediately.
    pub async fn set_concurrency_limit(&self, n: usize) -> Result<(), SchedulerError> {
        check_concurrency(n)?;
        let mut state = self.inner.state.lock().await;
        state.max_concurrent = n;
        tracing::info!(max_concurrent = n, "concurrency limit changed");
        self.inner.dispatch_locked(&mut state).await;
        Ok(())
    }

    pub async fn concurrency_limit(&self) -> usize {
        self.inner.state.lock().await.max_concurrent
    }

    /// Rehydrate queue state from the newest `limit` history rows.
    pub async fn restore(&self, limit: u32) -> Result<RestoreSummary, SchedulerError> {
        self.inner.restore(limit).await
    }

    /// Resolves once nothing is queued, running, or scheduled.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.counts.subscribe();
        // The sender lives in `inner`, which `self` keeps alive.
        let _ = rx.wait_for(QueueCounts::is_idle).await;
    }

    /// Status transitions as they happen. Slow receivers may observe `Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.inner.events.subscribe()
    }

    pub fn counts(&self) -> QueueCounts {
        *self.inner.counts.borrow()
    }

    pub async fn snapshot(&self) -> QueueSnapshot {
        self.inner.state.lock().await.snapshot()
    }

    pub async fn active(&self) -> Vec<DownloadTask> {
        self.inner.state.lock().await.active_tasks()
    }

    pub async fn queued(&self) -> Vec<DownloadTask> {
        self.inner.state.lock().await.queue.iter().cloned().collect()
    }

    pub async fn scheduled(&self) -> Vec<DownloadTask> {
        self.inner.state.lock().await.scheduled_tasks()
    }

    pub async fn completed(&self) -> Vec<DownloadTask> {
        self.inner.state.lock().await.completed.iter().cloned().collect()
    }

    pub async fn failed(&self) -> Vec<DownloadTask> {
        self.inner.state.lock().await.failed.clone()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.inner.history
    }

    pub fn platforms(&self) -> &PlatformCatalog {
        &self.inner.platforms
    }
}

fn check_concurrency(n: usize) -> Result<(), SchedulerError> {
    if (MIN_CONCURRENT..=MAX_CONCURRENT).contains(&n) {
        Ok(())
    } else {
        Err(SchedulerError::Config(format!(
            "concurrency limit must be between {MIN_CONCURRENT} and {MAX_CONCURRENT} (got {n})"
        )))
    }
}
