//! Scripted executor for integration tests.
//!
//! Each URL gets a queue of outcomes consumed one per attempt; once the script
//! runs out the default outcome repeats. Tracks attempt counts and the peak
//! number of attempts running at the same time.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use vidq_core::control::CancelToken;
use vidq_core::executor::{DownloadExecutor, DownloadOutcome, DownloadRequest, ExecutorError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Succeed,
    Fail,
    /// Run until cancelled.
    Hang,
}

pub struct MockExecutor {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    default: Step,
    work: Duration,
    attempts: Mutex<HashMap<String, usize>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl MockExecutor {
    pub fn new(default: Step) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default,
            work: Duration::from_millis(10),
            attempts: Mutex::new(HashMap::new()),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// How long each non-hanging attempt takes.
    pub fn with_work(mut self, work: Duration) -> Self {
        self.work = work;
        self
    }

    pub fn script(self, url: &str, steps: &[Step]) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), steps.iter().copied().collect());
        self
    }

    pub fn attempts(&self, url: &str) -> usize {
        self.attempts.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn peak_running(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn next_step(&self, url: &str) -> Step {
        *self.attempts.lock().unwrap().entry(url.to_string()).or_default() += 1;
        self.scripts
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(|q| q.pop_front())
            .unwrap_or(self.default)
    }
}

#[async_trait]
impl DownloadExecutor for MockExecutor {
    async fn download(
        &self,
        request: &DownloadRequest,
        cancel: &CancelToken,
    ) -> Result<DownloadOutcome, ExecutorError> {
        let step = self.next_step(&request.url);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let result = match step {
            Step::Hang => {
                cancel.cancelled().await;
                Err(ExecutorError::Cancelled)
            }
            Step::Succeed | Step::Fail => {
                tokio::select! {
                    _ = tokio::time::sleep(self.work) => {
                        if step == Step::Succeed {
                            Ok(DownloadOutcome {
                                file_path: request.destination.join("clip.mp4"),
                                title: "clip".to_string(),
                            })
                        } else {
                            Err(ExecutorError::Failed("simulated network error".to_string()))
                        }
                    }
                    _ = cancel.cancelled() => Err(ExecutorError::Cancelled),
                }
            }
        };

        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
