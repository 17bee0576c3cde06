//! Task control for cancel: shared cancellation tokens and the control socket path.
//!
//! Each task handed to an executor is registered with a token keyed by URL.
//! A control client (e.g. `vidq cancel <url>` via socket) requests
//! cancellation; the executor observes the token and stops its transfer.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::Notify;

/// One-shot cancellation flag that can be polled or awaited.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

#[derive(Debug, Default)]
struct TokenInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once `cancel` has been called (immediately if it already was).
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Shared registry of task URL -> cancellation token.
#[derive(Default)]
pub struct TaskControl {
    tasks: RwLock<HashMap<String, CancelToken>>,
}

impl TaskControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task about to run; returns the token to pass to the executor.
    pub fn register(&self, url: &str) -> CancelToken {
        let token = CancelToken::new();
        self.tasks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), token.clone());
        token
    }

    /// Unregister a task (call when its attempt finishes, success or failure).
    pub fn unregister(&self, url: &str) {
        self.tasks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(url);
    }

    /// Request cancellation for a running task. Returns false if none is registered.
    pub fn request_cancel(&self, url: &str) -> bool {
        match self
            .tasks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
        {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// Default path for the control socket (same XDG state dir as the history DB).
pub fn default_control_socket_path() -> anyhow::Result<PathBuf> {
    Ok(crate::logging::state_dir()?.join("control.sock"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn request_cancel_sets_registered_token() {
        let control = TaskControl::new();
        let token = control.register("https://youtube.com/a");
        assert!(!token.is_cancelled());
        assert!(control.request_cancel("https://youtube.com/a"));
        assert!(token.is_cancelled());
    }

    #[test]
    fn request_cancel_unknown_or_unregistered_is_noop() {
        let control = TaskControl::new();
        assert!(!control.request_cancel("https://youtube.com/missing"));
        let token = control.register("https://youtube.com/b");
        control.unregister("https://youtube.com/b");
        assert!(!control.request_cancel("https://youtube.com/b"));
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_future_wakes_waiter() {
        let token = CancelToken::new();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter woke")
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_returns_immediately_when_already_set() {
        let token = CancelToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .expect("already cancelled");
    }
}
