//! Control socket: server (during `vidq run`) and client (for `vidq cancel`).
//! Protocol: one line per command, "cancel <url>"; the server answers each
//! with "ok" or "unknown".

use anyhow::Result;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use vidq_core::scheduler::Scheduler;

/// Binds `path` and spawns a task that serves cancel requests against
/// `scheduler`. Malformed lines get no answer.
pub fn spawn_control_listener(
    scheduler: Scheduler,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref().to_path_buf();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    // A stale socket from a crashed run would make bind fail.
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)?;

    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let scheduler = scheduler.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve(stream, scheduler).await {
                            tracing::debug!("control connection: {}", e);
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(handle)
}

async fn serve(stream: UnixStream, scheduler: Scheduler) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(url) = line.trim().strip_prefix("cancel ") else {
            continue;
        };
        let reply = if scheduler.cancel(url.trim()).await {
            "ok\n"
        } else {
            "unknown\n"
        };
        write.write_all(reply.as_bytes()).await?;
    }
    Ok(())
}

/// Sends "cancel <url>" to a running `vidq run`. Returns None when no server
/// is listening, otherwise whether it knew the URL.
pub async fn send_cancel(socket_path: &Path, url: &str) -> Result<Option<bool>> {
    if !socket_path.exists() {
        return Ok(None);
    }
    let stream = match UnixStream::connect(socket_path).await {
        Ok(s) => s,
        Err(e) => {
            tracing::debug!(path = %socket_path.display(), "stale control socket: {}", e);
            return Ok(None);
        }
    };
    let (read, mut write) = stream.into_split();
    write.write_all(format!("cancel {url}\n").as_bytes()).await?;
    let reply = BufReader::new(read).lines().next_line().await?;
    Ok(Some(reply.as_deref().map(str::trim) == Some("ok")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use vidq_core::control::CancelToken;
    use vidq_core::executor::{DownloadExecutor, DownloadOutcome, DownloadRequest, ExecutorError};
    use vidq_core::history::HistoryStore;
    use vidq_core::scheduler::SchedulerOptions;
    use vidq_core::task::DownloadTask;

    struct Hang;

    #[async_trait]
    impl DownloadExecutor for Hang {
        async fn download(
            &self,
            _request: &DownloadRequest,
            cancel: &CancelToken,
        ) -> Result<DownloadOutcome, ExecutorError> {
            cancel.cancelled().await;
            Err(ExecutorError::Cancelled)
        }
    }

    #[tokio::test]
    async fn cancel_roundtrip_over_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("control.sock");
        let history = HistoryStore::open_in_memory().await.unwrap();
        let scheduler =
            Scheduler::new(history, Arc::new(Hang), SchedulerOptions::default()).unwrap();
        let url = "https://vimeo.com/123";
        scheduler
            .submit(DownloadTask::new(url, "/tmp", "mp4", "720p"))
            .await
            .unwrap();

        let handle = spawn_control_listener(scheduler.clone(), &path).unwrap();
        assert_eq!(send_cancel(&path, url).await.unwrap(), Some(true));
        assert_eq!(
            send_cancel(&path, "https://vimeo.com/other").await.unwrap(),
            Some(false)
        );
        tokio::time::timeout(std::time::Duration::from_secs(5), scheduler.wait_idle())
            .await
            .unwrap();
        assert_eq!(scheduler.failed().await.len(), 1);
        handle.abort();
    }

    #[tokio::test]
    async fn missing_socket_means_no_server() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.sock");
        assert_eq!(send_cancel(&path, "https://vimeo.com/1").await.unwrap(), None);
    }
}
