//! Executor that shells out to the `yt-dlp` binary.
//!
//! Tries a selector constrained to the requested resolution first, then falls
//! back to yt-dlp's `best`. The final path and title come from the info JSON
//! printed after the file has been moved into place.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{DownloadExecutor, DownloadOutcome, DownloadRequest, ExecutorError};
use crate::control::CancelToken;

/// Containers yt-dlp can merge separate video/audio streams into.
const MERGE_FORMATS: &[&str] = &["avi", "flv", "mkv", "mov", "mp4", "webm"];

#[derive(Debug, Clone)]
pub struct YtDlpExecutor {
    program: PathBuf,
    /// Arguments placed before the generated ones (e.g. a script for `/bin/sh`).
    base_args: Vec<String>,
}

impl Default for YtDlpExecutor {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlpExecutor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
        }
    }

    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    async fn run_once(
        &self,
        request: &DownloadRequest,
        selector: &str,
        cancel: &CancelToken,
    ) -> Result<DownloadOutcome, ExecutorError> {
        let args = build_args(request, selector);
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| ExecutorError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        // Dropping the wait future drops the child, which kills it.
        let output = tokio::select! {
            out = child.wait_with_output() => out?,
            _ = cancel.cancelled() => return Err(ExecutorError::Cancelled),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExecutorError::Failed(failure_message(
                &stderr,
                output.status.code(),
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_outcome(&stdout).ok_or_else(|| {
            ExecutorError::Failed("yt-dlp did not report the downloaded file".to_string())
        })
    }
}

#[async_trait]
impl DownloadExecutor for YtDlpExecutor {
    async fn download(
        &self,
        request: &DownloadRequest,
        cancel: &CancelToken,
    ) -> Result<DownloadOutcome, ExecutorError> {
        tokio::fs::create_dir_all(&request.destination).await?;
        tracing::info!(url = %request.url, "attempting download");

        let strategies = [format_selector(&request.resolution), "best".to_string()];
        let mut last_err = None;
        for selector in strategies.iter() {
            if cancel.is_cancelled() {
                return Err(ExecutorError::Cancelled);
            }
            match self.run_once(request, selector, cancel).await {
                Ok(outcome) => {
                    tracing::info!(
                        url = %request.url,
                        title = %outcome.title,
                        path = %outcome.file_path.display(),
                        "download finished"
                    );
                    return Ok(outcome);
                }
                Err(e @ (ExecutorError::Cancelled | ExecutorError::Spawn { .. })) => {
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(url = %request.url, selector = %selector, "yt-dlp attempt failed: {}", e);
                    last_err = Some(e);
                }
            }
        }
        let err = last_err
            .unwrap_or_else(|| ExecutorError::Failed("no download strategy ran".to_string()));
        tracing::error!(url = %request.url, "download failed: {}", err);
        Err(err)
    }
}

/// `720p` → 720. Anything without a leading number yields None.
fn height_from_resolution(resolution: &str) -> Option<u32> {
    let digits: String = resolution
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok().filter(|h| *h > 0)
}

fn format_selector(resolution: &str) -> String {
    match height_from_resolution(resolution) {
        Some(h) => format!("bestvideo[height<={h}]+bestaudio/best[height<={h}]"),
        None => "bestvideo+bestaudio/best".to_string(),
    }
}

fn build_args(request: &DownloadRequest, selector: &str) -> Vec<String> {
    let template = request.destination.join("%(title)s.%(ext)s");
    let mut args = vec![
        "--no-playlist".to_string(),
        "--no-progress".to_string(),
        "-f".to_string(),
        selector.to_string(),
    ];
    let format = request.video_format.to_ascii_lowercase();
    if MERGE_FORMATS.contains(&format.as_str()) {
        args.push("--merge-output-format".to_string());
        args.push(format);
    }
    args.extend([
        "-o".to_string(),
        template.to_string_lossy().into_owned(),
        "--print".to_string(),
        "after_move:%()j".to_string(),
        request.url.clone(),
    ]);
    args
}

/// Last JSON line on stdout → path and title of the saved file.
fn parse_outcome(stdout: &str) -> Option<DownloadOutcome> {
    let info: serde_json::Value = stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|l| l.starts_with('{'))
        .find_map(|l| serde_json::from_str(l).ok())?;

    let path = info
        .get("filepath")
        .or_else(|| info.get("_filename"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())?;
    let file_path = PathBuf::from(path);
    let title = info
        .get("title")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| file_stem(&file_path));
    Some(DownloadOutcome { file_path, title })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn failure_message(stderr: &str, code: Option<i32>) -> String {
    let line = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty());
    match (line, code) {
        (Some(l), _) => l.to_string(),
        (None, Some(c)) => format!("yt-dlp exited with status {c}"),
        (None, None) => "yt-dlp terminated by signal".to_string(),
    }
}
