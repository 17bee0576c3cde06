use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Hard bounds for the number of concurrent downloads.
pub const MIN_CONCURRENT: usize = 1;
pub const MAX_CONCURRENT: usize = 10;

/// Backoff between automatic retries (optional `[retry]` section in config.toml).
///
/// A zero base delay keeps the plain behaviour: a failed task goes straight
/// back to the tail of the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Base delay in seconds for exponential backoff (e.g. 0.5 = 500ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_secs: 0.0,
            max_delay_secs: 60,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::try_from_secs_f64(self.base_delay_secs.max(0.0))
                .unwrap_or(Duration::ZERO),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

/// Global configuration loaded from `~/.config/vidq/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VidqConfig {
    /// Maximum number of downloads in progress at once (1..=10).
    pub max_concurrent: usize,
    /// Automatic retries per task after the first failed attempt.
    pub max_retries: u32,
    /// How many completed tasks the scheduler keeps in memory.
    pub completed_capacity: usize,
    /// How many history rows are read back on startup.
    pub history_restore_limit: u32,
    /// Default target directory (None = current directory).
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// Default container format requested from the executor.
    pub default_format: String,
    /// Default resolution requested from the executor.
    pub default_resolution: String,
    /// Path or name of the yt-dlp binary.
    pub yt_dlp_path: String,
    /// Optional retry backoff; if missing, retries are immediate.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for VidqConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            max_retries: crate::task::DEFAULT_MAX_RETRIES,
            completed_capacity: 100,
            history_restore_limit: 50,
            download_dir: None,
            default_format: "mp4".to_string(),
            default_resolution: "720p".to_string(),
            yt_dlp_path: "yt-dlp".to_string(),
            retry: None,
        }
    }
}

impl VidqConfig {
    /// Reject values the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_CONCURRENT..=MAX_CONCURRENT).contains(&self.max_concurrent) {
            anyhow::bail!(
                "max_concurrent must be between {} and {} (got {})",
                MIN_CONCURRENT,
                MAX_CONCURRENT,
                self.max_concurrent
            );
        }
        if self.completed_capacity == 0 {
            anyhow::bail!("completed_capacity must be at least 1");
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone().unwrap_or_default().to_policy()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vidq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<VidqConfig> {
    load_or_init_at(&config_path()?)
}

/// Same as `load_or_init` for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<VidqConfig> {
    if !path.exists() {
        let default_cfg = VidqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: VidqConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = VidqConfig::default();
        assert_eq!(cfg.max_concurrent, 3);
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.completed_capacity, 100);
        assert_eq!(cfg.history_restore_limit, 50);
        assert_eq!(cfg.default_format, "mp4");
        assert_eq!(cfg.default_resolution, "720p");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = VidqConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: VidqConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.max_concurrent, cfg.max_concurrent);
        assert_eq!(parsed.max_retries, cfg.max_retries);
        assert_eq!(parsed.yt_dlp_path, cfg.yt_dlp_path);
    }

    #[test]
    fn config_toml_retry_section() {
        let toml = r#"
            max_concurrent = 2
            max_retries = 5
            completed_capacity = 10
            history_restore_limit = 20
            default_format = "webm"
            default_resolution = "1080p"
            yt_dlp_path = "/usr/local/bin/yt-dlp"
            download_dir = "/srv/videos"

            [retry]
            base_delay_secs = 0.5
            max_delay_secs = 15
        "#;
        let cfg: VidqConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.max_concurrent, 2);
        assert_eq!(cfg.download_dir.as_deref(), Some(Path::new("/srv/videos")));
        let policy = cfg.retry_policy();
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(policy.max_delay, Duration::from_secs(15));
    }

    #[test]
    fn missing_retry_section_means_immediate_retry() {
        let policy = VidqConfig::default().retry_policy();
        assert_eq!(policy.delay_for(1), Duration::ZERO);
    }

    #[test]
    fn validate_rejects_out_of_range_concurrency() {
        let mut cfg = VidqConfig::default();
        cfg.max_concurrent = 0;
        assert!(cfg.validate().is_err());
        cfg.max_concurrent = 11;
        assert!(cfg.validate().is_err());
        cfg.max_concurrent = 10;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn load_or_init_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = load_or_init_at(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.max_concurrent, 3);

        let again = load_or_init_at(&path).unwrap();
        assert_eq!(again.max_retries, cfg.max_retries);
    }
}
