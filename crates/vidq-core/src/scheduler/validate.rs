use super::ValidationError;
use crate::platform::{Platform, PlatformCatalog};
use crate::task::DownloadTask;

/// Check the fields a task needs before it can be accepted and return the
/// platform serving its URL. Duplicate detection needs queue state and is
/// done by the scheduler.
pub fn validate_task<'a>(
    task: &DownloadTask,
    platforms: &'a PlatformCatalog,
) -> Result<&'a Platform, ValidationError> {
    if task.url().trim().is_empty() {
        return Err(ValidationError::MissingUrl);
    }
    if task.download_path.trim().is_empty() {
        return Err(ValidationError::MissingPath);
    }
    platforms
        .lookup(task.url())
        .ok_or_else(|| ValidationError::UnsupportedPlatform(task.url().to_string()))
}
