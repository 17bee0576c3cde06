//! Per-platform executor selection.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::{DownloadExecutor, DownloadOutcome, DownloadRequest, ExecutorError};
use crate::control::CancelToken;

/// Routes each request to the executor registered for its platform, or to the
/// fallback when no platform-specific one exists.
#[derive(Clone, Default)]
pub struct ExecutorRouter {
    by_platform: HashMap<String, Arc<dyn DownloadExecutor>>,
    fallback: Option<Arc<dyn DownloadExecutor>>,
}

impl ExecutorRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform names are matched case-insensitively.
    pub fn with_platform(
        mut self,
        name: impl AsRef<str>,
        executor: Arc<dyn DownloadExecutor>,
    ) -> Self {
        self.by_platform
            .insert(name.as_ref().to_ascii_lowercase(), executor);
        self
    }

    pub fn with_fallback(mut self, executor: Arc<dyn DownloadExecutor>) -> Self {
        self.fallback = Some(executor);
        self
    }

    fn resolve(&self, platform: Option<&str>) -> Option<&Arc<dyn DownloadExecutor>> {
        platform
            .and_then(|p| self.by_platform.get(&p.to_ascii_lowercase()))
            .or(self.fallback.as_ref())
    }
}

#[async_trait]
impl DownloadExecutor for ExecutorRouter {
    async fn download(
        &self,
        request: &DownloadRequest,
        cancel: &CancelToken,
    ) -> Result<DownloadOutcome, ExecutorError> {
        match self.resolve(request.platform.as_deref()) {
            Some(executor) => executor.download(request, cancel).await,
            None => Err(ExecutorError::NoExecutor(
                request
                    .platform
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct Named(&'static str);

    #[async_trait]
    impl DownloadExecutor for Named {
        async fn download(
            &self,
            _request: &DownloadRequest,
            _cancel: &CancelToken,
        ) -> Result<DownloadOutcome, ExecutorError> {
            Ok(DownloadOutcome {
                file_path: PathBuf::from(format!("/tmp/{}.mp4", self.0)),
                title: self.0.to_string(),
            })
        }
    }

    fn request(platform: Option<&str>) -> DownloadRequest {
        DownloadRequest {
            url: "https://vimeo.com/1".to_string(),
            destination: PathBuf::from("/tmp"),
            video_format: "mp4".to_string(),
            resolution: "720p".to_string(),
            platform: platform.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn routes_by_platform_then_fallback() {
        let router = ExecutorRouter::new()
            .with_platform("Vimeo", Arc::new(Named("vimeo")))
            .with_fallback(Arc::new(Named("generic")));
        let cancel = CancelToken::new();

        let out = router.download(&request(Some("vimeo")), &cancel).await.unwrap();
        assert_eq!(out.title, "vimeo");
        let out = router
            .download(&request(Some("YouTube")), &cancel)
            .await
            .unwrap();
        assert_eq!(out.title, "generic");
        let out = router.download(&request(None), &cancel).await.unwrap();
        assert_eq!(out.title, "generic");
    }

    #[tokio::test]
    async fn no_match_without_fallback_is_an_error() {
        let router = ExecutorRouter::new().with_platform("Vimeo", Arc::new(Named("vimeo")));
        let err = router
            .download(&request(Some("Twitch")), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::NoExecutor(ref p) if p == "Twitch"));
    }
}
