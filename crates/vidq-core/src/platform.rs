//! Platform classification: which video sites a URL belongs to.
//!
//! A URL matches a platform when its host is one of the platform's domains or
//! a subdomain of one (`www.youtube.com`, `m.youtube.com`, ...).

use serde::Serialize;

/// One supported video platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Platform {
    pub name: String,
    pub base_url: String,
    pub description: String,
    pub supported_formats: Vec<String>,
    /// Extra domains served by the same platform (short links etc.).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl Platform {
    pub fn new(name: &str, base_url: &str, description: &str, formats: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.to_string(),
            description: description.to_string(),
            supported_formats: formats.iter().map(|f| f.to_string()).collect(),
            aliases: Vec::new(),
        }
    }

    pub fn with_alias(mut self, domain: &str) -> Self {
        self.aliases.push(domain.to_string());
        self
    }

    pub fn supports_format(&self, format: &str) -> bool {
        self.supported_formats
            .iter()
            .any(|f| f.eq_ignore_ascii_case(format))
    }

    fn matches_host(&self, host: &str) -> bool {
        std::iter::once(&self.base_url)
            .chain(self.aliases.iter())
            .any(|domain| host == domain || host.ends_with(&format!(".{domain}")))
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.base_url)
    }
}

/// Lookup table of supported platforms.
#[derive(Debug, Clone)]
pub struct PlatformCatalog {
    platforms: Vec<Platform>,
}

impl Default for PlatformCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PlatformCatalog {
    pub fn new(platforms: Vec<Platform>) -> Self {
        Self { platforms }
    }

    /// Sites the bundled yt-dlp executor is known to handle.
    pub fn builtin() -> Self {
        Self::new(vec![
            Platform::new(
                "YouTube",
                "youtube.com",
                "World's largest video sharing platform",
                &["mp4", "webm", "3gp"],
            )
            .with_alias("youtu.be"),
            Platform::new(
                "Vimeo",
                "vimeo.com",
                "High-quality creative video platform",
                &["mp4", "webm"],
            ),
            Platform::new(
                "Dailymotion",
                "dailymotion.com",
                "Popular video sharing platform",
                &["mp4"],
            ),
            Platform::new(
                "Twitch",
                "twitch.tv",
                "Live streaming and gaming content platform",
                &["mp4"],
            ),
            Platform::new(
                "Facebook Video",
                "facebook.com",
                "Social media video content",
                &["mp4"],
            ),
        ])
    }

    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    /// Platform serving `url`, or None for unparseable or unknown URLs.
    pub fn lookup(&self, url: &str) -> Option<&Platform> {
        let parsed = url::Url::parse(url.trim()).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }
        let host = parsed.host_str()?.to_ascii_lowercase();
        self.platforms.iter().find(|p| p.matches_host(&host))
    }

    pub fn is_supported(&self, url: &str) -> bool {
        self.lookup(url).is_some()
    }
}
