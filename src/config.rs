use std::env;
use std::time::Duration;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5001;
const DEFAULT_POLL_ATTEMPTS: u32 = 30;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Reads an environment variable, treating empty values as unset.
fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(key: &str) -> bool {
    env_opt(key).map_or(false, |val| {
        matches!(val.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
    })
}

#[derive(Debug, Clone)]
pub struct StabilityConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub engine: String,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        StabilityConfig {
            api_key: None,
            base_url: "https://api.stability.ai".to_string(),
            engine: "stable-diffusion-xl-1024-v1-0".to_string(),
        }
    }
}

impl StabilityConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        StabilityConfig {
            api_key: env_opt("STABILITY_API_KEY"),
            base_url: env_opt("STABILITY_API_URL").unwrap_or(defaults.base_url),
            engine: env_opt("STABILITY_ENGINE").unwrap_or(defaults.engine),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct PexelsConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub per_page: u32,
}

impl Default for PexelsConfig {
    fn default() -> Self {
        PexelsConfig {
            api_key: None,
            base_url: "https://api.pexels.com".to_string(),
            per_page: 1,
        }
    }
}

impl PexelsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        PexelsConfig {
            api_key: env_opt("PEXELS_API_KEY"),
            base_url: env_opt("PEXELS_API_URL").unwrap_or(defaults.base_url),
            per_page: env_opt("PEXELS_PER_PAGE")
                .and_then(|s| s.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.per_page),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.max(1);
        self
    }
}

/// Text-generation upstream (Gemini `generateContent`).
#[derive(Debug, Clone)]
pub struct TextGenConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Default for TextGenConfig {
    fn default() -> Self {
        TextGenConfig {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
        }
    }
}

impl TextGenConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        TextGenConfig {
            api_key: env_opt("GEMINI_API_KEY"),
            base_url: env_opt("GEMINI_API_URL").unwrap_or(defaults.base_url),
            model: env_opt("GEMINI_MODEL").unwrap_or(defaults.model),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Bounds for the asynchronous video job poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy {
            max_attempts: DEFAULT_POLL_ATTEMPTS,
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        PollPolicy {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    pub fn from_env() -> Self {
        let attempts = env_opt("VIDEO_POLL_ATTEMPTS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_POLL_ATTEMPTS);
        let interval = env_opt("VIDEO_POLL_INTERVAL_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        Self::new(attempts, Duration::from_secs(interval))
    }

    /// Total sleep across the loop. Sleeps fall between polls only, so there
    /// is one fewer than `max_attempts`.
    pub fn max_wait(&self) -> Duration {
        self.interval
            .checked_mul(self.max_attempts.saturating_sub(1))
            .unwrap_or(Duration::MAX)
    }
}

/// Which upstream serves `/generate-image`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageBackend {
    #[default]
    Stability,
    Pexels,
}

impl ImageBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stability" => Some(ImageBackend::Stability),
            "pexels" => Some(ImageBackend::Pexels),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageBackend::Stability => "stability",
            ImageBackend::Pexels => "pexels",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Empty means any origin is accepted.
    pub allowed_origins: Vec<String>,
    pub image_backend: ImageBackend,
    pub video_query_expansion: bool,
    pub stability: StabilityConfig,
    pub pexels: PexelsConfig,
    pub text: TextGenConfig,
    pub poll: PollPolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            allowed_origins: Vec::new(),
            image_backend: ImageBackend::default(),
            video_query_expansion: false,
            stability: StabilityConfig::default(),
            pexels: PexelsConfig::default(),
            text: TextGenConfig::default(),
            poll: PollPolicy::default(),
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let port = env_opt("PORT")
            .and_then(|port| port.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let image_backend = match env_opt("IMAGE_BACKEND") {
            Some(raw) => ImageBackend::parse(&raw).unwrap_or_else(|| {
                log::warn!("Unknown IMAGE_BACKEND '{}', using stability", raw);
                ImageBackend::Stability
            }),
            None => ImageBackend::Stability,
        };

        GatewayConfig {
            host: env_opt("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            allowed_origins: env_opt("ALLOWED_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_default(),
            image_backend,
            video_query_expansion: env_flag("VIDEO_QUERY_EXPANSION"),
            stability: StabilityConfig::from_env(),
            pexels: PexelsConfig::from_env(),
            text: TextGenConfig::from_env(),
            poll: PollPolicy::from_env(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_image_backend(mut self, backend: ImageBackend) -> Self {
        self.image_backend = backend;
        self
    }

    pub fn with_query_expansion(mut self, enabled: bool) -> Self {
        self.video_query_expansion = enabled;
        self
    }

    pub fn with_stability(mut self, config: StabilityConfig) -> Self {
        self.stability = config;
        self
    }

    pub fn with_pexels(mut self, config: PexelsConfig) -> Self {
        self.pexels = config;
        self
    }

    pub fn with_text(mut self, config: TextGenConfig) -> Self {
        self.text = config;
        self
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll = policy;
        self
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_empty_entries_dropped() {
        let origins = parse_origins(" https://a.example/ ,, http://localhost:3000");
        assert_eq!(origins, vec!["https://a.example", "http://localhost:3000"]);
    }

    #[test]
    fn poll_policy_never_allows_zero_attempts() {
        let policy = PollPolicy::new(0, Duration::from_secs(5));
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(PollPolicy::default().max_wait(), Duration::from_secs(145));
    }

    #[test]
    fn oversized_poll_interval_saturates_instead_of_overflowing() {
        let policy = PollPolicy::new(30, Duration::from_secs(u64::MAX));
        assert_eq!(policy.max_wait(), Duration::MAX);
        assert_eq!(PollPolicy::new(1, Duration::from_secs(u64::MAX)).max_wait(), Duration::ZERO);
    }

    #[test]
    fn image_backend_parsing_is_case_insensitive() {
        assert_eq!(ImageBackend::parse("Pexels"), Some(ImageBackend::Pexels));
        assert_eq!(ImageBackend::parse("STABILITY"), Some(ImageBackend::Stability));
        assert_eq!(ImageBackend::parse("dalle"), None);
    }

    #[test]
    fn builders_override_defaults() {
        let config = GatewayConfig::new()
            .with_port(8080)
            .with_allowed_origins(["https://app.example"])
            .with_stability(StabilityConfig::new().with_api_key("sk-test"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.allowed_origins, vec!["https://app.example"]);
        assert_eq!(config.stability.api_key.as_deref(), Some("sk-test"));
        assert!(config.pexels.api_key.is_none());
    }
}
