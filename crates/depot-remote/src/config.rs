//! Upstream client configuration.
//!
//! The base URL points at the root of a Maven-layout repository, e.g.
//! `https://repo.maven.apache.org/maven2`. Override via environment
//! variables or explicit construction for tests.

use url::Url;

/// Connection settings for one upstream repository.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Repository root. Paths are appended below it.
    pub base_url: Url,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Extra attempts after a transport failure.
    pub max_retries: u32,
}

impl RemoteConfig {
    /// Configuration for `base_url` with default timeout and retries.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_url("base_url", base_url)?,
            timeout_secs: 30,
            max_retries: 2,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `DEPOT_UPSTREAM_URL` (required)
    /// - `DEPOT_UPSTREAM_TIMEOUT_SECS` (default: 30)
    /// - `DEPOT_UPSTREAM_RETRIES` (default: 2)
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var("DEPOT_UPSTREAM_URL").map_err(|_| ConfigError::MissingUrl)?;
        Ok(Self {
            base_url: parse_url("DEPOT_UPSTREAM_URL", &raw)?,
            timeout_secs: env_number("DEPOT_UPSTREAM_TIMEOUT_SECS").unwrap_or(30),
            max_retries: env_number("DEPOT_UPSTREAM_RETRIES").unwrap_or(2),
        })
    }

    /// Absolute URL of a repository path.
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn parse_url(name: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(name.to_string(), e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidUrl(
            name.to_string(),
            format!("unsupported scheme {other}"),
        )),
    }
}

fn env_number<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|s| s.trim().parse().ok())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DEPOT_UPSTREAM_URL environment variable is required")]
    MissingUrl,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}
