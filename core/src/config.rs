//! Client configuration.
//!
//! Everything that used to be a process-wide constant (page ceiling, host,
//! timeouts) lives here so independent clients can coexist.

use std::time::Duration;

use url::Url;

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://www.bibsonomy.org/api";
pub const DEFAULT_MAX_POSTS_PER_REQUEST: usize = 1000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 64 * 1024 * 1024;

/// Credentials and limits for one BibSonomy client.
#[derive(Clone)]
pub struct ClientConfig {
    pub user_name: String,
    pub api_key: String,
    /// Root of the REST API, without a trailing slash.
    pub base_url: String,
    /// Most posts the server returns for a single request.
    pub max_posts_per_request: usize,
    pub timeout: Duration,
    /// Largest document or preview the transport will read into memory.
    pub max_download_bytes: u64,
}

impl ClientConfig {
    pub fn new(user_name: &str, api_key: &str) -> Self {
        Self {
            user_name: user_name.to_string(),
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_posts_per_request: DEFAULT_MAX_POSTS_PER_REQUEST,
            timeout: DEFAULT_TIMEOUT,
            max_download_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
        }
    }

    /// Build the config from environment variables.
    ///
    /// Required env vars:
    /// - `BIBSONOMY_USER`
    /// - `BIBSONOMY_API_KEY`
    ///
    /// Optional: `BIBSONOMY_URL`, `BIBSONOMY_PAGE_SIZE`,
    /// `BIBSONOMY_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let user_name = lookup("BIBSONOMY_USER").ok_or_else(|| ApiError::Config("BIBSONOMY_USER not set".into()))?;
        let api_key =
            lookup("BIBSONOMY_API_KEY").ok_or_else(|| ApiError::Config("BIBSONOMY_API_KEY not set".into()))?;
        let mut config = Self::new(&user_name, &api_key);

        if let Some(url) = lookup("BIBSONOMY_URL") {
            config = config.with_base_url(&url)?;
        }
        if let Some(size) = lookup("BIBSONOMY_PAGE_SIZE") {
            let size = size
                .parse()
                .map_err(|_| ApiError::Config(format!("BIBSONOMY_PAGE_SIZE is not a number: {size:?}")))?;
            config = config.with_max_posts_per_request(size)?;
        }
        if let Some(secs) = lookup("BIBSONOMY_TIMEOUT_SECS") {
            let secs = secs
                .parse()
                .map_err(|_| ApiError::Config(format!("BIBSONOMY_TIMEOUT_SECS is not a number: {secs:?}")))?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    /// Point the client at another API root. Must be an absolute http(s) URL.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ApiError> {
        let trimmed = base_url.trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|e| ApiError::Config(format!("invalid base URL {base_url:?}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::Config(format!("unsupported scheme in base URL {base_url:?}")));
        }
        self.base_url = trimmed.to_string();
        Ok(self)
    }

    pub fn with_max_posts_per_request(mut self, max: usize) -> Result<Self, ApiError> {
        if max == 0 {
            return Err(ApiError::Config("page size must be at least 1".into()));
        }
        self.max_posts_per_request = max;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_download_bytes(mut self, max: u64) -> Self {
        self.max_download_bytes = max;
        self
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("user_name", &self.user_name)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("max_posts_per_request", &self.max_posts_per_request)
            .field("timeout", &self.timeout)
            .field("max_download_bytes", &self.max_download_bytes)
            .finish()
    }
}
