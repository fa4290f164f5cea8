//! Client configuration
//!
//! One serde-friendly structure that can be loaded from YAML or from the
//! environment, and converted into the HTTP engine and rate limiter configs.

use crate::auth::{AuthConfig, Credentials};
use crate::error::{Error, Result};
use crate::http::{duration_from_secs, HttpClientConfig, RateLimiterConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default API host
pub const DEFAULT_BASE_URL: &str = "https://api.planningcenteronline.com";

/// Environment variables read by [`ClientConfig::from_env`]
pub mod env {
    /// Basic auth application id
    pub const APP_ID: &str = "PCO_APP_ID";
    /// Basic auth secret
    pub const SECRET: &str = "PCO_SECRET";
    /// Bearer access token
    pub const ACCESS_TOKEN: &str = "PCO_ACCESS_TOKEN";
    /// Webhook signing secret
    pub const WEBHOOK_SECRET: &str = "PCO_WEBHOOK_SECRET";
    /// API host override
    pub const BASE_URL: &str = "PCO_BASE_URL";
    /// API version override
    pub const API_VERSION: &str = "PCO_API_VERSION";
}

// ============================================================================
// Client Config
// ============================================================================

/// Complete client configuration
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API host
    pub base_url: String,

    /// Version segment placed after the product name
    pub api_version: String,

    /// Static credentials
    pub credentials: Credentials,

    /// Secret used to verify webhook signatures
    pub webhook_secret: Option<String>,

    /// Timeout for each network call, in seconds
    pub timeout_secs: u64,

    /// Total attempts for network-level failures
    pub max_retries: u32,

    /// Delay before the first network retry, in seconds
    pub retry_delay_secs: f64,

    /// Multiplier for network and 429 backoff
    pub backoff_factor: f64,

    /// Upper bound for one network backoff sleep, in seconds
    pub max_backoff_secs: u64,

    /// 429 responses absorbed per request before failing
    pub max_rate_limit_retries: u32,

    /// Requests admitted per window
    pub rate_limit_max_requests: u32,

    /// Length of the sliding window, in seconds
    pub rate_limit_window_secs: u64,

    /// Page size when a query sets none
    pub default_per_page: u32,

    /// Largest page size sent to the server
    pub max_per_page: u32,

    /// User agent override
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: crate::resource::DEFAULT_API_VERSION.to_string(),
            credentials: Credentials::default(),
            webhook_secret: None,
            timeout_secs: 30,
            max_retries: 3,
            retry_delay_secs: 1.0,
            backoff_factor: 2.0,
            max_backoff_secs: 60,
            max_rate_limit_retries: 10,
            rate_limit_max_requests: 100,
            rate_limit_window_secs: 20,
            default_per_page: crate::resource::DEFAULT_PER_PAGE,
            max_per_page: crate::resource::MAX_PER_PAGE,
            user_agent: None,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("credentials", &self.credentials)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_secs", &self.retry_delay_secs)
            .field("backoff_factor", &self.backoff_factor)
            .field("max_backoff_secs", &self.max_backoff_secs)
            .field("max_rate_limit_retries", &self.max_rate_limit_retries)
            .field("rate_limit_max_requests", &self.rate_limit_max_requests)
            .field("rate_limit_window_secs", &self.rate_limit_window_secs)
            .field("default_per_page", &self.default_per_page)
            .field("max_per_page", &self.max_per_page)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ClientConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Defaults overlaid with `PCO_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`; empty values are ignored
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(app_id) = get(env::APP_ID) {
            config.credentials.app_id = Some(app_id);
        }
        if let Some(secret) = get(env::SECRET) {
            config.credentials.secret = Some(secret);
        }
        if let Some(token) = get(env::ACCESS_TOKEN) {
            config.credentials.access_token = Some(token);
        }
        if let Some(secret) = get(env::WEBHOOK_SECRET) {
            config.webhook_secret = Some(secret);
        }
        if let Some(base_url) = get(env::BASE_URL) {
            config.base_url = base_url;
        }
        if let Some(version) = get(env::API_VERSION) {
            config.api_version = version;
        }

        config
    }

    /// Set the API host
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the API version segment
    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Set credentials
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the webhook secret
    #[must_use]
    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    /// Set the per-call timeout
    #[must_use]
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set network retry behaviour
    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, retry_delay_secs: f64, backoff_factor: f64) -> Self {
        self.max_retries = max_retries;
        self.retry_delay_secs = retry_delay_secs;
        self.backoff_factor = backoff_factor;
        self
    }

    /// Set the sliding window
    #[must_use]
    pub fn with_rate_limit(mut self, max_requests: u32, window_secs: u64) -> Self {
        self.rate_limit_max_requests = max_requests;
        self.rate_limit_window_secs = window_secs;
        self
    }

    /// Set default and maximum page sizes
    #[must_use]
    pub fn with_page_limits(mut self, default_per_page: u32, max_per_page: u32) -> Self {
        self.default_per_page = default_per_page;
        self.max_per_page = max_per_page;
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Check the configuration is usable for API requests
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::missing_field("base_url"));
        }
        url::Url::parse(&self.base_url)?;

        if self.api_version.trim().is_empty() {
            return Err(Error::missing_field("api_version"));
        }

        AuthConfig::from_credentials(&self.credentials)?;

        if self.timeout_secs == 0 {
            return Err(Error::config("timeout_secs must be greater than 0"));
        }
        if !self.retry_delay_secs.is_finite() || self.retry_delay_secs < 0.0 {
            return Err(Error::config("retry_delay_secs must be a non-negative number"));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(Error::config("backoff_factor must be at least 1.0"));
        }
        if self.rate_limit_max_requests == 0 {
            return Err(Error::config("rate_limit_max_requests must be greater than 0"));
        }
        if self.max_per_page == 0 {
            return Err(Error::config("max_per_page must be greater than 0"));
        }
        if self.default_per_page == 0 || self.default_per_page > self.max_per_page {
            return Err(Error::config(format!(
                "default_per_page must be between 1 and max_per_page ({})",
                self.max_per_page
            )));
        }

        Ok(())
    }

    /// Rate limiter settings
    pub fn rate_limiter_config(&self) -> RateLimiterConfig {
        RateLimiterConfig::new(
            self.rate_limit_max_requests,
            Duration::from_secs(self.rate_limit_window_secs),
        )
        .with_backoff(self.max_retries, self.backoff_factor)
    }

    /// HTTP engine settings
    pub fn http_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .max_retries(self.max_retries)
            .backoff(
                duration_from_secs(self.retry_delay_secs),
                self.backoff_factor,
                Duration::from_secs(self.max_backoff_secs),
            )
            .max_rate_limit_retries(self.max_rate_limit_retries)
            .rate_limit(self.rate_limiter_config());

        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        builder.build()
    }
}
