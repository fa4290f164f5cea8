//! HTTP client with retry and rate limiting
//!
//! Provides the request engine that handles:
//! - Sliding-window admission control before each logical request
//! - Reactive backoff when the server answers 429
//! - Retries with exponential backoff on network failures
//! - Translation of error statuses into typed errors

use super::rate_limit::{duration_from_secs, RateLimiter, RateLimiterConfig};
use super::transport::{HttpRequest, RawResponse, ReqwestTransport, Transport};
use crate::auth::{Authenticator, Credentials};
use crate::error::{Error, Result};
use crate::types::{Method, QueryParams, StringMap};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL for relative request paths
    pub base_url: Option<String>,
    /// Overall timeout for each network call
    pub timeout: Duration,
    /// Total number of attempts for network-level failures
    pub max_retries: u32,
    /// Delay before the first network retry
    pub retry_delay: Duration,
    /// Multiplier applied to the delay on each further retry
    pub backoff_factor: f64,
    /// Upper bound for a single network backoff sleep
    pub max_backoff: Duration,
    /// How many 429 responses to absorb before giving up
    pub max_rate_limit_retries: u32,
    /// Rate limiter configuration
    pub rate_limit: RateLimiterConfig,
    /// Default headers for all requests
    pub default_headers: StringMap,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_backoff: Duration::from_secs(60),
            max_rate_limit_retries: 10,
            rate_limit: RateLimiterConfig::default(),
            default_headers: StringMap::new(),
            user_agent: format!("pco-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, retry_delay: Duration, backoff_factor: f64, max: Duration) -> Self {
        self.config.retry_delay = retry_delay;
        self.config.backoff_factor = backoff_factor;
        self.config.max_backoff = max;
        self
    }

    /// Set how many 429 responses are retried before failing
    pub fn max_rate_limit_retries(mut self, retries: u32) -> Self {
        self.config.max_rate_limit_retries = retries;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = config;
        self
    }

    /// Disable proactive rate limiting (429 backoff still applies)
    pub fn no_rate_limit(mut self) -> Self {
        let RateLimiterConfig {
            max_retries,
            backoff_factor,
            ..
        } = self.config.rate_limit;
        self.config.rate_limit = RateLimiterConfig::unlimited().with_backoff(max_retries, backoff_factor);
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Configuration for a single request
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Query parameters
    pub query: QueryParams,
    /// Request headers
    pub headers: StringMap,
    /// Request body (JSON)
    pub body: Option<Value>,
    /// Override timeout for this request
    pub timeout: Option<Duration>,
    /// Override max retries for this request
    pub max_retries: Option<u32>,
}

impl RequestConfig {
    /// Create a new request config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set max retries
    #[must_use]
    pub fn retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }
}

/// HTTP client with retry and rate limiting
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    config: HttpClientConfig,
    authenticator: Authenticator,
    rate_limiter: RateLimiter,
}

impl HttpClient {
    /// Create a client backed by reqwest
    ///
    /// Fails with a configuration error when the credentials are unusable.
    pub fn new(config: HttpClientConfig, credentials: Credentials) -> Result<Self> {
        let transport = ReqwestTransport::new(&config.user_agent)?;
        Self::with_transport(config, credentials, Arc::new(transport))
    }

    /// Create a client on top of a custom transport
    pub fn with_transport(
        config: HttpClientConfig,
        credentials: Credentials,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let authenticator = Authenticator::new(credentials);
        authenticator.config()?;
        let rate_limiter = RateLimiter::new(&config.rate_limit);

        Ok(Self {
            transport,
            config,
            authenticator,
            rate_limiter,
        })
    }

    /// Share an existing rate limiter (and its window) with this client
    #[must_use]
    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Get the rate limiter
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Make a GET request
    pub async fn get(&self, url: &str, config: RequestConfig) -> Result<RawResponse> {
        self.execute(Method::GET, url, config).await
    }

    /// Make a POST request
    pub async fn post(&self, url: &str, body: Value) -> Result<RawResponse> {
        self.execute(Method::POST, url, RequestConfig::default().json(body))
            .await
    }

    /// Make a PATCH request
    pub async fn patch(&self, url: &str, body: Value) -> Result<RawResponse> {
        self.execute(Method::PATCH, url, RequestConfig::default().json(body))
            .await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: &str) -> Result<RawResponse> {
        self.execute(Method::DELETE, url, RequestConfig::default())
            .await
    }

    /// Execute one logical request
    ///
    /// Returns exactly one successful response, or exactly one error:
    /// a typed status error (terminal), `RateLimited` once the 429 budget is
    /// spent, or the last network error once network attempts are exhausted.
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        config: RequestConfig,
    ) -> Result<RawResponse> {
        let max_attempts = config.max_retries.unwrap_or(self.config.max_retries).max(1);
        let request = self.build_request(method, url, config)?;

        self.rate_limiter.acquire().await;

        let mut attempt = 0;
        let mut throttled = 0;

        loop {
            match self.transport.send(&request).await {
                Ok(response) if response.status == 429 => {
                    if throttled >= self.config.max_rate_limit_retries {
                        warn!(
                            "Rate limited (429) on {} {}, giving up after {} retries",
                            method, request.url, throttled
                        );
                        return Err(Error::from_response(&response));
                    }
                    let retry_after = response.retry_after();
                    warn!(
                        "Rate limited (429) on {} {}, retry {}/{}, retry-after {:?}",
                        method,
                        request.url,
                        throttled + 1,
                        self.config.max_rate_limit_retries,
                        retry_after
                    );
                    self.rate_limiter
                        .handle_rate_limit_error(retry_after, throttled)
                        .await;
                    throttled += 1;
                }
                Ok(response) if response.status >= 400 => {
                    debug!(
                        "Request failed: {} {} -> {}",
                        method, request.url, response.status
                    );
                    return Err(Error::from_response(&response));
                }
                Ok(response) => {
                    debug!(
                        "Request succeeded: {} {} -> {}",
                        method, request.url, response.status
                    );
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                    let delay = self.calculate_backoff(attempt);
                    warn!(
                        "{} {} failed: {}, attempt {}/{}, retrying in {:?}",
                        method,
                        request.url,
                        e,
                        attempt + 1,
                        max_attempts,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Execute a request and parse the JSON response
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        config: RequestConfig,
    ) -> Result<T> {
        self.execute(method, url, config).await?.json()
    }

    /// Build the wire request: auth headers, then defaults, then per-request overrides
    fn build_request(&self, method: Method, url: &str, config: RequestConfig) -> Result<HttpRequest> {
        let mut headers = self.authenticator.headers()?;
        merge_headers(&mut headers, &self.config.default_headers);
        merge_headers(&mut headers, &config.headers);

        Ok(HttpRequest {
            method,
            url: self.build_url(url),
            query: config.query,
            headers,
            body: config.body,
            timeout: config.timeout.unwrap_or(self.config.timeout),
        })
    }

    /// Build full URL from path
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        match &self.config.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                let path = path.trim_start_matches('/');
                format!("{base}/{path}")
            }
            None => path.to_string(),
        }
    }

    /// Calculate the network backoff delay for a given attempt
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let secs = self.config.retry_delay.as_secs_f64()
            * self.config.backoff_factor.powi(attempt as i32);
        std::cmp::min(duration_from_secs(secs), self.config.max_backoff)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

/// Insert `overrides` into `headers`, replacing names case-insensitively
fn merge_headers(headers: &mut StringMap, overrides: &StringMap) {
    for (key, value) in overrides {
        headers.retain(|existing, _| !existing.eq_ignore_ascii_case(key));
        headers.insert(key.clone(), value.clone());
    }
}
