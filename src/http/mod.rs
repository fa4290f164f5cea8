//! HTTP client module
//!
//! Provides the request engine with admission control, retry, and backoff.
//!
//! # Features
//!
//! - **Rate Limiting**: Sliding-window admission control shared across callers
//! - **429 Handling**: Honors `Retry-After`, falls back to exponential backoff
//! - **Automatic Retries**: Network failures retried with exponential backoff
//! - **Typed Errors**: Error statuses mapped onto the crate error taxonomy
//! - **Pluggable Transport**: reqwest by default, any [`Transport`] in tests

mod client;
mod rate_limit;
mod transport;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub(crate) use rate_limit::duration_from_secs;
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use transport::{parse_retry_after, HttpRequest, RawResponse, ReqwestTransport, Transport};
