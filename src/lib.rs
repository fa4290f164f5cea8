// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # PCO Client
//!
//! An async client for a paginated, rate-limited, JSON:API-shaped web
//! service (Planning Center style), plus a receiver for the webhooks it sends.
//!
//! ## Features
//!
//! - **Generic Resources**: One CRUD path for every product and endpoint
//! - **Rate Limiting**: Sliding-window admission control shared across callers
//! - **Retries**: 429 backoff honoring `Retry-After`, exponential network retries
//! - **Lazy Pagination**: Offset traversal exposed as a `Stream`
//! - **Webhooks**: HMAC-SHA256 verification and sync/async handler dispatch
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use futures::TryStreamExt;
//! use pco_client::{ClientConfig, QueryOptions, ResourceClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ClientConfig::from_env();
//!     let client = ResourceClient::from_config(&config)?;
//!
//!     let options = QueryOptions::new().filter("status", "active").per_page(100);
//!     let mut people = Box::pin(client.paginate_all("people", "people", &options));
//!     while let Some(person) = people.try_next().await? {
//!         println!("{}", person.attribute_or("name", String::new()));
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐   ┌──────────────────────┐
//! │ pagination (Stream over pages)       │   │ webhook              │
//! ├──────────────────────────────────────┤   │  verify → parse →    │
//! │ resource (URL, query, JSON:API docs) │   │  dispatch            │
//! ├──────────────────────────────────────┤   └──────────────────────┘
//! │ http (admission, 429, retry, errors) │
//! ├────────────┬─────────────────────────┤
//! │ auth       │ transport (reqwest)     │
//! └────────────┴─────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the client
pub mod error;

/// Common types and type aliases
pub mod types;

/// Authentication header construction
pub mod auth;

/// HTTP request engine with retry and rate limiting
pub mod http;

/// Generic JSON:API resource client
pub mod resource;

/// Lazy collection traversal
pub mod pagination;

/// Webhook verification and dispatch
pub mod webhook;

/// Client configuration
pub mod config;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use auth::Credentials;
pub use config::ClientConfig;
pub use http::{HttpClient, HttpClientConfig, RateLimiter, RateLimiterConfig};
pub use resource::{Document, GenericCollection, GenericResource, QueryOptions, ResourceClient};
pub use webhook::{WebhookDispatcher, WebhookEnvelope, WebhookHandler};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
