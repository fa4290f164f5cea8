//! Error types for the PCO client
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use crate::http::RawResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Boxed error used for transport failures and handler errors
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// One entry of a JSON:API `errors` array
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// Details carried by every HTTP status error
#[derive(Debug, Clone, PartialEq)]
pub struct ApiErrorDetails {
    /// HTTP status code
    pub status: u16,
    /// Human readable message for display
    pub message: String,
    /// Parsed JSON:API error objects (empty for bare `{"error": ...}` bodies)
    pub errors: Vec<ErrorObject>,
    /// Raw parsed body
    pub body: Value,
}

impl ApiErrorDetails {
    /// Build details from a status code and a parsed error body
    pub fn from_body(status: u16, body: Value) -> Self {
        let errors: Vec<ErrorObject> = body
            .get("errors")
            .and_then(|e| serde_json::from_value(e.clone()).ok())
            .unwrap_or_default();

        let message = errors
            .iter()
            .find_map(|e| e.detail.clone().or_else(|| e.title.clone()))
            .or_else(|| {
                body.get("error")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
            })
            .unwrap_or_else(|| {
                reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        Self {
            status,
            message,
            errors,
            body,
        }
    }
}

impl std::fmt::Display for ApiErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.message)
    }
}

/// The main error type for the PCO client
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // API Status Errors
    // ============================================================================
    #[error("Authentication failed: {0}")]
    Authentication(ApiErrorDetails),

    #[error("Permission denied: {0}")]
    Permission(ApiErrorDetails),

    #[error("Not found: {0}")]
    NotFound(ApiErrorDetails),

    #[error("Validation failed: {0}")]
    Validation(ApiErrorDetails),

    #[error("Rate limited: {details}")]
    RateLimited {
        retry_after: Option<Duration>,
        details: ApiErrorDetails,
    },

    #[error("Server error: {0}")]
    Server(ApiErrorDetails),

    #[error("API error: {0}")]
    Api(ApiErrorDetails),

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ============================================================================
    // Decoding Errors
    // ============================================================================
    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("Expected a {expected} document, got {actual}")]
    UnexpectedDocument {
        expected: &'static str,
        actual: &'static str,
    },

    // ============================================================================
    // Webhook Errors
    // ============================================================================
    #[error("Webhook signature header missing")]
    MissingSignature,

    #[error("Webhook signature invalid: {message}")]
    Signature { message: String },

    #[error("Invalid webhook payload: {message}")]
    Payload { message: String },

    #[error("Handler for '{event_type}' failed: {source}")]
    HandlerExecution {
        event_type: String,
        #[source]
        source: BoxError,
    },
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create a network error without an underlying cause
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a signature error
    pub fn signature(message: impl Into<String>) -> Self {
        Self::Signature {
            message: message.into(),
        }
    }

    /// Create a webhook payload error
    pub fn payload(message: impl Into<String>) -> Self {
        Self::Payload {
            message: message.into(),
        }
    }

    /// Map an HTTP status and parsed body onto the error taxonomy
    pub fn from_status(status: u16, body: Value, retry_after: Option<Duration>) -> Self {
        let details = ApiErrorDetails::from_body(status, body);
        match status {
            401 => Self::Authentication(details),
            403 => Self::Permission(details),
            404 => Self::NotFound(details),
            422 => Self::Validation(details),
            429 => Self::RateLimited {
                retry_after,
                details,
            },
            s if s >= 500 => Self::Server(details),
            _ => Self::Api(details),
        }
    }

    /// Build a typed error from a failed response
    ///
    /// Bodies that are not JSON are wrapped as `{"error": <text>}`.
    pub fn from_response(response: &RawResponse) -> Self {
        let body = response
            .json::<Value>()
            .unwrap_or_else(|_| serde_json::json!({ "error": response.text() }));
        Self::from_status(response.status, body, response.retry_after())
    }

    /// HTTP status code, for errors produced from a response
    pub fn status(&self) -> Option<u16> {
        self.details().map(|d| d.status)
    }

    /// Parsed error details, for errors produced from a response
    pub fn details(&self) -> Option<&ApiErrorDetails> {
        match self {
            Error::Authentication(d)
            | Error::Permission(d)
            | Error::NotFound(d)
            | Error::Validation(d)
            | Error::Server(d)
            | Error::Api(d)
            | Error::RateLimited { details: d, .. } => Some(d),
            _ => None,
        }
    }

    /// Check if this error is a network-level failure that may be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network { .. } | Error::Timeout { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Result type alias for the PCO client
pub type Result<T> = std::result::Result<T, Error>;
