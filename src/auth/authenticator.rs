//! Authenticator implementation
//!
//! Builds the JSON:API headers and the `Authorization` header.

use super::types::{AuthConfig, Credentials};
use crate::error::Result;
use crate::types::StringMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Content type used for both requests and responses
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Authenticator builds the auth headers for every request
#[derive(Debug, Clone)]
pub struct Authenticator {
    credentials: Credentials,
}

impl Authenticator {
    /// Create a new authenticator from static credentials
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Resolve the auth scheme
    pub fn config(&self) -> Result<AuthConfig> {
        AuthConfig::from_credentials(&self.credentials)
    }

    /// Headers for one request: `Content-Type`, `Accept` and `Authorization`
    ///
    /// Fails with a configuration error when no credentials are usable.
    pub fn headers(&self) -> Result<StringMap> {
        let authorization = match self.config()? {
            AuthConfig::Bearer { token } => format!("Bearer {token}"),
            AuthConfig::Basic { app_id, secret } => {
                format!("Basic {}", STANDARD.encode(format!("{app_id}:{secret}")))
            }
        };

        let mut headers = StringMap::with_capacity(3);
        headers.insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());
        headers.insert("Accept".to_string(), JSON_CONTENT_TYPE.to_string());
        headers.insert("Authorization".to_string(), authorization);
        Ok(headers)
    }

    /// Get the credentials this authenticator was built from
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}
