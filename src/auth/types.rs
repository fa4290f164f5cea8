//! Auth configuration types

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Static credentials supplied by the caller
///
/// Either `app_id` + `secret` (basic auth) or `access_token` (bearer).
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Application id for basic auth
    #[serde(default)]
    pub app_id: Option<String>,
    /// Application secret for basic auth
    #[serde(default)]
    pub secret: Option<String>,
    /// Bearer access token
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Credentials {
    /// Credentials for basic auth
    pub fn basic(app_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            app_id: Some(app_id.into()),
            secret: Some(secret.into()),
            access_token: None,
        }
    }

    /// Credentials for bearer auth
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            app_id: None,
            secret: None,
            access_token: Some(access_token.into()),
        }
    }

    /// Check if no usable credential is present
    pub fn is_empty(&self) -> bool {
        AuthConfig::from_credentials(self).is_err()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("secret", &redact(&self.secret))
            .field("access_token", &redact(&self.access_token))
            .finish()
    }
}

/// Resolved authentication scheme
#[derive(Clone, PartialEq, Eq)]
pub enum AuthConfig {
    /// HTTP Basic authentication
    Basic {
        /// Application id
        app_id: String,
        /// Application secret
        secret: String,
    },

    /// Bearer token authentication
    Bearer {
        /// The bearer token
        token: String,
    },
}

impl AuthConfig {
    /// Resolve credentials into a scheme
    ///
    /// A bearer token wins over basic credentials. Empty strings count as absent.
    pub fn from_credentials(credentials: &Credentials) -> Result<Self> {
        let present = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(String::from);

        if let Some(token) = present(&credentials.access_token) {
            return Ok(Self::Bearer { token });
        }

        match (present(&credentials.app_id), present(&credentials.secret)) {
            (Some(app_id), Some(secret)) => Ok(Self::Basic { app_id, secret }),
            (Some(_), None) => Err(Error::config(
                "app_id is set but secret is missing for basic auth",
            )),
            (None, Some(_)) => Err(Error::config(
                "secret is set but app_id is missing for basic auth",
            )),
            (None, None) => Err(Error::config(
                "No credentials configured: provide an access_token or app_id and secret",
            )),
        }
    }

    /// Name of the scheme, for logging
    pub fn scheme(&self) -> &'static str {
        match self {
            AuthConfig::Basic { .. } => "Basic",
            AuthConfig::Bearer { .. } => "Bearer",
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthConfig::Basic { app_id, .. } => f
                .debug_struct("Basic")
                .field("app_id", app_id)
                .finish_non_exhaustive(),
            AuthConfig::Bearer { .. } => f.debug_struct("Bearer").finish_non_exhaustive(),
        }
    }
}
