//! Authentication module
//!
//! Supports: Bearer (personal access token / OAuth token) and Basic
//! (application id + secret).
//!
//! The `Authenticator` builds the headers sent with every request. It is a
//! pure function of static credentials: no token refresh, no retry.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::{AuthConfig, Credentials};
