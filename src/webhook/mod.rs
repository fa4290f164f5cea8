//! Webhook module
//!
//! Receiving side of push notifications:
//!
//! 1. [`verify_signature`]: HMAC-SHA256 of the raw body against the
//!    `x-pco-signature` header
//! 2. [`WebhookEnvelope::parse`]: decode the event envelope
//! 3. [`WebhookDispatcher::dispatch`]: run the handler registered for the
//!    event type
//!
//! [`WebhookDispatcher::handle`] runs all three. Route registration and body
//! extraction belong to the embedding HTTP server.

mod dispatcher;
mod envelope;
mod signature;

pub use dispatcher::{HandlerResult, WebhookDispatcher, WebhookHandler};
pub use envelope::WebhookEnvelope;
pub use signature::{sign_payload, verify_signature, SIGNATURE_HEADER, SIGNATURE_PREFIX};
