//! Handler registry and dispatch

use super::envelope::WebhookEnvelope;
use super::signature;
use crate::config::ClientConfig;
use crate::error::{BoxError, Error, Result};
use crate::types::JsonValue;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// What a handler returns
pub type HandlerResult = std::result::Result<JsonValue, BoxError>;

type SyncHandlerFn = dyn Fn(&WebhookEnvelope) -> HandlerResult + Send + Sync;
type AsyncHandlerFn = dyn Fn(WebhookEnvelope) -> BoxFuture<'static, HandlerResult> + Send + Sync;

/// A registered event handler
///
/// Whether a handler is synchronous is fixed when it is created; dispatch
/// calls sync handlers inline and awaits async ones.
#[derive(Clone)]
pub enum WebhookHandler {
    Sync(Arc<SyncHandlerFn>),
    Async(Arc<AsyncHandlerFn>),
}

impl WebhookHandler {
    /// Wrap a plain function
    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(&WebhookEnvelope) -> HandlerResult + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(handler))
    }

    /// Wrap a function returning a future
    pub fn from_async<F, Fut>(handler: F) -> Self
    where
        F: Fn(WebhookEnvelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::Async(Arc::new(move |envelope| Box::pin(handler(envelope))))
    }

    /// Check if the handler must be awaited
    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }

    /// Run the handler on one envelope
    ///
    /// A panic inside the handler is caught and returned as an error.
    pub async fn call(&self, envelope: &WebhookEnvelope) -> HandlerResult {
        let outcome = match self {
            Self::Sync(handler) => panic::catch_unwind(AssertUnwindSafe(|| handler(envelope))),
            Self::Async(handler) => {
                AssertUnwindSafe(async { handler(envelope.clone()).await })
                    .catch_unwind()
                    .await
            }
        };
        outcome.unwrap_or_else(|payload| Err(panic_message(payload.as_ref()).into()))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload");
    format!("handler panicked: {detail}")
}

impl std::fmt::Debug for WebhookHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("WebhookHandler::Sync"),
            Self::Async(_) => f.write_str("WebhookHandler::Async"),
        }
    }
}

/// Verifies, parses and routes inbound webhook payloads
///
/// One handler per event type; registering again replaces the previous one.
#[derive(Default)]
pub struct WebhookDispatcher {
    secret: Option<String>,
    handlers: RwLock<HashMap<String, WebhookHandler>>,
}

impl WebhookDispatcher {
    /// Create a dispatcher without a signing secret
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dispatcher that verifies with `secret`
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
            ..Default::default()
        }
    }

    /// Create a dispatcher using the configured webhook secret
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            secret: config.webhook_secret.clone(),
            ..Default::default()
        }
    }

    /// Check a payload signature
    pub fn verify_signature(&self, payload: &[u8], signature: Option<&str>) -> Result<()> {
        signature::verify_signature(self.secret.as_deref(), payload, signature).inspect_err(|e| {
            warn!("Webhook signature verification failed: {e}");
        })
    }

    /// Parse a raw payload into an envelope
    pub fn parse_payload(&self, payload: &[u8]) -> Result<WebhookEnvelope> {
        WebhookEnvelope::parse(payload)
    }

    /// Route an envelope to its handler
    ///
    /// Returns `None` when no handler is registered for the event type.
    pub async fn dispatch(&self, envelope: &WebhookEnvelope) -> Result<Option<JsonValue>> {
        let handler = self.handlers.read().await.get(&envelope.event_type).cloned();

        let Some(handler) = handler else {
            info!("No handler registered for webhook event: {}", envelope.event_type);
            return Ok(None);
        };

        debug!(
            "Dispatching webhook event {} to {:?}",
            envelope.event_type, handler
        );

        match handler.call(envelope).await {
            Ok(result) => Ok(Some(result)),
            Err(source) => {
                warn!("Handler for {} failed: {source}", envelope.event_type);
                Err(Error::HandlerExecution {
                    event_type: envelope.event_type.clone(),
                    source,
                })
            }
        }
    }

    /// Verify (optionally), parse and dispatch one payload
    pub async fn handle(
        &self,
        payload: &[u8],
        signature: Option<&str>,
        verify: bool,
    ) -> Result<Option<JsonValue>> {
        if verify {
            self.verify_signature(payload, signature)?;
        }
        let envelope = self.parse_payload(payload)?;
        self.dispatch(&envelope).await
    }

    /// Register a handler, returning the one it replaces
    pub async fn register(
        &self,
        event_type: impl Into<String>,
        handler: WebhookHandler,
    ) -> Option<WebhookHandler> {
        let event_type = event_type.into();
        debug!("Registering webhook handler for {event_type}");
        self.handlers.write().await.insert(event_type, handler)
    }

    /// Remove the handler for an event type
    pub async fn unregister(&self, event_type: &str) -> Option<WebhookHandler> {
        self.handlers.write().await.remove(event_type)
    }

    /// Check if an event type has a handler
    pub async fn has_handler(&self, event_type: &str) -> bool {
        self.handlers.read().await.contains_key(event_type)
    }

    /// Registered event types, sorted
    pub async fn list_registered(&self) -> Vec<String> {
        let mut event_types: Vec<String> = self.handlers.read().await.keys().cloned().collect();
        event_types.sort();
        event_types
    }
}

impl std::fmt::Debug for WebhookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookDispatcher")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}
