//! Parsed inbound webhook events

use crate::error::{Error, Result};
use crate::resource::GenericResource;
use crate::types::{JsonObject, JsonValue};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

/// One parsed inbound event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookEnvelope {
    /// Event name, e.g. `people.v2.events.person.created`
    pub event_type: String,
    /// Resource the event is about, as sent
    pub resource: JsonValue,
    /// When the event happened; the receive time if the payload had none
    pub timestamp: DateTime<Utc>,
    /// Whether `timestamp` came from the payload
    pub timestamp_provided: bool,
    /// When the payload was parsed
    pub received_at: DateTime<Utc>,
    /// Delivery id
    pub webhook_id: Option<String>,
    /// Sending organization
    pub organization_id: Option<String>,
}

impl WebhookEnvelope {
    /// Parse a raw payload
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let value: JsonValue = serde_json::from_slice(payload)
            .map_err(|e| Error::payload(format!("payload is not valid JSON: {e}")))?;
        let JsonValue::Object(body) = value else {
            return Err(Error::payload("payload is not a JSON object"));
        };
        Self::from_object(body, Utc::now())
    }

    fn from_object(mut body: JsonObject, received_at: DateTime<Utc>) -> Result<Self> {
        let event_type = match body.remove("event_type") {
            Some(JsonValue::String(s)) if !s.trim().is_empty() => s,
            Some(JsonValue::String(_)) => return Err(Error::payload("event_type is empty")),
            Some(other) => {
                return Err(Error::payload(format!(
                    "event_type must be a string, got {other}"
                )))
            }
            None => return Err(Error::payload("missing required field: event_type")),
        };

        let timestamp = match body.remove("timestamp") {
            None | Some(JsonValue::Null) => None,
            Some(value) => Some(parse_timestamp(&value)?),
        };

        Ok(Self {
            event_type,
            resource: body.remove("resource").unwrap_or(JsonValue::Null),
            timestamp_provided: timestamp.is_some(),
            timestamp: timestamp.unwrap_or(received_at),
            received_at,
            webhook_id: optional_id(body.get("webhook_id"), "webhook_id")?,
            organization_id: optional_id(body.get("organization_id"), "organization_id")?,
        })
    }

    /// Decode `resource` as a JSON:API resource
    ///
    /// Accepts both a bare resource object and a `{"data": {...}}` document.
    pub fn resource_as_generic(&self) -> Result<GenericResource> {
        let resource = match self.resource.get("data") {
            Some(data @ JsonValue::Object(_)) => data,
            _ => &self.resource,
        };
        serde_json::from_value(resource.clone())
            .map_err(|e| Error::payload(format!("resource is not a JSON:API resource: {e}")))
    }
}

fn parse_timestamp(value: &JsonValue) -> Result<DateTime<Utc>> {
    let parsed = match value {
        JsonValue::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok(),
        JsonValue::Number(n) => match n.as_i64() {
            Some(secs) => Utc.timestamp_opt(secs, 0).single(),
            None => n.as_f64().and_then(|secs| {
                let millis = (secs * 1000.0).round();
                if millis.is_finite() && millis.abs() < i64::MAX as f64 {
                    Utc.timestamp_millis_opt(millis as i64).single()
                } else {
                    None
                }
            }),
        },
        _ => None,
    };

    parsed.ok_or_else(|| Error::payload(format!("invalid timestamp: {value}")))
}

fn optional_id(value: Option<&JsonValue>, field: &str) -> Result<Option<String>> {
    match value {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(JsonValue::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(Error::payload(format!(
            "{field} must be a string or number, got {other}"
        ))),
    }
}
