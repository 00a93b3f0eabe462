//! Core domain types and service traits for alertrelay
//!
//! This module defines the data structures that flow from the inbound webhook
//! to the SMS provider, and the trait contracts that let the dispatcher talk to
//! any transport implementation.

use crate::errors::TransportError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::Arc;

/// A batch of alerts as posted by Alertmanager's webhook receiver.
///
/// An explicit `null` reads as the empty value, a missing `status` or
/// `alerts` key does not.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct AlertBatch {
    /// Webhook payload version (e.g. "4")
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: String,
    /// Group status, "firing" or "resolved"
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    /// The alerts of the group, in the order Alertmanager sent them
    #[serde(deserialize_with = "null_as_default")]
    pub alerts: Vec<Alert>,
}

/// One alert condition within a batch.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct Alert {
    #[serde(default, deserialize_with = "null_as_default")]
    pub annotations: Annotations,
    /// When the condition started firing
    #[serde(default, rename = "startsAt")]
    pub starts_at: Option<DateTime<Utc>>,
}

/// Human readable annotations attached to an alert.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
pub struct Annotations {
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The text body sent to every recipient of a batch.
///
/// Cloning is cheap: all delivery tasks share the same allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage(Arc<str>);

impl RenderedMessage {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A single recipient token, exactly as it appeared in the recipients list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Recipient(String);

impl Recipient {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The provider address for this recipient, with exactly one leading `+`.
    pub fn to_address(&self) -> String {
        if self.0.starts_with('+') {
            self.0.clone()
        } else {
            format!("+{}", self.0)
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One outbound SMS, addressed to a single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundSms {
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Body")]
    pub body: String,
}

/// The raw reply of the SMS provider, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

// =============================================================================
// Service Traits
// =============================================================================

/// Sends a single SMS through a provider.
#[async_trait]
pub trait SmsTransport: Send + Sync {
    /// Performs exactly one request to the provider.
    ///
    /// # Returns
    /// * `Ok(TransportResponse)` whenever the provider answered, whatever the status
    /// * `Err` for connection failures, timeouts and unreadable bodies
    async fn send(&self, sms: &OutboundSms) -> Result<TransportResponse, TransportError>;
}
