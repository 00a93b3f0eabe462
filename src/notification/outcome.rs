//! Classification of provider replies into delivery outcomes.

use crate::core::TransportResponse;
use crate::errors::TransportError;
use serde::Deserialize;
use std::fmt;

/// The provider's `status` field: a word on success (`"queued"`), often the
/// HTTP status number on errors.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ProviderStatus {
    Text(String),
    Code(i64),
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderStatus::Text(s) => f.write_str(s),
            ProviderStatus::Code(c) => write!(f, "{}", c),
        }
    }
}

/// A message resource accepted by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AcceptedReply {
    pub status: ProviderStatus,
    #[serde(alias = "messageId")]
    pub sid: String,
    #[serde(default)]
    pub body: String,
}

/// A provider error document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RejectedReply {
    #[serde(default)]
    pub status: Option<ProviderStatus>,
    pub code: i64,
    pub message: String,
}

/// The two reply shapes the provider is known to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderReply {
    Accepted(AcceptedReply),
    Rejected(RejectedReply),
}

impl ProviderReply {
    /// Decodes a reply body in the shape implied by the HTTP status: the
    /// accepted shape for 2xx, the rejection shape for everything else.
    pub fn decode(http_status: u16, body: &str) -> Result<Self, serde_json::Error> {
        if is_success(http_status) {
            serde_json::from_str(body).map(ProviderReply::Accepted)
        } else {
            serde_json::from_str(body).map(ProviderReply::Rejected)
        }
    }
}

fn is_success(http_status: u16) -> bool {
    (200..300).contains(&http_status)
}

/// The terminal result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered {
        http_status: u16,
        provider_status: String,
        message_id: String,
        body: String,
    },
    Rejected {
        http_status: u16,
        provider_status: Option<String>,
        provider_code: i64,
        provider_message: String,
    },
    TransportFailed {
        cause: String,
    },
    DecodeFailed {
        http_status: u16,
        cause: String,
    },
}

impl DeliveryOutcome {
    /// Classifies the transport result of a single attempt.
    pub fn classify(result: Result<TransportResponse, TransportError>) -> Self {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                return DeliveryOutcome::TransportFailed {
                    cause: e.to_string(),
                }
            }
        };

        match ProviderReply::decode(response.status, &response.body) {
            Ok(ProviderReply::Accepted(reply)) => DeliveryOutcome::Delivered {
                http_status: response.status,
                provider_status: reply.status.to_string(),
                message_id: reply.sid,
                body: reply.body,
            },
            Ok(ProviderReply::Rejected(reply)) => DeliveryOutcome::Rejected {
                http_status: response.status,
                provider_status: reply.status.map(|s| s.to_string()),
                provider_code: reply.code,
                provider_message: reply.message,
            },
            Err(e) => DeliveryOutcome::DecodeFailed {
                http_status: response.status,
                cause: e.to_string(),
            },
        }
    }

    /// Label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DeliveryOutcome::Delivered { .. } => "delivered",
            DeliveryOutcome::Rejected { .. } => "rejected",
            DeliveryOutcome::TransportFailed { .. } => "transport_failed",
            DeliveryOutcome::DecodeFailed { .. } => "decode_failed",
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}
