//! Error types shared across the relay.

use thiserror::Error;

/// The inbound webhook body could not be turned into an `AlertBatch`.
#[derive(Debug, Error)]
#[error("invalid alert payload: {0}")]
pub struct DecodeError(#[from] pub serde_json::Error);

/// A formatter could not produce a message body.
#[derive(Debug, Error)]
#[error("failed to render message: {0}")]
pub struct RenderError(pub String);

/// Errors surfaced synchronously to the webhook caller.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("URL param 'recipients' is missing")]
    MissingParameter,

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Body(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl RelayError {
    /// Short label used for logging and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            RelayError::MissingParameter => "missing_parameter",
            RelayError::PayloadTooLarge { .. } => "payload_too_large",
            RelayError::Body(_) => "body",
            RelayError::Decode(_) => "decode",
            RelayError::Render(_) => "render",
        }
    }
}

/// The provider could not be reached, or its reply could not be read.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to SMS provider timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("could not connect to SMS provider: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("HTTP request to SMS provider failed: {0}")]
    Http(#[source] reqwest::Error),

    /// Used by non-HTTP transports and test doubles.
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e)
        } else if e.is_connect() {
            TransportError::Connect(e)
        } else {
            TransportError::Http(e)
        }
    }
}
