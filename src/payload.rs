//! Decoding of Alertmanager webhook payloads.

use crate::core::AlertBatch;
use crate::errors::DecodeError;

/// Parses a webhook body into an `AlertBatch`.
///
/// `status` and `alerts` are required, everything else is optional and unknown
/// fields are ignored. `null` decodes as an empty value. Nothing is returned
/// unless the whole body decodes.
pub fn decode_batch(body: &[u8]) -> Result<AlertBatch, DecodeError> {
    Ok(serde_json::from_slice(body)?)
}
