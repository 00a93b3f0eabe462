//! Parsing of the `recipients` query parameter.

use crate::core::Recipient;
use crate::errors::RelayError;

/// Splits a comma separated list into recipients, keeping order.
///
/// Tokens are taken as-is: no trimming and no format checks. An absent or empty
/// parameter is reported as `RelayError::MissingParameter`.
pub fn resolve(param: Option<&str>) -> Result<Vec<Recipient>, RelayError> {
    match param {
        None | Some("") => Err(RelayError::MissingParameter),
        Some(list) => Ok(list.split(',').map(Recipient::new).collect()),
    }
}
