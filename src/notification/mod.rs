//! Delivery of rendered messages to SMS recipients.
//!
//! The `dispatcher` fans a message out over an `SmsTransport`, the `twilio`
//! module provides the production transport, and `outcome` turns provider
//! replies into the per-recipient result that gets logged.
pub mod dispatcher;
pub mod outcome;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod twilio;
