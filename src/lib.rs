/// alertrelay - Alertmanager webhook to SMS relay
///
/// This library provides the building blocks of the relay: decoding webhook
/// payloads, rendering the SMS body, resolving recipients and fanning the
/// message out to every recipient through an SMS provider.
pub mod notification;

pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod errors;
pub mod formatting;
pub mod internal_metrics;
pub mod payload;
pub mod recipients;
pub mod server;
pub mod task_manager;

// Re-export core types for convenience
pub use crate::core::*;
