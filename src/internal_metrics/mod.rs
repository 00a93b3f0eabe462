//! # Internal Metrics Module
//!
//! This module provides the infrastructure for collecting and exposing relay
//! metrics.
//!
//! ## Components:
//!
//! - **`MetricsBuilder`**: The entry point for initializing the metrics system.
//!   It installs the Prometheus recorder, binds the metrics listener, and
//!   constructs the `Metrics` handle.
//!
//! - **`Metrics`**: A lightweight, cloneable struct that serves as the public
//!   API for the rest of the application. It provides high-level methods for
//!   updating the predefined metrics.
//!
//! - **`MetricsServer`**: (Defined in `server.rs`) An `axum`-based web server
//!   that exposes the `/metrics` endpoint for Prometheus to scrape.

use crate::config::MetricsConfig;
use crate::internal_metrics::server::MetricsServer;
use anyhow::{Context, Result};
use metrics::{Counter, Histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::error;

pub mod server;

/// The public API for the metrics system.
///
/// This struct holds cloneable handles to the metrics collectors.
#[derive(Clone)]
pub struct Metrics {
    pub alert_batches_received_total: Counter,
    pub sms_delivery_duration_seconds: Histogram,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Creates a new `Metrics` instance and registers descriptions for all
    /// supported metrics with the global recorder.
    pub fn new() -> Self {
        metrics::describe_counter!("alert_batches_received_total", Unit::Count, "Total number of webhook requests that reached the relay.");
        metrics::describe_counter!("alert_batches_rejected_total", Unit::Count, "Total number of webhook requests refused, labeled by reason.");
        metrics::describe_counter!("sms_deliveries_total", Unit::Count, "Total number of SMS delivery attempts, labeled by outcome.");
        metrics::describe_histogram!("sms_delivery_duration_seconds", Unit::Seconds, "The time taken by a single provider request.");

        Self {
            alert_batches_received_total: metrics::counter!("alert_batches_received_total"),
            sms_delivery_duration_seconds: metrics::histogram!("sms_delivery_duration_seconds"),
        }
    }

    /// Creates a `Metrics` instance that performs no operations.
    /// Used when metrics are disabled in the configuration.
    pub fn disabled() -> Self {
        Self {
            alert_batches_received_total: Counter::noop(),
            sms_delivery_duration_seconds: Histogram::noop(),
        }
    }

    /// Increments the counter for a refused webhook request.
    pub fn increment_batch_rejected(&self, reason: &'static str) {
        metrics::counter!("alert_batches_rejected_total", "reason" => reason).increment(1);
    }

    /// Records the outcome and duration of one delivery attempt.
    pub fn record_delivery(&self, outcome: &'static str, duration: Duration) {
        metrics::counter!("sms_deliveries_total", "outcome" => outcome).increment(1);
        self.sms_delivery_duration_seconds.record(duration.as_secs_f64());
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for the metrics system.
///
/// This builder is responsible for initializing the `PrometheusRecorder`,
/// creating the `MetricsServer`, and creating the `Metrics` handle.
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    /// Creates a new `MetricsBuilder` with the given configuration.
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Initializes the metrics system and returns a `Metrics` handle and an
    /// optional `MetricsServer` together with its bound address.
    ///
    /// If metrics are disabled in the configuration, this method returns a
    /// disabled `Metrics` instance and `None` for the server. A recorder that
    /// cannot be installed is logged and also yields a disabled instance.
    pub async fn build(
        self,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<(Metrics, Option<(MetricsServer, SocketAddr)>)> {
        if !self.config.enabled {
            return Ok((Metrics::disabled(), None));
        }

        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
            )
            .context("invalid histogram buckets")?
            .build_recorder();
        let handle = recorder.handle();

        let listener = TcpListener::bind(self.config.listen_address)
            .await
            .with_context(|| {
                format!(
                    "failed to bind metrics server to {}",
                    self.config.listen_address
                )
            })?;
        let addr = listener.local_addr()?;

        if let Err(e) = metrics::set_global_recorder(recorder) {
            error!("Failed to install Prometheus recorder: {}", e);
            return Ok((Metrics::disabled(), None));
        }

        let metrics = Metrics::new();
        let server = MetricsServer::new(listener, handle, shutdown_rx);
        Ok((metrics, Some((server, addr))))
    }
}
