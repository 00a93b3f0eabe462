//! # Metrics Server
//!
//! This module defines the `MetricsServer`, which runs an `axum`-based web
//! server exposing the collected metrics to a Prometheus scraper at `/metrics`.
//!
//! The server shuts down gracefully when the application's shutdown signal
//! fires.

use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::future::Future;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, trace};

/// A server that exposes metrics to a Prometheus scraper.
pub struct MetricsServer {
    listener: TcpListener,
    prom_handle: PrometheusHandle,
    shutdown_rx: watch::Receiver<bool>,
}

impl MetricsServer {
    /// Creates a new `MetricsServer` but does not spawn it.
    ///
    /// # Arguments
    ///
    /// * `listener` - A `TcpListener` that has already been bound to an address.
    /// * `prom_handle` - A `PrometheusHandle` used to render the metrics.
    /// * `shutdown_rx` - A watch channel receiver for graceful shutdown.
    pub fn new(
        listener: TcpListener,
        prom_handle: PrometheusHandle,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            listener,
            prom_handle,
            shutdown_rx,
        }
    }

    /// Returns a future that runs the server until a shutdown signal is received.
    pub fn run(self) -> impl Future<Output = ()> {
        let prom_handle = self.prom_handle;
        let app = Router::new().route(
            "/metrics",
            get(move || {
                let prom_handle = prom_handle.clone();
                async move { prom_handle.render() }
            }),
        );
        let mut shutdown_rx = self.shutdown_rx;
        let listener = self.listener;

        async move {
            let shutdown = async move {
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
                trace!("Metrics server received shutdown signal.");
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("Metrics server error: {}", e);
            }
            trace!("Metrics server task finished.");
        }
    }
}
