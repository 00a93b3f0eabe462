//! The main application logic, decoupled from the entry point.

use crate::{
    config::Config,
    core::SmsTransport,
    formatting::{MessageFormatter, SmsTextFormatter},
    internal_metrics::{Metrics, MetricsBuilder},
    notification::{dispatcher::Dispatcher, twilio::TwilioClient},
    server::{self, AppState},
    task_manager::TaskManager,
};
use anyhow::{Context, Result};
use axum::Router;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::watch, task::JoinHandle};
use tracing::{error, info, instrument, warn};

/// A handle to the running application.
pub struct App {
    listener: TcpListener,
    router: Router,
    local_addr: SocketAddr,
    delivery_tasks: TaskManager,
    shutdown_grace: Duration,
    shutdown_rx: watch::Receiver<bool>,
    metrics_addr: Option<SocketAddr>,
    metrics_task: Option<JoinHandle<()>>,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// The address the webhook listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_addr
    }

    /// Serves webhooks until the shutdown signal fires, then drains the
    /// delivery tasks that are still in flight.
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.shutdown_rx.clone();
        info!(address = %self.local_addr, "Accepting alert webhooks");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                // A dropped sender also means shutdown.
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
            })
            .await
            .context("webhook server failed")?;

        info!("Webhook server stopped. Waiting for in-flight deliveries...");
        let aborted = self.delivery_tasks.shutdown(self.shutdown_grace).await;
        if aborted > 0 {
            warn!(aborted, "Deliveries aborted during shutdown");
        }

        if let Some(handle) = self.metrics_task {
            if let Err(e) = handle.await {
                error!("Metrics server task panicked: {:?}", e);
            }
        }

        info!("All tasks shut down.");
        Ok(())
    }
}

/// Builder for the main application.
///
/// This pattern allows for a clean separation of concerns between constructing
/// the application's components and running the application. It also provides
/// a convenient way to override components for testing purposes.
pub struct AppBuilder {
    config: Config,
    transport_override: Option<Arc<dyn SmsTransport>>,
    formatter_override: Option<Arc<dyn MessageFormatter>>,
    metrics_override: Option<Metrics>,
}

impl AppBuilder {
    /// Creates a new `AppBuilder` with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            transport_override: None,
            formatter_override: None,
            metrics_override: None,
        }
    }

    /// Overrides the SMS transport for testing.
    pub fn transport_override(mut self, transport: Arc<dyn SmsTransport>) -> Self {
        self.transport_override = Some(transport);
        self
    }

    /// Overrides the message formatter.
    pub fn formatter_override(mut self, formatter: Arc<dyn MessageFormatter>) -> Self {
        self.formatter_override = Some(formatter);
        self
    }

    /// Overrides the metrics system for testing.
    pub fn metrics_override(mut self, metrics: Metrics) -> Self {
        self.metrics_override = Some(metrics);
        self
    }

    /// Builds and initializes all application components, returning a runnable `App`.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = self.config;

        // =========================================================================
        // 1. Initialize Metrics
        // =========================================================================
        let (metrics, metrics_server_info) = match self.metrics_override {
            Some(m) => (m, None),
            None => {
                MetricsBuilder::new(config.metrics.clone())
                    .build(shutdown_rx.clone())
                    .await?
            }
        };
        let metrics = Arc::new(metrics);

        let (metrics_addr, metrics_task) = match metrics_server_info {
            Some((server, addr)) => {
                info!(address = %addr, "Serving metrics");
                (Some(addr), Some(tokio::spawn(server.run())))
            }
            None => (None, None),
        };

        // =========================================================================
        // 2. Transport, Formatter and Dispatcher
        // =========================================================================
        let transport: Arc<dyn SmsTransport> = match self.transport_override {
            Some(transport) => transport,
            None => Arc::new(
                TwilioClient::new(&config.provider).context("failed to build SMS client")?,
            ),
        };
        let formatter: Arc<dyn MessageFormatter> = self
            .formatter_override
            .unwrap_or_else(|| Arc::new(SmsTextFormatter));

        let delivery_tasks = TaskManager::new();
        let dispatcher = Dispatcher::new(
            transport,
            config.provider.sender.clone(),
            delivery_tasks.clone(),
            metrics.clone(),
        );

        // =========================================================================
        // 3. Webhook Listener
        // =========================================================================
        let router = server::router(AppState {
            formatter,
            dispatcher,
            metrics,
            wait_for_delivery: config.delivery.wait_for_delivery,
            max_body_bytes: config.server.max_body_bytes,
        });

        let listener = TcpListener::bind(config.server.listen_address)
            .await
            .with_context(|| {
                format!(
                    "failed to bind webhook server to {}",
                    config.server.listen_address
                )
            })?;
        let local_addr = listener.local_addr()?;

        Ok(App {
            listener,
            router,
            local_addr,
            delivery_tasks,
            shutdown_grace: Duration::from_secs(config.delivery.shutdown_grace_seconds),
            shutdown_rx,
            metrics_addr,
            metrics_task,
        })
    }
}
