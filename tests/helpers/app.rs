//! Test helpers for running the full application instance.

use alertrelay::{
    app::AppBuilder, config::Config, formatting::MessageFormatter, internal_metrics::Metrics,
    notification::test_utils::FakeSmsTransport,
};
use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::{sync::watch, task::JoinHandle, time::timeout};

/// Represents a running instance of the application for testing purposes.
#[derive(Debug)]
pub struct TestApp {
    pub addr: SocketAddr,
    pub metrics_addr: Option<SocketAddr>,
    pub transport: FakeSmsTransport,
    shutdown_tx: watch::Sender<bool>,
    app_handle: JoinHandle<Result<()>>,
}

impl TestApp {
    /// Posts a webhook body to `/alert/send`, with `recipients` as the raw query value.
    pub async fn post_alert(&self, recipients: Option<&str>, body: &str) -> reqwest::Response {
        let url = match recipients {
            Some(list) => format!("http://{}/alert/send?recipients={}", self.addr, list),
            None => format!("http://{}/alert/send", self.addr),
        };
        reqwest::Client::new()
            .post(url)
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect("webhook request failed")
    }

    /// Waits until the fake transport has seen `count` requests.
    pub async fn wait_for_sent(&self, count: usize, within: Duration) -> Result<()> {
        timeout(within, async {
            while self.transport.sent_count() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .map_err(|_| {
            anyhow::anyhow!(
                "expected {} requests, saw {}",
                count,
                self.transport.sent_count()
            )
        })
    }

    /// Shuts down the application and waits for it to terminate.
    /// Fails if the application does not shut down within the specified timeout.
    pub async fn shutdown(self, timeout_duration: Duration) -> Result<()> {
        self.shutdown_tx
            .send(true)
            .expect("Failed to send shutdown signal");

        match timeout(timeout_duration, self.app_handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(anyhow::anyhow!("App failed to shut down within the timeout")),
        }
    }
}

/// A builder for creating `TestApp` instances with specific configurations.
pub struct TestAppBuilder {
    pub config: Config,
    transport: FakeSmsTransport,
    formatter: Option<Arc<dyn MessageFormatter>>,
    real_metrics: bool,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        let mut config = Config::default();
        config.server.listen_address = "127.0.0.1:0".parse().unwrap();
        config.provider.account_sid = "AC123".to_string();
        config.provider.auth_token = "secret".to_string();
        config.provider.sender = "+15005550006".to_string();
        config.delivery.shutdown_grace_seconds = 2;

        Self {
            config,
            transport: FakeSmsTransport::new(),
            formatter: None,
            real_metrics: false,
        }
    }

    pub fn with_config_modifier(mut self, modifier: impl FnOnce(&mut Config)) -> Self {
        modifier(&mut self.config);
        self
    }

    pub fn with_transport(mut self, transport: FakeSmsTransport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn MessageFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Installs the Prometheus recorder and serves `/metrics` on an ephemeral port.
    pub fn with_metrics(mut self) -> Self {
        self.config.metrics.enabled = true;
        self.config.metrics.listen_address = "127.0.0.1:0".parse().unwrap();
        self.real_metrics = true;
        self
    }

    /// Builds the application and runs it in the background.
    pub async fn start(self) -> Result<TestApp> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut builder = AppBuilder::new(self.config)
            .transport_override(Arc::new(self.transport.clone()));
        if let Some(formatter) = self.formatter {
            builder = builder.formatter_override(formatter);
        }
        if !self.real_metrics {
            builder = builder.metrics_override(Metrics::disabled());
        }

        let app = builder.build(shutdown_rx).await?;
        let addr = app.local_addr();
        let metrics_addr = app.metrics_addr();
        let app_handle = tokio::spawn(app.run());

        Ok(TestApp {
            addr,
            metrics_addr,
            transport: self.transport,
            shutdown_tx,
            app_handle,
        })
    }
}
