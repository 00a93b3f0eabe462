//! Integration tests for graceful shutdown.

use alertrelay::notification::test_utils::FakeSmsTransport;
use anyhow::Result;
use std::time::{Duration, Instant};

mod helpers;
use helpers::{app::TestAppBuilder, FIRING_BATCH};

/// Runs the entire application and asserts that it terminates within a strict
/// time limit after a shutdown signal is sent.
#[tokio::test]
async fn test_app_shuts_down_within_timeout() -> Result<()> {
    let app = TestAppBuilder::new().start().await?;

    tokio::time::sleep(Duration::from_millis(100)).await;

    app.shutdown(Duration::from_secs(5)).await
}

#[tokio::test]
async fn test_shutdown_drains_in_flight_deliveries() -> Result<()> {
    let transport = FakeSmsTransport::new();
    transport.delay("+111", Duration::from_millis(500));
    let app = TestAppBuilder::new()
        .with_transport(transport.clone())
        .start()
        .await?;

    let response = app.post_alert(Some("111,222"), FIRING_BATCH).await;
    assert_eq!(response.status(), 200);
    drop(response);

    app.shutdown(Duration::from_secs(5)).await?;

    assert_eq!(transport.completed_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_shutdown_aborts_deliveries_after_grace_period() -> Result<()> {
    let transport = FakeSmsTransport::new();
    transport.delay("+111", Duration::from_secs(30));
    let app = TestAppBuilder::new()
        .with_transport(transport.clone())
        .with_config_modifier(|config| config.delivery.shutdown_grace_seconds = 0)
        .start()
        .await?;

    let response = app.post_alert(Some("111"), FIRING_BATCH).await;
    assert_eq!(response.status(), 200);
    drop(response);
    app.wait_for_sent(1, Duration::from_secs(5)).await?;

    let start = Instant::now();
    app.shutdown(Duration::from_secs(5)).await?;

    assert!(start.elapsed() < Duration::from_secs(3));
    assert_eq!(transport.completed_count(), 0);
    Ok(())
}
