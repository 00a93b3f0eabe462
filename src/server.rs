//! # Webhook Server
//!
//! The inbound HTTP surface: `POST /alert/send?recipients=...` accepts an
//! Alertmanager webhook body and hands the rendered message to the
//! dispatcher. The response only says whether the batch was accepted for
//! delivery, never whether delivery succeeded.

use crate::core::AlertBatch;
use crate::errors::RelayError;
use crate::formatting::MessageFormatter;
use crate::internal_metrics::Metrics;
use crate::notification::dispatcher::Dispatcher;
use crate::{payload, recipients};
use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Shared, read-only state of the webhook handlers.
#[derive(Clone)]
pub struct AppState {
    pub formatter: Arc<dyn MessageFormatter>,
    pub dispatcher: Dispatcher,
    pub metrics: Arc<Metrics>,
    /// Hold the response until every attempt has finished.
    pub wait_for_delivery: bool,
    pub max_body_bytes: usize,
}

/// Builds the webhook router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/alert/send", post(send_alert))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

#[instrument(skip_all)]
async fn send_alert(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
    body: Body,
) -> Result<StatusCode, RelayError> {
    state.metrics.alert_batches_received_total.increment(1);
    relay(&state, &params, body).await.map_err(|e| {
        state.metrics.increment_batch_rejected(e.reason());
        e
    })?;
    Ok(StatusCode::OK)
}

async fn relay(
    state: &AppState,
    params: &[(String, String)],
    body: Body,
) -> Result<(), RelayError> {
    // No recipients means nothing to read the body for.
    let recipients = recipients::resolve(first_recipients(params))?;
    let body = read_body(body, state.max_body_bytes).await?;
    let batch: AlertBatch = payload::decode_batch(&body)?;
    let message = state.formatter.render(&batch)?;

    info!(
        status = %batch.status,
        alerts = batch.alerts.len(),
        recipients = recipients.len(),
        "Relaying alert batch"
    );

    if state.wait_for_delivery {
        state.dispatcher.dispatch_and_wait(&message, recipients).await;
    } else {
        state.dispatcher.dispatch(message, recipients);
    }
    Ok(())
}

/// Only the first `recipients` parameter counts.
fn first_recipients(params: &[(String, String)]) -> Option<&str> {
    params
        .iter()
        .find(|(key, _)| key == "recipients")
        .map(|(_, value)| value.as_str())
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, RelayError> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(RelayError::PayloadTooLarge { limit }),
        Err(e) => Err(RelayError::Body(e.to_string())),
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match &self {
            RelayError::MissingParameter | RelayError::Body(_) | RelayError::Decode(_) => {
                StatusCode::BAD_REQUEST
            }
            RelayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self, "Failed to relay alert batch");
        } else {
            warn!(error = %self, "Rejected alert batch");
        }
        (status, self.to_string()).into_response()
    }
}
