//! The dispatcher fans a rendered message out to every recipient.
//!
//! Each recipient gets an independent delivery attempt: one provider request,
//! one classified outcome, one log record. Attempts share only read-only data
//! (the message, the sender identity) and the transport's connection pool, so a
//! slow or failing recipient never holds up the others.

use crate::core::{OutboundSms, Recipient, RenderedMessage, SmsTransport};
use crate::internal_metrics::Metrics;
use crate::notification::outcome::DeliveryOutcome;
use crate::task_manager::TaskManager;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, Instrument};

/// Sends one message to many recipients concurrently.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn SmsTransport>,
    sender: Arc<str>,
    tasks: TaskManager,
    metrics: Arc<Metrics>,
}

impl Dispatcher {
    /// Creates a new `Dispatcher`.
    ///
    /// # Arguments
    /// * `transport` - The client used for every provider request.
    /// * `sender` - The identity placed in the `From` field.
    /// * `tasks` - Tracks the detached attempts started by `dispatch`.
    /// * `metrics` - Receives one record per attempt.
    pub fn new(
        transport: Arc<dyn SmsTransport>,
        sender: impl Into<Arc<str>>,
        tasks: TaskManager,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            transport,
            sender: sender.into(),
            tasks,
            metrics,
        }
    }

    /// Starts one detached delivery task per recipient and returns immediately.
    ///
    /// Outcomes are only observable through the logs and metrics. The tasks
    /// stay tracked by the `TaskManager` so shutdown can drain them.
    pub fn dispatch(&self, message: RenderedMessage, recipients: Vec<Recipient>) {
        debug!(recipients = recipients.len(), "Dispatching detached deliveries");
        for recipient in recipients {
            let this = self.clone();
            let message = message.clone();
            self.tasks.spawn(
                "sms_delivery",
                async move {
                    this.deliver(&message, &recipient).await;
                }
                .in_current_span(),
            );
        }
    }

    /// Runs one delivery attempt per recipient concurrently and waits for all
    /// of them. Outcomes are returned in recipient order.
    pub async fn dispatch_and_wait(
        &self,
        message: &RenderedMessage,
        recipients: Vec<Recipient>,
    ) -> Vec<(Recipient, DeliveryOutcome)> {
        debug!(recipients = recipients.len(), "Dispatching deliveries");
        join_all(recipients.into_iter().map(|recipient| async move {
            let outcome = self.deliver(message, &recipient).await;
            (recipient, outcome)
        }))
        .await
    }

    /// A single attempt: build the request, send it once, classify and log.
    async fn deliver(&self, message: &RenderedMessage, recipient: &Recipient) -> DeliveryOutcome {
        let sms = OutboundSms {
            to: recipient.to_address(),
            from: self.sender.to_string(),
            body: message.as_str().to_string(),
        };

        let start = Instant::now();
        let result = self.transport.send(&sms).await;
        let outcome = DeliveryOutcome::classify(result);

        self.metrics.record_delivery(outcome.kind(), start.elapsed());
        log_outcome(recipient, &outcome);
        outcome
    }
}

/// Emits the single log record of an attempt. Only `Delivered` is logged at INFO.
fn log_outcome(recipient: &Recipient, outcome: &DeliveryOutcome) {
    match outcome {
        DeliveryOutcome::Delivered {
            http_status,
            provider_status,
            message_id,
            body,
        } => info!(
            severity = "Info",
            recipient = %recipient,
            http_status,
            sms_status = %provider_status,
            sms_id = %message_id,
            sms_body = %body,
            "SMS delivered"
        ),
        DeliveryOutcome::Rejected {
            http_status,
            provider_status,
            provider_code,
            provider_message,
        } => error!(
            severity = "Error",
            recipient = %recipient,
            http_status,
            sms_status = provider_status.as_deref().unwrap_or(""),
            sms_code = provider_code,
            sms_message = %provider_message,
            "SMS rejected by provider"
        ),
        DeliveryOutcome::TransportFailed { cause } => error!(
            severity = "Error",
            recipient = %recipient,
            cause = %cause,
            "SMS transport failed"
        ),
        DeliveryOutcome::DecodeFailed { http_status, cause } => error!(
            severity = "Error",
            recipient = %recipient,
            http_status,
            cause = %cause,
            "SMS provider response could not be decoded"
        ),
    }
}
