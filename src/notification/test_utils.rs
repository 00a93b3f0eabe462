use crate::core::{OutboundSms, SmsTransport, TransportResponse};
use crate::errors::TransportError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Reply {
    Respond(u16, String),
    Fail(String),
}

/// Fake SMS transport for testing
///
/// Replies are scripted per destination address (`To`); destinations without a
/// script get a `201 queued` reply. Every request is recorded.
#[derive(Debug, Clone, Default)]
pub struct FakeSmsTransport {
    replies: Arc<Mutex<HashMap<String, Reply>>>,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
    sent: Arc<Mutex<Vec<OutboundSms>>>,
    completed: Arc<AtomicUsize>,
}

impl FakeSmsTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script an HTTP reply for a destination address
    pub fn respond(&self, to: &str, status: u16, body: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(to.to_string(), Reply::Respond(status, body.to_string()));
    }

    /// Script a transport-level failure for a destination address
    pub fn fail(&self, to: &str, error: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(to.to_string(), Reply::Fail(error.to_string()));
    }

    /// Delay the reply for a destination address
    pub fn delay(&self, to: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(to.to_string(), delay);
    }

    /// All requests received so far, in arrival order
    pub fn sent(&self) -> Vec<OutboundSms> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Requests that have received their reply, including scripted failures
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SmsTransport for FakeSmsTransport {
    async fn send(&self, sms: &OutboundSms) -> Result<TransportResponse, TransportError> {
        self.sent.lock().unwrap().push(sms.clone());

        let delay = self.delays.lock().unwrap().get(&sms.to).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.replies.lock().unwrap().get(&sms.to).cloned();
        self.completed.fetch_add(1, Ordering::SeqCst);
        match reply {
            Some(Reply::Respond(status, body)) => Ok(TransportResponse { status, body }),
            Some(Reply::Fail(error)) => Err(TransportError::Other(error)),
            None => Ok(TransportResponse {
                status: 201,
                body: format!(
                    r#"{{"status":"queued","sid":"SM{}","body":{}}}"#,
                    sms.to.trim_start_matches('+'),
                    serde_json::Value::from(sms.body.clone())
                ),
            }),
        }
    }
}
