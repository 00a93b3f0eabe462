//! A client for sending SMS through the Twilio Messages API.

use crate::config::ProviderConfig;
use crate::core::{OutboundSms, SmsTransport, TransportResponse};
use crate::errors::TransportError;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use std::time::Duration;
use tracing::{debug, instrument};

/// Posts one form-encoded message per call to the provider's Messages endpoint.
///
/// The inner `reqwest::Client` pools connections and is shared by every
/// delivery task.
#[derive(Debug, Clone)]
pub struct TwilioClient {
    client: reqwest::Client,
    messages_url: String,
    account_sid: String,
    auth_token: String,
}

impl TwilioClient {
    /// Creates a new `TwilioClient` from the provider settings.
    pub fn new(config: &ProviderConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            messages_url: config.messages_url(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
        })
    }
}

#[async_trait]
impl SmsTransport for TwilioClient {
    #[instrument(skip(self, sms), fields(to = %sms.to))]
    async fn send(&self, sms: &OutboundSms) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(&self.messages_url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .header(ACCEPT, "application/json")
            .form(sms)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, "Provider responded");

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod twilio_client_tests {
    use super::*;
    use wiremock::matchers::{basic_auth, body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_config(base_url: &str) -> ProviderConfig {
        ProviderConfig {
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            sender: "+15005550006".to_string(),
            api_base_url: base_url.to_string(),
            timeout_ms: 2_000,
        }
    }

    fn sms() -> OutboundSms {
        OutboundSms {
            to: "+4915112345678".to_string(),
            from: "+15005550006".to_string(),
            body: "Status: firing\nA: B\n".to_string(),
        }
    }

    #[tokio::test]
    async fn test_twilio_client_posts_form_with_basic_auth() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .and(basic_auth("AC123", "secret"))
            .and(header("accept", "application/json"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string(
                "To=%2B4915112345678&From=%2B15005550006&Body=Status%3A+firing%0AA%3A+B%0A",
            ))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_string(r#"{"status":"queued","sid":"SM123","body":"Status: firing"}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = TwilioClient::new(&provider_config(&server.uri())).unwrap();

        // Act
        let response = client.send(&sms()).await.unwrap();

        // Assert
        assert_eq!(response.status, 201);
        assert!(response.body.contains("SM123"));
    }

    #[tokio::test]
    async fn test_twilio_client_returns_error_statuses_as_responses() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"status":400,"code":21211,"message":"invalid number"}"#),
            )
            .mount(&server)
            .await;

        let client = TwilioClient::new(&provider_config(&server.uri())).unwrap();

        // Act
        let response = client.send(&sms()).await.unwrap();

        // Assert
        assert_eq!(response.status, 400);
        assert!(response.body.contains("21211"));
    }

    #[tokio::test]
    async fn test_twilio_client_handles_timeout() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let mut config = provider_config(&server.uri());
        config.timeout_ms = 200;
        let client = TwilioClient::new(&config).unwrap();

        // Act
        let result = client.send(&sms()).await;

        // Assert
        assert!(
            matches!(result, Err(TransportError::Timeout(_))),
            "expected a timeout, got {:?}",
            result
        );
    }

    #[tokio::test]
    async fn test_twilio_client_reports_connection_failure() {
        // Nothing listens on port 9 of localhost in the test environment.
        let client = TwilioClient::new(&provider_config("http://127.0.0.1:9")).unwrap();

        let result = client.send(&sms()).await;

        assert!(result.is_err());
    }
}
