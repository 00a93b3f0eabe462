//! Configuration management for alertrelay
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to load configuration from an `alertrelay.toml` file and merge it
//! with environment variables and command-line arguments.

use crate::cli::Cli;
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

/// The file read when no `--config` flag is given. A missing file is not an error.
pub const DEFAULT_CONFIG_FILE: &str = "alertrelay.toml";

/// Provider settings taken verbatim from the environment.
const CREDENTIAL_KEYS: [&str; 3] = [
    "provider.account_sid",
    "provider.auth_token",
    "provider.sender",
];

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Configuration for the inbound webhook server.
    pub server: ServerConfig,
    /// Credentials and endpoint of the SMS provider.
    pub provider: ProviderConfig,
    /// Configuration for the delivery fan-out.
    pub delivery: DeliveryConfig,
    /// Configuration for the Prometheus metrics endpoint.
    pub metrics: MetricsConfig,
}

/// Configuration for the inbound webhook server.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// The address the webhook listener binds to.
    pub listen_address: SocketAddr,
    /// Largest accepted webhook body. Larger bodies are answered with 413.
    pub max_body_bytes: usize,
}

/// Credentials and endpoint of the SMS provider.
#[derive(Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// The provider account identifier. Also `TWILIO_ACCOUNT_SID`.
    pub account_sid: String,
    /// The provider secret token. Also `TWILIO_AUTH_TOKEN`.
    pub auth_token: String,
    /// The sender identity placed in the `From` field. Also `TWILIO_SENDER`.
    pub sender: String,
    /// Base URL of the provider API, without a trailing slash.
    pub api_base_url: String,
    /// Timeout for a single provider request in milliseconds.
    pub timeout_ms: u64,
}

impl ProviderConfig {
    /// The endpoint every message is posted to.
    pub fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base_url.trim_end_matches('/'),
            self.account_sid
        )
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("sender", &self.sender)
            .field("api_base_url", &self.api_base_url)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Configuration for the delivery fan-out.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DeliveryConfig {
    /// Hold the webhook response until every delivery attempt has finished.
    /// When false, the response is sent as soon as the attempts are started.
    pub wait_for_delivery: bool,
    /// How long shutdown waits for in-flight deliveries before aborting them.
    pub shutdown_grace_seconds: u64,
}

/// Configuration for the Prometheus metrics endpoint.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MetricsConfig {
    /// Whether the metrics endpoint is served.
    pub enabled: bool,
    /// The address the metrics listener binds to.
    pub listen_address: SocketAddr,
}

impl Config {
    /// Loads the application configuration by layering sources: defaults, the
    /// TOML file, `TWILIO_*` variables, `ALERTRELAY_*` variables and finally
    /// command-line arguments.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path));
        let figment = merge_credentials(figment, twilio_env());
        let figment = merge_credentials(figment, relay_env())
            // e.g. ALERTRELAY_DELIVERY__WAIT_FOR_DELIVERY=true
            .merge(relay_env().ignore(&CREDENTIAL_KEYS));

        let config: Config = figment.merge(cli.clone()).extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Checks the settings the relay cannot start without.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("account_sid", &self.provider.account_sid),
            ("auth_token", &self.provider.auth_token),
            ("sender", &self.provider.sender),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            bail!(
                "missing provider settings: {}. Set TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN and TWILIO_SENDER environment variables",
                missing.join(", ")
            );
        }
        if self.provider.api_base_url.is_empty() {
            bail!("provider.api_base_url must not be empty");
        }
        Ok(())
    }
}

fn relay_env() -> Env {
    Env::prefixed("ALERTRELAY_").split("__")
}

/// Merges the credential variables of `env` as verbatim strings. `Env` parses
/// values, which would turn `+15005550006` into the number 15005550006.
fn merge_credentials(figment: Figment, env: Env) -> Figment {
    let env = env.only(&CREDENTIAL_KEYS);
    env.iter().fold(figment, |figment, (key, value)| {
        figment.merge(Serialized::default(key.as_str(), value))
    })
}

/// Maps the provider's conventional environment variables onto `provider.*`.
fn twilio_env() -> Env {
    Env::raw()
        .only(&["TWILIO_ACCOUNT_SID", "TWILIO_AUTH_TOKEN", "TWILIO_SENDER"])
        .map(|key| {
            let field = key
                .as_str()
                .to_ascii_lowercase()
                .trim_start_matches("twilio_")
                .to_string();
            format!("provider.{field}").into()
        })
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerConfig {
                listen_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
                max_body_bytes: 16 * 1024 * 1024,
            },
            provider: ProviderConfig {
                account_sid: String::new(),
                auth_token: String::new(),
                sender: String::new(),
                api_base_url: "https://api.twilio.com".to_string(),
                timeout_ms: 10_000,
            },
            delivery: DeliveryConfig {
                wait_for_delivery: false,
                shutdown_grace_seconds: 10,
            },
            metrics: MetricsConfig {
                enabled: false,
                listen_address: SocketAddr::from(([127, 0, 0, 1], 9090)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Config {
        let mut config = Config::default();
        config.provider.account_sid = "AC123".to_string();
        config.provider.auth_token = "secret".to_string();
        config.provider.sender = "+15005550006".to_string();
        config
    }

    #[test]
    fn test_validate_accepts_complete_provider() {
        assert!(configured().validate().is_ok());
    }

    #[test]
    fn test_validate_names_missing_credentials() {
        let mut config = configured();
        config.provider.auth_token = String::new();
        config.provider.sender = "  ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.starts_with("missing provider settings: auth_token, sender."));
    }

    #[test]
    fn test_messages_url() {
        let mut config = configured();
        assert_eq!(
            config.provider.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
        config.provider.api_base_url = "http://127.0.0.1:4000/".to_string();
        assert_eq!(
            config.provider.messages_url(),
            "http://127.0.0.1:4000/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn test_debug_redacts_auth_token() {
        let rendered = format!("{:?}", configured());
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
