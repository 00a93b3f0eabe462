//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. These arguments are parsed at startup and then merged with
//! the configuration from the `alertrelay.toml` file and environment variables.

use clap::Parser;
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Relays Alertmanager webhooks to SMS recipients.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address the webhook listener binds to.
    #[arg(long, value_name = "ADDR")]
    pub listen_address: Option<SocketAddr>,

    /// Logging level (overridden by RUST_LOG).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Hold webhook responses until every SMS attempt has finished.
    #[arg(long)]
    pub wait_for_delivery: bool,

    /// Serve Prometheus metrics on the given address.
    #[arg(long, value_name = "ADDR")]
    pub metrics_address: Option<SocketAddr>,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(addr) = self.listen_address {
            dict.insert(
                "server".into(),
                nested("listen_address", Value::from(addr.to_string())),
            );
        }

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        // A bare flag can only switch waiting on; leave the file's value alone otherwise.
        if self.wait_for_delivery {
            dict.insert(
                "delivery".into(),
                nested("wait_for_delivery", Value::from(true)),
            );
        }

        if let Some(addr) = self.metrics_address {
            let mut metrics = Dict::new();
            metrics.insert("enabled".into(), Value::from(true));
            metrics.insert("listen_address".into(), Value::from(addr.to_string()));
            dict.insert("metrics".into(), Value::from(metrics));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}

fn nested(key: &str, value: Value) -> Value {
    let mut dict = Dict::new();
    dict.insert(key.into(), value);
    Value::from(dict)
}
