//! The relay's configuration file.

use std::{collections::HashSet, fmt};

use clap::ValueEnum;
use elrelay_beacon::ClClientConfig;
use elrelay_execution::{BreakerConfig, ElClientConfig};
use elrelay_node::RelayConfig;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

pub use crate::file::load_config;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Consensus layer node polled for blocks.
    pub cl_client: ClClientConfig,
    /// Execution engines, primary first.
    pub el_clients: Vec<ElClientConfig>,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub breaker: BreakerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl Config {
    /// Checks what deserialization alone cannot.
    pub fn validate(&self) -> Result<(), Error> {
        check_http_url("cl_client", &self.cl_client.address)?;

        if self.el_clients.is_empty() {
            return Err(Error::InvalidConfig("at least one EL client is required".into()));
        }

        let mut names = HashSet::new();
        for el in &self.el_clients {
            if !names.insert(el.name.as_str()) {
                return Err(Error::InvalidConfig(format!("duplicate EL client name {:?}", el.name)));
            }
            check_http_url(&el.name, &el.address)?;
            el.resolve_jwt_secret().map_err(|e| {
                Error::InvalidConfig(format!("{}: invalid jwt secret: {e}", el.name))
            })?;
        }

        if self.relay.channel_capacity == 0 {
            return Err(Error::InvalidConfig("relay.channel_capacity must be positive".into()));
        }
        if self.relay.poll_interval_secs == 0 || self.relay.retry_interval_secs == 0 {
            return Err(Error::InvalidConfig("relay intervals must be positive".into()));
        }
        if self.breaker.call_timeout_secs == 0 {
            return Err(Error::InvalidConfig("breaker.call_timeout_secs must be positive".into()));
        }

        Ok(())
    }
}

fn check_http_url(name: &str, url: &Url) -> Result<(), Error> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(Error::InvalidConfig(format!("{name}: unsupported URL scheme {scheme:?}"))),
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: LogLevel,
    pub log_format: LogFormat,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plaintext,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "flavor", rename_all = "snake_case")]
pub enum RuntimeConfig {
    SingleThreaded,
    /// Zero worker threads means one per core.
    MultiThreaded {
        #[serde(default)]
        worker_threads: usize,
    },
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::MultiThreaded { worker_threads: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(name: &str, address: &str) -> ElClientConfig {
        ElClientConfig {
            name: name.to_string(),
            address: address.parse().unwrap(),
            headers: Default::default(),
            jwt_secret: String::new(),
            jwt_secret_file: None,
        }
    }

    fn config() -> Config {
        Config {
            cl_client: ClClientConfig {
                name: "lighthouse".into(),
                address: "http://127.0.0.1:5052".parse().unwrap(),
                headers: Default::default(),
            },
            el_clients: vec![el("geth", "http://127.0.0.1:8551")],
            relay: RelayConfig::default(),
            breaker: BreakerConfig::default(),
            logging: LoggingConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }

    #[test]
    fn valid_config_passes() {
        config().validate().unwrap();
    }

    #[test]
    fn requires_an_el_client() {
        let mut config = config();
        config.el_clients.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at least one EL client"));
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut config = config();
        config.el_clients.push(el("geth", "http://127.0.0.1:9551"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_http_addresses() {
        let mut config = config();
        config.el_clients.push(el("reth", "ws://127.0.0.1:8546"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("reth"));
    }

    #[test]
    fn rejects_short_jwt_secret() {
        let mut config = config();
        config.el_clients[0].jwt_secret = "0xdeadbeef".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("geth: invalid jwt secret"));
    }

    #[test]
    fn accepts_prefixed_and_padded_jwt_secret() {
        let mut config = config();
        config.el_clients[0].jwt_secret = format!("  0x{}\n", "ab".repeat(32));
        config.validate().unwrap();
    }

    #[test]
    fn rejects_zero_capacity() {
        let mut config = config();
        config.relay.channel_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn log_level_renders_as_directive() {
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }
}
