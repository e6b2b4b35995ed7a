use std::time::Duration;
use thiserror::Error;

/// Under the downstream limit of one message per second, with margin.
const DEFAULT_DRIP_INTERVAL_MS: u64 = 1100;
const DEFAULT_DELIVERY_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },
}

/// Runtime configuration, read once from the environment at startup.
///
/// `webhook_url` and `auth_token` are deliberately optional: a missing
/// webhook URL turns every delivery attempt into a failure (the record is
/// requeued and retried), and a missing auth token makes the ingest endpoint
/// answer with a server error. Neither prevents the process from starting.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub webhook_url: Option<String>,
    pub auth_token: Option<String>,
    pub drip_interval: Duration,
    pub delivery_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: parse_var("PORT", DEFAULT_PORT)?,
            webhook_url: read_var("WEBHOOK_URL"),
            auth_token: read_var("AUTH_TOKEN"),
            drip_interval: Duration::from_millis(parse_var(
                "DRIP_INTERVAL_MS",
                DEFAULT_DRIP_INTERVAL_MS,
            )?),
            delivery_timeout: Duration::from_millis(parse_var(
                "DELIVERY_TIMEOUT_MS",
                DEFAULT_DELIVERY_TIMEOUT_MS,
            )?),
        })
    }
}

fn read_var(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match read_var(var) {
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            value,
        }),
        None => Ok(default),
    }
}
