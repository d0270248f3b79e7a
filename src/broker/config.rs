//! Connection configuration.

use crate::error::{BrokerError, Result};
use crate::protocol::DEFAULT_MAX_FRAME_LEN;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-broker connection settings. `None` timeouts wait forever.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub dial_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    /// Largest response frame accepted, in bytes.
    pub max_response_size: usize,
    pub tcp_nodelay: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            dial_timeout: Some(DEFAULT_TIMEOUT),
            read_timeout: Some(DEFAULT_TIMEOUT),
            write_timeout: Some(DEFAULT_TIMEOUT),
            max_response_size: DEFAULT_MAX_FRAME_LEN,
            tcp_nodelay: true,
        }
    }
}

impl BrokerConfig {
    /// Defaults overridden by `BROKERLINK_DIAL_TIMEOUT_MS`,
    /// `BROKERLINK_READ_TIMEOUT_MS`, `BROKERLINK_WRITE_TIMEOUT_MS`
    /// (0 disables the timeout), `BROKERLINK_MAX_RESPONSE_SIZE` and
    /// `BROKERLINK_TCP_NODELAY`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = lookup("BROKERLINK_DIAL_TIMEOUT_MS") {
            config.dial_timeout = parse_timeout("BROKERLINK_DIAL_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("BROKERLINK_READ_TIMEOUT_MS") {
            config.read_timeout = parse_timeout("BROKERLINK_READ_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("BROKERLINK_WRITE_TIMEOUT_MS") {
            config.write_timeout = parse_timeout("BROKERLINK_WRITE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("BROKERLINK_MAX_RESPONSE_SIZE") {
            config.max_response_size = v.trim().parse().map_err(|_| {
                BrokerError::Config(format!("BROKERLINK_MAX_RESPONSE_SIZE: invalid size {:?}", v))
            })?;
        }
        if let Some(v) = lookup("BROKERLINK_TCP_NODELAY") {
            config.tcp_nodelay = match v.trim() {
                "1" | "true" => true,
                "0" | "false" => false,
                other => {
                    return Err(BrokerError::Config(format!(
                        "BROKERLINK_TCP_NODELAY: expected true/false, got {:?}",
                        other
                    )))
                }
            };
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_response_size < crate::protocol::CORRELATION_ID_BYTES {
            return Err(BrokerError::Config(format!(
                "max_response_size {} cannot hold a correlation id",
                self.max_response_size
            )));
        }
        if self.max_response_size > i32::MAX as usize {
            return Err(BrokerError::Config(format!(
                "max_response_size {} exceeds the int32 frame length",
                self.max_response_size
            )));
        }
        for (name, timeout) in [
            ("dial_timeout", self.dial_timeout),
            ("read_timeout", self.read_timeout),
            ("write_timeout", self.write_timeout),
        ] {
            if timeout == Some(Duration::ZERO) {
                return Err(BrokerError::Config(format!(
                    "{} must be positive or unset",
                    name
                )));
            }
        }
        Ok(())
    }
}

fn parse_timeout(key: &str, raw: &str) -> Result<Option<Duration>> {
    let ms: u64 = raw
        .trim()
        .parse()
        .map_err(|_| BrokerError::Config(format!("{}: invalid milliseconds {:?}", key, raw)))?;
    Ok((ms > 0).then(|| Duration::from_millis(ms)))
}
