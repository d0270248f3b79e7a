//! Error types for broker connections.

use thiserror::Error;

/// Result alias for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Errors that can occur while talking to a broker.
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Broker not connected")]
    NotConnected,

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Correlation ID mismatch: expected {expected}, got {actual}")]
    CorrelationMismatch { expected: i32, actual: i32 },

    #[error("Config error: {0}")]
    Config(String),
}

impl BrokerError {
    /// True when the connection that produced this error can no longer be
    /// trusted and must be closed and reopened.
    pub fn requires_reconnect(&self) -> bool {
        matches!(
            self,
            BrokerError::Io(_)
                | BrokerError::Connection(_)
                | BrokerError::Decode(_)
                | BrokerError::CorrelationMismatch { .. }
        )
    }

    /// True for decode failures, including correlation mismatches.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            BrokerError::Decode(_) | BrokerError::CorrelationMismatch { .. }
        )
    }
}
