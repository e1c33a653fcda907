//! Error types for the depth-view engine

use std::time::Duration;
use thiserror::Error;

/// Main error type surfaced by the engine
///
/// Errors travel on event streams, so every variant carries owned strings
/// and the type is `Clone`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DepthError {
    // === Protocol Errors ===
    /// Failed to parse an inbound message
    #[error("Invalid JSON: {message}")]
    Protocol { message: String, raw: Option<String> },

    // === Subscription Errors ===
    /// No symbol could be resolved for the subscription
    #[error("Cannot subscribe: {reason}")]
    Subscription { reason: String },

    /// Subscription was rejected by the server
    #[error("Subscription rejected for {channel}: {reason}")]
    SubscriptionRejected { channel: String, reason: String },

    // === Connection Errors ===
    /// Failed to establish or keep the WebSocket connection
    #[error("Connection to {url} failed: {reason}")]
    Connection { url: String, reason: String },

    /// Reconnection attempts exhausted
    #[error("Gave up on {url} after {attempts} attempts")]
    ReconnectExhausted { url: String, attempts: u32 },

    /// Connection attempt timed out
    #[error("Connection timeout after {timeout:?} to {url}")]
    ConnectionTimeout { url: String, timeout: Duration },

    // === Internal Errors ===
    /// Configuration rejected
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Engine was destroyed
    #[error("Engine destroyed")]
    Destroyed,
}

impl DepthError {
    /// Create a protocol error from a parse failure
    pub fn protocol(message: impl Into<String>, raw: Option<&str>) -> Self {
        Self::Protocol {
            message: message.into(),
            raw: raw.map(str::to_string),
        }
    }

    /// Create a subscription error
    pub fn subscription(reason: impl Into<String>) -> Self {
        Self::Subscription {
            reason: reason.into(),
        }
    }

    /// Create a connection error
    pub fn connection(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Connection {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the transport may still recover from this error on its own
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionTimeout { .. } | Self::Protocol { .. }
        )
    }

    /// Returns true if this error is latched into the connection status
    ///
    /// Protocol errors are reported but leave the connection running.
    pub fn is_connection_level(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ReconnectExhausted { .. }
                | Self::SubscriptionRejected { .. }
        )
    }
}

/// Result type alias for engine operations
pub type DepthResult<T> = Result<T, DepthError>;
