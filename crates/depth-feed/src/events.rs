//! Events emitted by a feed session

use depth_types::{BookData, DepthError, SystemStatus};
use std::time::Duration;

/// Reason a connection went down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Server closed the connection
    ServerClosed,
    /// Network error while reading
    NetworkError(String),
    /// A frame could not be written
    SendFailed(String),
    /// Client requested shutdown
    Shutdown,
}

/// Book message for the subscribed symbol
#[derive(Debug, Clone, PartialEq)]
pub enum BookSignal {
    /// Replace the whole book
    Snapshot(BookData),
    /// Apply a delta
    Update(BookData),
}

impl BookSignal {
    /// Levels carried by the signal
    pub fn data(&self) -> &BookData {
        match self {
            Self::Snapshot(data) | Self::Update(data) => data,
        }
    }

    /// Check if this is a snapshot
    pub fn is_snapshot(&self) -> bool {
        matches!(self, Self::Snapshot(_))
    }
}

/// Everything a session reports to its owner, in wire order
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// First connection attempt started
    Connecting,
    /// Connection open and subscribe request written
    Opened,
    /// Book data for the subscribed symbol
    Signal(BookSignal),
    /// Exchange reported its trading status
    SystemStatus(SystemStatus),
    /// Subscribe acknowledged by the exchange
    Subscribed {
        /// Acknowledged symbol
        symbol: Option<String>,
        /// Acknowledged depth
        depth: Option<u32>,
    },
    /// Connection lost
    Disconnected {
        /// Why
        reason: DisconnectReason,
    },
    /// Retry scheduled
    Reconnecting {
        /// Attempt number (1-indexed)
        attempt: u32,
        /// Delay before the attempt
        delay: Duration,
    },
    /// Non-fatal failure; connection-level errors are also followed by a retry
    Error(DepthError),
    /// Session gave up and ended
    Failed(DepthError),
    /// Session ended after a close request
    Closed,
}

impl From<BookSignal> for FeedEvent {
    fn from(signal: BookSignal) -> Self {
        Self::Signal(signal)
    }
}

impl From<DepthError> for FeedEvent {
    fn from(error: DepthError) -> Self {
        Self::Error(error)
    }
}
