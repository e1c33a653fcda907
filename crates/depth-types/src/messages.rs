//! Request and response message types for the Kraken WebSocket API v2 book feed

use crate::{Channel, Depth, Level, SystemStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Request Types
// ============================================================================

/// Request method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Start streaming a channel
    Subscribe,
    /// Stop streaming a channel
    Unsubscribe,
}

/// Subscribe/unsubscribe request message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookRequest {
    /// "subscribe" or "unsubscribe"
    pub method: Method,
    /// Subscription parameters
    pub params: BookParams,
    /// Optional request ID (echoed in response)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub req_id: Option<u64>,
}

impl BookRequest {
    /// Create a subscribe request
    pub fn subscribe(params: BookParams) -> Self {
        Self {
            method: Method::Subscribe,
            params,
            req_id: None,
        }
    }

    /// Create an unsubscribe request
    pub fn unsubscribe(params: BookParams) -> Self {
        Self {
            method: Method::Unsubscribe,
            params,
            req_id: None,
        }
    }

    /// Add a request ID
    pub fn with_req_id(mut self, id: u64) -> Self {
        self.req_id = Some(id);
        self
    }

    /// Serialize to the JSON text sent on the socket
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Book subscription parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookParams {
    /// Always `book`
    pub channel: Channel,
    /// Symbols to subscribe to
    pub symbol: Vec<String>,
    /// Always request the initial snapshot
    pub snapshot: bool,
    /// Orderbook depth tier
    pub depth: Depth,
}

impl BookParams {
    /// Create book subscription params for one symbol
    pub fn new(symbol: impl Into<String>, depth: Depth) -> Self {
        Self {
            channel: Channel::Book,
            symbol: vec![symbol.into()],
            snapshot: true,
            depth,
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// Subscribe/Unsubscribe acknowledgement
#[derive(Debug, Clone, Deserialize)]
pub struct MethodResponse {
    /// Method name (subscribe, unsubscribe, pong)
    pub method: String,
    /// Result details
    #[serde(default)]
    pub result: Option<MethodResult>,
    /// Whether the operation succeeded
    #[serde(default)]
    pub success: bool,
    /// Echoed request ID
    #[serde(default)]
    pub req_id: Option<u64>,
    /// Error message if failed
    #[serde(default)]
    pub error: Option<String>,
}

/// Acknowledged subscription details
#[derive(Debug, Clone, Deserialize)]
pub struct MethodResult {
    /// Channel name
    pub channel: String,
    /// Symbol
    #[serde(default)]
    pub symbol: Option<String>,
    /// Depth (for book subscriptions)
    #[serde(default)]
    pub depth: Option<u32>,
}

/// Status channel data (sent on connection)
#[derive(Debug, Clone, Deserialize)]
pub struct StatusData {
    /// API version
    pub api_version: String,
    /// Unique connection ID
    #[serde(default)]
    pub connection_id: u64,
    /// System status
    pub system: SystemStatus,
    /// Server version
    #[serde(default)]
    pub version: String,
}

/// Status message
#[derive(Debug, Clone, Deserialize)]
pub struct StatusMessage {
    /// Channel-specific data
    pub data: Vec<StatusData>,
}

/// Book message kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookKind {
    /// Full replacement of the book
    Snapshot,
    /// Incremental delta
    Update,
}

/// Book channel message
///
/// Entries are kept as raw JSON so that a single malformed entry or level
/// can be dropped without discarding the rest of the message.
#[derive(Debug, Clone, Deserialize)]
pub struct BookMessage {
    /// Snapshot or update
    #[serde(rename = "type")]
    pub kind: BookKind,
    /// Raw per-symbol entries
    #[serde(default)]
    pub data: Vec<Value>,
}

impl BookMessage {
    /// Well-formed entries of this message
    pub fn entries(&self) -> impl Iterator<Item = BookData> + '_ {
        self.data.iter().filter_map(BookData::from_value)
    }
}

/// One symbol's worth of book levels
#[derive(Debug, Clone, PartialEq)]
pub struct BookData {
    /// Trading pair symbol
    pub symbol: String,
    /// Bid levels
    pub bids: Vec<Level>,
    /// Ask levels
    pub asks: Vec<Level>,
    /// Exchange checksum, carried but never verified
    pub checksum: Option<u32>,
    /// Update timestamp
    pub timestamp: Option<String>,
}

impl BookData {
    /// Build from a raw entry, dropping malformed levels
    ///
    /// Returns `None` when the entry has no symbol.
    pub fn from_value(value: &Value) -> Option<Self> {
        let symbol = value.get("symbol")?.as_str()?.to_string();
        Some(Self {
            symbol,
            bids: levels(value.get("bids")),
            asks: levels(value.get("asks")),
            checksum: value
                .get("checksum")
                .and_then(Value::as_u64)
                .and_then(|c| u32::try_from(c).ok()),
            timestamp: value
                .get("timestamp")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

fn levels(value: Option<&Value>) -> Vec<Level> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| Level::deserialize(item).ok())
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// Raw Message Parsing
// ============================================================================

/// Parsed inbound message
#[derive(Debug, Clone)]
pub enum Inbound {
    /// Method response (subscribe, unsubscribe, pong)
    Method(MethodResponse),
    /// Status channel update
    Status(StatusMessage),
    /// Book channel update
    Book(BookMessage),
    /// Heartbeat message
    Heartbeat,
    /// Unknown/unsupported message
    Unknown(Value),
}

impl Inbound {
    /// Parse a raw JSON message
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(json)?;

        if value.get("method").is_some() {
            return Ok(Self::Method(serde_json::from_value(value)?));
        }

        match value.get("channel").and_then(Value::as_str) {
            Some("status") => Ok(Self::Status(serde_json::from_value(value)?)),
            Some("book") => Ok(Self::Book(serde_json::from_value(value)?)),
            Some("heartbeat") => Ok(Self::Heartbeat),
            _ => Ok(Self::Unknown(value)),
        }
    }
}
