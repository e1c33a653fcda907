//! Inbound frame decoding for the book channel
//!
//! Control traffic (heartbeats, status, method acks) is classified here so
//! the session only forwards book data for the subscribed symbol.

use crate::events::BookSignal;
use crate::subscription::Subscription;
use depth_types::{BookKind, DepthError, Inbound, MethodResponse, SystemStatus};
use tracing::{debug, trace};

/// Classified inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Book signals for the subscribed symbol, in message order
    Book(Vec<BookSignal>),
    /// Exchange system status
    Status(SystemStatus),
    /// Subscribe acknowledged
    Subscribed {
        /// Acknowledged symbol
        symbol: Option<String>,
        /// Acknowledged depth
        depth: Option<u32>,
    },
    /// Subscribe rejected
    Rejected(DepthError),
    /// Heartbeat, unsubscribe ack or unknown message
    Ignored,
}

/// Decode one text frame against the active subscription
///
/// Book entries for other symbols are dropped, as are malformed levels
/// within an entry. Invalid JSON is a protocol error.
pub fn decode(text: &str, subscription: &Subscription) -> Result<Decoded, DepthError> {
    let inbound = Inbound::parse(text).map_err(|e| DepthError::protocol(e.to_string(), Some(text)))?;

    Ok(match inbound {
        Inbound::Book(message) => {
            let signals: Vec<BookSignal> = message
                .entries()
                .filter(|entry| {
                    let keep = subscription.matches(&entry.symbol);
                    if !keep {
                        trace!(symbol = %entry.symbol, "Dropping book entry for other symbol");
                    }
                    keep
                })
                .map(|entry| match message.kind {
                    BookKind::Snapshot => BookSignal::Snapshot(entry),
                    BookKind::Update => BookSignal::Update(entry),
                })
                .collect();
            if signals.is_empty() {
                Decoded::Ignored
            } else {
                Decoded::Book(signals)
            }
        }
        Inbound::Status(status) => match status.data.first() {
            Some(data) => Decoded::Status(data.system),
            None => Decoded::Ignored,
        },
        Inbound::Method(response) => classify_ack(response),
        Inbound::Heartbeat => Decoded::Ignored,
        Inbound::Unknown(value) => {
            debug!(%value, "Unknown message");
            Decoded::Ignored
        }
    })
}

fn classify_ack(response: MethodResponse) -> Decoded {
    match (response.method.as_str(), response.success) {
        ("subscribe", true) => {
            let result = response.result.unwrap_or_else(|| depth_types::MethodResult {
                channel: "book".into(),
                symbol: None,
                depth: None,
            });
            Decoded::Subscribed {
                symbol: result.symbol,
                depth: result.depth,
            }
        }
        ("subscribe", false) => Decoded::Rejected(DepthError::SubscriptionRejected {
            channel: response
                .result
                .map(|r| r.channel)
                .unwrap_or_else(|| "book".into()),
            reason: response.error.unwrap_or_else(|| "unknown reason".into()),
        }),
        (method, success) => {
            debug!(method, success, error = ?response.error, "Method response");
            Decoded::Ignored
        }
    }
}
