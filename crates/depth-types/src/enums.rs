//! Channel, Depth and SystemStatus enums

use serde::{Deserialize, Serialize};
use std::fmt;

/// WebSocket channel types this engine speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Book channel - Level 2 orderbook
    Book,
    /// Status channel - system status
    Status,
    /// Heartbeat channel - keepalive
    Heartbeat,
}

impl Channel {
    /// Returns the channel name as used in API messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::Status => "status",
            Self::Heartbeat => "heartbeat",
        }
    }
}

/// Orderbook subscription depth tiers supported by the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Depth {
    /// 10 price levels per side
    #[default]
    D10 = 10,
    /// 25 price levels per side
    D25 = 25,
    /// 100 price levels per side
    D100 = 100,
    /// 500 price levels per side
    D500 = 500,
    /// 1000 price levels per side
    D1000 = 1000,
}

impl Depth {
    /// All tiers, smallest first
    pub const ALL: [Depth; 5] = [Self::D10, Self::D25, Self::D100, Self::D500, Self::D1000];

    /// Returns the depth as a u32
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// Parse an exact tier value
    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_u32() == value)
    }

    /// Smallest tier that can serve `limit` visible rows
    ///
    /// Returns `None` when `limit` exceeds the largest tier.
    pub fn for_limit(limit: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_u32() >= limit)
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

// Depth travels as a bare number on the wire and in config files.
impl Serialize for Depth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.as_u32())
    }
}

impl<'de> Deserialize<'de> for Depth {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u32::deserialize(deserializer)?;
        Self::from_u32(value).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid depth {value} (supported: 10, 25, 100, 500, 1000)"
            ))
        })
    }
}

/// System status reported on the status channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemStatus {
    /// Normal operation
    Online,
    /// Cancel-only mode
    CancelOnly,
    /// Post-only mode
    PostOnly,
    /// Limit-only mode
    LimitOnly,
    /// Reduce-only mode
    ReduceOnly,
    /// Maintenance mode
    Maintenance,
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::CancelOnly => write!(f, "cancel_only"),
            Self::PostOnly => write!(f, "post_only"),
            Self::LimitOnly => write!(f, "limit_only"),
            Self::ReduceOnly => write!(f, "reduce_only"),
            Self::Maintenance => write!(f, "maintenance"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_serde() {
        assert_eq!(serde_json::to_string(&Channel::Book).unwrap(), "\"book\"");
        let parsed: Channel = serde_json::from_str("\"heartbeat\"").unwrap();
        assert_eq!(parsed, Channel::Heartbeat);
    }

    #[test]
    fn test_depth_serde() {
        assert_eq!(serde_json::to_string(&Depth::D25).unwrap(), "25");
        let parsed: Depth = serde_json::from_str("500").unwrap();
        assert_eq!(parsed, Depth::D500);
        assert!(serde_json::from_str::<Depth>("30").is_err());
    }

    #[test]
    fn test_depth_for_limit() {
        assert_eq!(Depth::for_limit(1), Some(Depth::D10));
        assert_eq!(Depth::for_limit(10), Some(Depth::D10));
        assert_eq!(Depth::for_limit(11), Some(Depth::D25));
        assert_eq!(Depth::for_limit(26), Some(Depth::D100));
        assert_eq!(Depth::for_limit(1000), Some(Depth::D1000));
        assert_eq!(Depth::for_limit(1001), None);
    }

    #[test]
    fn test_depth_ordering() {
        assert!(Depth::D10 < Depth::D25);
        assert!(Depth::D500 < Depth::D1000);
    }
}
