//! WebSocket endpoint definitions

use std::fmt;

/// Kraken WebSocket API v2 endpoints serving the public book channel
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Endpoint {
    /// Production public market data (default)
    #[default]
    Public,
    /// Public beta/testing
    PublicBeta,
    /// Any other URL, e.g. a local relay
    Custom(String),
}

impl Endpoint {
    /// Get the WebSocket URL for this endpoint
    pub fn url(&self) -> &str {
        match self {
            Self::Public => "wss://ws.kraken.com/v2",
            Self::PublicBeta => "wss://beta-ws.kraken.com/v2",
            Self::Custom(url) => url,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url())
    }
}
