//! Trading pair symbols (BTC/USD format)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trading pair symbol in the v2 `BASE/QUOTE` form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Default pair for a fresh configuration
    pub const BTC_USD: &'static str = "BTC/USD";

    /// Get the symbol as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Base currency (e.g., "BTC" from "BTC/USD")
    pub fn base(&self) -> &str {
        self.0.split('/').next().unwrap_or_default()
    }

    /// Quote currency (e.g., "USD" from "BTC/USD")
    pub fn quote(&self) -> &str {
        self.0.split('/').nth(1).unwrap_or_default()
    }
}

impl Default for Symbol {
    fn default() -> Self {
        Self(Self::BTC_USD.to_string())
    }
}

impl FromStr for Symbol {
    type Err = SymbolParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SymbolParseError::Empty);
        }
        let Some((base, quote)) = s.split_once('/') else {
            return Err(SymbolParseError::MissingSlash(s.to_string()));
        };
        if quote.contains('/') {
            return Err(SymbolParseError::InvalidFormat(s.to_string()));
        }
        if base.is_empty() || quote.is_empty() {
            return Err(SymbolParseError::EmptyPart(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Symbol {
    type Error = SymbolParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Symbol {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Error parsing a symbol
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolParseError {
    #[error("Symbol is empty")]
    Empty,

    #[error("Symbol must contain '/': {0}")]
    MissingSlash(String),

    #[error("Invalid symbol format: {0}")]
    InvalidFormat(String),

    #[error("Symbol has empty base or quote: {0}")]
    EmptyPart(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_parse() {
        let symbol: Symbol = "ETH/USD".parse().unwrap();
        assert_eq!(symbol.as_str(), "ETH/USD");
        assert_eq!(symbol.base(), "ETH");
        assert_eq!(symbol.quote(), "USD");
        assert!(symbol == *"ETH/USD");
    }

    #[test]
    fn test_symbol_parse_error() {
        assert_eq!("".parse::<Symbol>(), Err(SymbolParseError::Empty));
        assert!(matches!(
            "BTCUSD".parse::<Symbol>(),
            Err(SymbolParseError::MissingSlash(_))
        ));
        assert!(matches!(
            "BTC/USD/EUR".parse::<Symbol>(),
            Err(SymbolParseError::InvalidFormat(_))
        ));
        assert!("/USD".parse::<Symbol>().is_err());
        assert!("BTC/".parse::<Symbol>().is_err());
    }

    #[test]
    fn test_symbol_serde() {
        let symbol: Symbol = "SOL/USD".parse().unwrap();
        let json = serde_json::to_string(&symbol).unwrap();
        assert_eq!(json, "\"SOL/USD\"");

        let parsed: Symbol = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, symbol);
        assert!(serde_json::from_str::<Symbol>("\"SOLUSD\"").is_err());
    }
}
