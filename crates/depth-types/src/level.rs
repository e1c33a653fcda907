//! Price level types with decimal precision

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// A single price level as carried on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    /// Price of this level
    #[serde(deserialize_with = "deserialize_decimal")]
    pub price: Decimal,
    /// Quantity at this price level
    #[serde(deserialize_with = "deserialize_decimal")]
    pub qty: Decimal,
}

/// Error parsing a string-encoded level
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field} {value:?}: {reason}")]
pub struct LevelParseError {
    pub field: &'static str,
    pub value: String,
    pub reason: String,
}

impl Level {
    /// Create a new price level
    pub fn new(price: Decimal, qty: Decimal) -> Self {
        Self { price, qty }
    }

    /// Create a level from string-encoded numbers
    pub fn parse(price: &str, qty: &str) -> Result<Self, LevelParseError> {
        Ok(Self {
            price: parse_field("price", price)?,
            qty: parse_field("qty", qty)?,
        })
    }

    /// Check if this level has zero quantity (should be removed)
    pub fn is_zero(&self) -> bool {
        self.qty.is_zero()
    }
}

fn parse_field(field: &'static str, value: &str) -> Result<Decimal, LevelParseError> {
    let trimmed = value.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|e| LevelParseError {
            field,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Kraken sends JSON numbers that lose precision through f64, and some
/// relays send the same values as strings. Accept both.
fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    use rust_decimal::prelude::FromPrimitive;
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => parse_field("value", &s).map_err(D::Error::custom),
        StringOrNumber::Number(n) => {
            let s = n.to_string();
            // Scientific notation (e.g., 5e-6) goes through f64
            if s.contains('e') || s.contains('E') {
                let f = n.as_f64().ok_or_else(|| D::Error::custom("invalid number"))?;
                Decimal::from_f64(f).ok_or_else(|| D::Error::custom("cannot convert to decimal"))
            } else {
                Decimal::from_str(&s).map_err(D::Error::custom)
            }
        }
    }
}
