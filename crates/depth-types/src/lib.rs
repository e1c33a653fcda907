//! Shared types for the depth-view order book engine
//!
//! This crate holds the wire types spoken with Kraken's WebSocket API v2
//! `book` channel and the error taxonomy shared by the other crates. It has
//! no async or networking dependencies.
//!
//! # Key Types
//!
//! - [`Symbol`] - Trading pair symbols (e.g., "BTC/USD")
//! - [`Level`] - Wire price level with decimal precision
//! - [`Depth`], [`Channel`], [`SystemStatus`] - Protocol enums
//! - [`BookRequest`], [`BookMessage`], [`Inbound`] - Request/response messages
//! - [`DepthError`] - Error taxonomy

pub mod enums;
pub mod error;
pub mod level;
pub mod messages;
pub mod symbol;

// Re-export commonly used types
pub use enums::*;
pub use error::*;
pub use level::*;
pub use messages::*;
pub use symbol::*;

// Re-export rust_decimal for users
pub use rust_decimal::Decimal;
