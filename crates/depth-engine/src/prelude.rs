//! Re-exports for convenience
//!
//! Import everything you need with:
//! ```
//! use depth_engine::prelude::*;
//! ```

// Engine
pub use crate::engine::{DepthEngine, DepthEngineBuilder, EngineEvent};
pub use crate::bus::ListenerHandle;
pub use crate::config::{grouping_options, Config, ConfigError, ConfigEvent, ReconnectSettings};
pub use crate::status::ConnectionStatus;
pub use crate::logging::LogHandle;

// Views
pub use depth_book::{ComputedView, PriceLevel};

// Wire types
pub use depth_types::{Depth, DepthError, DepthResult, Symbol, SystemStatus};

// Feed
pub use depth_feed::{Endpoint, Transport};

// Decimal for prices/quantities
pub use rust_decimal::Decimal;
