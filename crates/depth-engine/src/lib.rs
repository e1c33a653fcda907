//! Real-time depth views for Kraken WebSocket API v2
//!
//! This crate turns the raw `book` channel into what a depth chart renders:
//! a depth-limited, optionally price-grouped ladder per side with running
//! totals, rate-shaped for the UI and recorded for replay.
//!
//! # Quick Start
//!
//! ```no_run
//! use depth_engine::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default()
//!         .with_symbol("ETH/USD")?
//!         .with_limit(25)
//!         .with_throttle_ms(250);
//!     let engine = DepthEngine::new(config)?;
//!
//!     let _data = engine.on_data_update(|view| {
//!         if let (Some(ask), Some(bid)) = (view.best_ask(), view.best_bid()) {
//!             println!("{} / {}  spread {}", bid.price, ask.price, view.spread);
//!         }
//!     });
//!     let _status = engine.on_status_update(|status| println!("status: {status}"));
//!
//!     engine.connect()?;
//!     tokio::signal::ctrl_c().await?;
//!     engine.destroy();
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - **Depth-limited views**: rows per side, spread and cumulative totals
//! - **Price grouping**: buckets that never advertise a better price than their members
//! - **Rate shaping**: optional throttle and debounce before listeners see a view
//! - **History**: bounded replay buffer of recorded views
//! - **Live config**: every setting can change while connected

pub mod bus;
pub mod config;
pub mod engine;
pub mod logging;
pub mod pipeline;
pub mod prelude;
pub mod status;

// Re-export main types
pub use bus::{EventBus, ListenerHandle};
pub use config::{Config, ConfigError, ConfigEvent, ReconnectSettings};
pub use engine::{DepthEngine, DepthEngineBuilder, EngineEvent, TransportFactory};
pub use status::{ConnectionStatus, StatusEvent};

// Re-export commonly used types from dependencies
pub use depth_book::{ComputedView, PriceLevel};
pub use depth_feed::Endpoint;
pub use depth_types::{Depth, DepthError, DepthResult, Symbol, SystemStatus};
