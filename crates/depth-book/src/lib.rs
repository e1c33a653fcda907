//! Price ledgers, depth views and replay history
//!
//! This crate holds the synchronous, clock-free core of the engine: the
//! per-side [`PriceLedger`], the [`ComputedView`] projection with grouping
//! and running totals, and the bounded [`HistoryBuffer`].
//!
//! # Constraints
//!
//! - NO `tokio`, NO networking
//! - NO clock reads: callers stamp views with their own timestamp
//!
//! # Example
//!
//! ```
//! use depth_book::{ComputedView, PriceLedger, ViewParams};
//! use rust_decimal::Decimal;
//!
//! let mut asks = PriceLedger::new();
//! let mut bids = PriceLedger::new();
//! asks.set(Decimal::from(101), Decimal::ONE);
//! bids.set(Decimal::from(100), Decimal::TWO);
//!
//! let params = ViewParams { limit: 10, grouping: Decimal::ZERO };
//! let view = ComputedView::compute(&asks, &bids, params, None, 0);
//! assert_eq!(view.spread, Decimal::ONE);
//! ```

pub mod history;
pub mod ledger;
pub mod view;

// Re-export main types
pub use history::{HistoryBuffer, DEFAULT_HISTORY_LENGTH};
pub use ledger::{PriceLedger, GROUP_KEY_PRECISION};
pub use view::{ComputedView, PriceLevel, ViewParams};
