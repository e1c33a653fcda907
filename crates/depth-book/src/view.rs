//! Computed depth view
//!
//! The view is what consumers render: both sides sorted away from the
//! spread, grouped, depth-limited and annotated with running totals.

use crate::ledger::PriceLedger;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Decimal places kept on the spread percentage
const SPREAD_PCT_PRECISION: u32 = 8;

/// One row of the computed view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Level (or bucket) price
    pub price: Decimal,
    /// Quantity at this level
    pub quantity: Decimal,
    /// Sum of quantities from the best price up to and including this level
    pub cumulative_total: Decimal,
}

/// Parameters for projecting ledgers into a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewParams {
    /// Rows per side
    pub limit: usize,
    /// Price grouping step (zero disables grouping)
    pub grouping: Decimal,
}

/// Immutable projection of both ledgers at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedView {
    /// Milliseconds since the Unix epoch when the view was computed
    pub timestamp: i64,
    /// Asks, lowest price first
    pub asks: Vec<PriceLevel>,
    /// Bids, highest price first
    pub bids: Vec<PriceLevel>,
    /// Best ask minus best bid
    pub spread: Decimal,
    /// Spread as a percentage of the best ask
    pub spread_pct: Decimal,
    /// Cumulative total of the deepest ask row
    pub max_ask_total: Decimal,
    /// Cumulative total of the deepest bid row
    pub max_bid_total: Decimal,
    /// Larger of the two side totals
    pub max_total: Decimal,
    /// Checksum carried on the last applied message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<u32>,
}

impl ComputedView {
    /// View with no rows and zeroed derived fields
    pub fn empty(timestamp: i64) -> Self {
        Self {
            timestamp,
            asks: Vec::new(),
            bids: Vec::new(),
            spread: Decimal::ZERO,
            spread_pct: Decimal::ZERO,
            max_ask_total: Decimal::ZERO,
            max_bid_total: Decimal::ZERO,
            max_total: Decimal::ZERO,
            checksum: None,
        }
    }

    /// Project both ledgers
    ///
    /// If either side is empty the whole view is empty: a one-sided book has
    /// no meaningful spread.
    pub fn compute(
        asks: &PriceLedger,
        bids: &PriceLedger,
        params: ViewParams,
        checksum: Option<u32>,
        timestamp: i64,
    ) -> Self {
        let grouping = Some(params.grouping);
        let ask_rows = asks.sorted(true, Some(params.limit), grouping);
        let bid_rows = bids.sorted(false, Some(params.limit), grouping);

        let (Some(best_ask), Some(best_bid)) = (ask_rows.first(), bid_rows.first()) else {
            return Self {
                checksum,
                ..Self::empty(timestamp)
            };
        };

        let spread = best_ask.price - best_bid.price;
        let spread_pct = if best_ask.price.is_zero() {
            Decimal::ZERO
        } else {
            (spread / best_ask.price * Decimal::ONE_HUNDRED).round_dp(SPREAD_PCT_PRECISION)
        };
        let max_ask_total = ask_rows.last().map(|l| l.cumulative_total).unwrap_or_default();
        let max_bid_total = bid_rows.last().map(|l| l.cumulative_total).unwrap_or_default();

        Self {
            timestamp,
            spread,
            spread_pct,
            max_ask_total,
            max_bid_total,
            max_total: max_ask_total.max(max_bid_total),
            checksum,
            asks: ask_rows,
            bids: bid_rows,
        }
    }

    /// Check if the view has no rows
    pub fn is_empty(&self) -> bool {
        self.asks.is_empty() && self.bids.is_empty()
    }

    /// Best (lowest) ask row
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Best (highest) bid row
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Get the mid price
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some((ask.price + bid.price) / Decimal::TWO),
            _ => None,
        }
    }
}
