//! BTreeMap-based price ledger
//!
//! One ledger holds one side of the book. Prices are kept in natural
//! ascending order, so asks read forwards and bids read in reverse.

use crate::view::PriceLevel;
use depth_types::{Level, LevelParseError};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;

/// Decimal places a grouped price key is rounded to
pub const GROUP_KEY_PRECISION: u32 = 8;

/// Price → quantity mapping for one side of the book
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceLedger {
    levels: BTreeMap<Decimal, Decimal>,
}

impl PriceLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every level
    pub fn clear(&mut self) {
        self.levels.clear();
    }

    /// Insert or update a level
    /// If qty is exactly zero, the level is removed
    pub fn set(&mut self, price: Decimal, qty: Decimal) {
        if qty.is_zero() {
            self.levels.remove(&price);
        } else {
            self.levels.insert(price, qty);
        }
    }

    /// Insert or update a level from string-encoded numbers
    pub fn set_str(&mut self, price: &str, qty: &str) -> Result<(), LevelParseError> {
        let level = Level::parse(price, qty)?;
        self.set(level.price, level.qty);
        Ok(())
    }

    /// Apply `set` for each wire level in order
    pub fn batch_update<'a>(&mut self, levels: impl IntoIterator<Item = &'a Level>) {
        for level in levels {
            self.set(level.price, level.qty);
        }
    }

    /// Quantity resting at `price`
    pub fn get(&self, price: &Decimal) -> Option<Decimal> {
        self.levels.get(price).copied()
    }

    /// Number of price levels
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Check if the ledger is empty
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Iterator over (price, qty), lowest price first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (Decimal, Decimal)> + '_ {
        self.levels.iter().map(|(p, q)| (*p, *q))
    }

    /// Sorted, optionally grouped, depth-limited view with running totals
    ///
    /// `ascending` is the ask ordering; descending is the bid ordering. With a
    /// positive `grouping`, asks round up and bids round down to the step so a
    /// bucket never advertises a better price than its members.
    pub fn sorted(
        &self,
        ascending: bool,
        limit: Option<usize>,
        grouping: Option<Decimal>,
    ) -> Vec<PriceLevel> {
        let grouped;
        let source = match grouping.filter(|step| step.is_sign_positive() && !step.is_zero()) {
            Some(step) => {
                grouped = self.grouped(step, ascending);
                &grouped
            }
            None => &self.levels,
        };

        let take = limit.unwrap_or(usize::MAX);
        let ordered: Box<dyn Iterator<Item = (&Decimal, &Decimal)>> = if ascending {
            Box::new(source.iter())
        } else {
            Box::new(source.iter().rev())
        };

        let mut running = Decimal::ZERO;
        ordered
            .filter(|(_, qty)| !qty.is_zero())
            .take(take)
            .map(|(price, qty)| {
                running += *qty;
                PriceLevel {
                    price: *price,
                    quantity: *qty,
                    cumulative_total: running,
                }
            })
            .collect()
    }

    fn grouped(&self, step: Decimal, round_up: bool) -> BTreeMap<Decimal, Decimal> {
        let mut buckets = BTreeMap::new();
        for (price, qty) in &self.levels {
            *buckets.entry(bucket_price(*price, step, round_up)).or_insert(Decimal::ZERO) += *qty;
        }
        buckets
    }
}

/// Round `price` onto the `step` grid
fn bucket_price(price: Decimal, step: Decimal, round_up: bool) -> Decimal {
    let Some(ratio) = price.checked_div(step) else {
        return price;
    };
    let ratio = if round_up { ratio.ceil() } else { ratio.floor() };
    ratio
        .checked_mul(step)
        .unwrap_or(price)
        .round_dp_with_strategy(GROUP_KEY_PRECISION, RoundingStrategy::MidpointNearestEven)
        .normalize()
}
