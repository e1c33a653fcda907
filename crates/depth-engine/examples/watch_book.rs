//! Example: Watch a depth-limited, grouped book
//!
//! Run with: cargo run --example watch_book -- ETH/USD 25 1

use depth_engine::logging;
use depth_engine::prelude::*;
use std::str::FromStr;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log = logging::init(false)?;

    let mut args = std::env::args().skip(1);
    let symbol = args.next().unwrap_or_else(|| Symbol::BTC_USD.to_string());
    let limit = args.next().map(|s| s.parse()).transpose()?.unwrap_or(10);
    let grouping = args.next().map(|s| Decimal::from_str(&s)).transpose()?;

    println!("=== Depth view for {} (limit {}) ===\n", symbol, limit);

    let mut config = Config::default()
        .with_symbol(&symbol)?
        .with_limit(limit)
        .with_throttle_ms(500);
    if let Some(grouping) = grouping {
        config = config.with_spread_grouping(grouping);
    }
    let engine = DepthEngine::builder(config).with_log_handle(log).build()?;

    let _status = engine.on_status_update(|status| println!("[status] {}", status));
    let _errors = engine.on_error(|error| println!("[error] {}", error));
    let _data = engine.on_data_update(|view| {
        match (view.best_bid(), view.best_ask()) {
            (Some(bid), Some(ask)) => println!(
                "bid {} x {} | ask {} x {} | spread {} ({}%) | rows {}/{}",
                bid.price,
                bid.quantity,
                ask.price,
                ask.quantity,
                view.spread,
                view.spread_pct.round_dp(4),
                view.bids.len(),
                view.asks.len()
            ),
            _ => println!("(book is empty)"),
        }
    });

    engine.connect()?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => println!("\nInterrupted"),
        _ = tokio::time::sleep(Duration::from_secs(60)) => println!("\nDone"),
    }

    println!("Recorded {} views", engine.history().len());
    engine.destroy();
    Ok(())
}
