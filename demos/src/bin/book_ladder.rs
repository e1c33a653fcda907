//! Demo: Cumulative depth ladder
//!
//! Renders the engine's computed view as a mirrored ladder whose bars show
//! running totals, redrawn at the throttle rate.
//!
//! Run: cargo run --bin book_ladder -- ETH/USD 15 0.5

use colored::*;
use depth_engine::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use std::str::FromStr;
use std::sync::Arc;

const BAR_WIDTH: usize = 30;

fn bar(total: Decimal, max_total: Decimal) -> usize {
    if max_total.is_zero() {
        return 0;
    }
    (total / max_total * Decimal::from(BAR_WIDTH))
        .to_usize()
        .unwrap_or(0)
        .min(BAR_WIDTH)
}

fn draw(symbol: &str, view: &ComputedView) {
    print!("\x1B[2J\x1B[H");
    println!("{}", "═".repeat(72).cyan());
    println!("{}{}", format!("  {} DEPTH LADDER", symbol).cyan().bold(), "  (Live)".dimmed());
    println!("{}", "═".repeat(72).cyan());
    println!();

    if view.is_empty() {
        println!("  {}", "Waiting for both sides of the book...".dimmed());
        return;
    }

    for level in view.asks.iter().rev() {
        let len = bar(level.cumulative_total, view.max_total);
        println!(
            "  {:>14} │{}{}│ {:>12}",
            level.price.to_string().red(),
            " ".repeat(BAR_WIDTH - len),
            "█".repeat(len).red(),
            level.cumulative_total.round_dp(4),
        );
    }

    println!(
        "  {:>14} ├{}┤ {}",
        "",
        "─".repeat(BAR_WIDTH),
        format!("SPREAD {} ({}%)", view.spread, view.spread_pct.round_dp(4)).yellow()
    );

    for level in &view.bids {
        let len = bar(level.cumulative_total, view.max_total);
        println!(
            "  {:>14} │{}{}│ {:>12}",
            level.price.to_string().green(),
            "█".repeat(len).green(),
            " ".repeat(BAR_WIDTH - len),
            level.cumulative_total.round_dp(4),
        );
    }

    println!();
    if let Some(mid) = view.mid_price() {
        println!("  {} {}", "Mid:".white(), mid);
    }
    println!(
        "  {} {}  {} {}",
        "Bid depth:".green(),
        view.max_bid_total.round_dp(4),
        "Ask depth:".red(),
        view.max_ask_total.round_dp(4)
    );
    println!(
        "  {} {}",
        "Updated:".dimmed(),
        chrono::Local::now().format("%H:%M:%S%.3f")
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let symbol = args.next().unwrap_or_else(|| "BTC/USD".to_string());
    let limit: u32 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(15);
    let grouping = args.next().map(|s| Decimal::from_str(&s)).transpose()?;

    let mut config = Config::default()
        .with_symbol(&symbol)?
        .with_limit(limit)
        .with_throttle_ms(250);
    if let Some(grouping) = grouping {
        config = config.with_spread_grouping(grouping);
    }
    let engine = DepthEngine::new(config)?;

    println!("{}", "═".repeat(72).cyan());
    println!("{}", "  DEPTH LADDER".cyan().bold());
    println!("{}", "═".repeat(72).cyan());
    println!("  Grouping options: {:?}", engine.grouping_options());

    let name = Arc::new(symbol);
    let _data = engine.on_data_update({
        let name = Arc::clone(&name);
        move |view| draw(&name, view)
    });
    let _status = engine.on_status_update(|status| {
        let label = match status {
            ConnectionStatus::Connected => status.to_string().green(),
            ConnectionStatus::Error => status.to_string().red(),
            _ => status.to_string().yellow(),
        };
        println!("  {} {}", "Status:".dimmed(), label);
    });
    let _errors = engine.on_error(|error| eprintln!("  {} {}", "Error:".red().bold(), error));

    engine.connect()?;
    tokio::signal::ctrl_c().await?;

    println!("\n{} {} views recorded", "✓".green(), engine.history().len());
    engine.destroy();
    Ok(())
}
