//! Engine scenarios driven by captured feed messages over MockTransport

mod common;

use common::*;
use depth_engine::{
    ComputedView, Config, ConfigEvent, ConnectionStatus, DepthError, ReconnectSettings, SystemStatus,
};
use depth_feed::TransportError;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn views(recorder: &Recorder<Arc<ComputedView>>) -> impl Fn(&Arc<ComputedView>) + Send + Sync + 'static {
    let sink = recorder.sink();
    move |view| sink(Arc::clone(view))
}

// =============================================================================
// Book flow
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_snapshot_then_update() {
    let factory = MockFactory::default();
    let engine = factory.install(unshaped());
    let data = Recorder::new();
    let _data = engine.on_data_update(views(&data));

    engine.connect().unwrap();
    settle().await;
    let feed = factory.latest();
    assert_eq!(engine.status(), ConnectionStatus::Connected);
    assert!(feed.sent()[0].contains(r#""method":"subscribe""#));
    assert!(feed.sent()[0].contains("BTC/USD"));

    feed.push_text(SUBSCRIBED);
    feed.push_text(SNAPSHOT);
    settle().await;

    let view = engine.current_data();
    assert_eq!(view.best_ask().unwrap().price, dec!(101));
    assert_eq!(view.best_bid().unwrap().price, dec!(100));
    assert_eq!(view.spread, dec!(1));
    assert_eq!(view.max_ask_total, dec!(7));
    assert_eq!(view.max_bid_total, dec!(6));
    assert_eq!(view.checksum, Some(3310070434));

    feed.push_text(UPDATE);
    settle().await;

    let seen = data.take();
    assert_eq!(seen.len(), 2);
    let last = &seen[1];
    assert_eq!(last.best_ask().unwrap().price, dec!(102));
    assert_eq!(last.best_bid().unwrap().price, dec!(100.5));
    assert_eq!(last.spread, dec!(1.5));
    assert_eq!(last.max_bid_total, dec!(6.5));
    assert_eq!(last.checksum, Some(1917310217));
    assert!(Arc::ptr_eq(last, &engine.current_data()));
    assert_eq!(engine.history().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_other_symbols_are_ignored() {
    let factory = MockFactory::default();
    let engine = factory.install(unshaped());
    let raw = Recorder::new();
    let _raw = engine.on_raw_data_update(views(&raw));

    engine.connect().unwrap();
    settle().await;
    factory.latest().push_text(OTHER_SYMBOL);
    settle().await;

    assert_eq!(raw.len(), 0);
    assert!(engine.current_data().is_empty());
    assert_eq!(engine.status(), ConnectionStatus::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribed_listener_stops_receiving() {
    let factory = MockFactory::default();
    let engine = factory.install(unshaped());
    let data = Recorder::new();
    let handle = engine.on_data_update(views(&data));

    engine.connect().unwrap();
    settle().await;
    factory.latest().push_text(SNAPSHOT);
    settle().await;
    handle.unsubscribe();
    factory.latest().push_text(UPDATE);
    settle().await;

    assert_eq!(data.len(), 1);
    assert_eq!(engine.current_data().spread, dec!(1.5));
}

#[tokio::test(start_paused = true)]
async fn test_history_disabled_records_nothing() {
    let factory = MockFactory::default();
    let engine = factory.install(unshaped().with_history(false, 10));
    let history = Recorder::new();
    let _history = engine.on_history_update({
        let sink = history.sink();
        move |views: &[Arc<ComputedView>]| sink(views.len())
    });

    engine.connect().unwrap();
    settle().await;
    factory.latest().push_text(SNAPSHOT);
    settle().await;

    assert!(engine.history().is_empty());
    assert_eq!(history.len(), 0);

    engine.set_history_enabled(true).unwrap();
    factory.latest().push_text(UPDATE);
    settle().await;
    assert_eq!(history.take(), vec![1]);
}

// =============================================================================
// Rate shaping
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_throttle_coalesces_to_latest_view() {
    let factory = MockFactory::default();
    let engine = factory.install(unshaped().with_throttle_ms(100));
    let raw = Recorder::new();
    let data = Recorder::new();
    let _raw = engine.on_raw_data_update(views(&raw));
    let _data = engine.on_data_update(views(&data));

    engine.connect().unwrap();
    settle().await;
    let feed = factory.latest();
    feed.push_text(SNAPSHOT);
    feed.push_text(UPDATE);
    settle().await;

    assert_eq!(raw.len(), 2);
    assert_eq!(data.len(), 0);

    sleep(Duration::from_millis(100)).await;
    let seen = data.take();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].spread, dec!(1.5));
    assert_eq!(engine.history().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_debounce_waits_for_quiet_period() {
    let factory = MockFactory::default();
    let engine = factory.install(unshaped().with_debounce_ms(200));
    let data = Recorder::new();
    let _data = engine.on_data_update(views(&data));

    engine.connect().unwrap();
    settle().await;
    let feed = factory.latest();
    feed.push_text(SNAPSHOT);
    sleep(Duration::from_millis(150)).await;
    feed.push_text(UPDATE);
    sleep(Duration::from_millis(150)).await;
    assert_eq!(data.len(), 0);

    sleep(Duration::from_millis(100)).await;
    let seen = data.take();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].spread, dec!(1.5));
}

// =============================================================================
// Status and errors
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_status_lifecycle() {
    let factory = MockFactory::default();
    let engine = factory.install(unshaped());
    let statuses = Recorder::new();
    let _status = engine.on_status_update(statuses.sink());
    assert_eq!(engine.status(), ConnectionStatus::Disconnected);

    engine.connect().unwrap();
    settle().await;
    let feed = factory.latest();
    feed.push_text(STATUS);
    settle().await;
    assert_eq!(engine.exchange_status(), Some(SystemStatus::Online));

    engine.disconnect();
    settle().await;

    assert_eq!(
        statuses.take(),
        vec![
            ConnectionStatus::Connecting,
            ConnectionStatus::Connected,
            ConnectionStatus::Disconnected,
        ]
    );
    assert_eq!(feed.close_count(), 1);
    assert!(feed.sent().iter().any(|frame| frame.contains("unsubscribe")));
}

#[tokio::test(start_paused = true)]
async fn test_connection_error_latches_until_reopened() {
    let factory = MockFactory::default();
    let config = unshaped().with_reconnect(ReconnectSettings {
        enabled: true,
        max_attempts: 3,
        delay_ms: 500,
    });
    let engine = factory.install(config);
    let statuses = Recorder::new();
    let errors = Recorder::new();
    let _status = engine.on_status_update(statuses.sink());
    let _errors = engine.on_error({
        let sink = errors.sink();
        move |error: &DepthError| sink(error.clone())
    });

    engine.connect().unwrap();
    settle().await;
    let feed = factory.latest();
    feed.push_error(TransportError::ReceiveFailed("reset by peer".into()));
    settle().await;

    assert_eq!(engine.status(), ConnectionStatus::Error);
    assert!(matches!(&errors.take()[..], [DepthError::Connection { .. }]));

    sleep(Duration::from_millis(600)).await;

    assert_eq!(engine.status(), ConnectionStatus::Connected);
    assert_eq!(feed.connect_count(), 2);
    let subscribes = feed.sent().iter().filter(|f| f.contains(r#""method":"subscribe""#)).count();
    assert_eq!(subscribes, 2);
    assert_eq!(
        statuses.take(),
        vec![
            ConnectionStatus::Connecting,
            ConnectionStatus::Connected,
            ConnectionStatus::Error,
            ConnectionStatus::Connected,
        ]
    );
    assert!(engine.last_error().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_rejected_subscription_blocks_book_messages() {
    let factory = MockFactory::default();
    let engine = factory.install(unshaped());
    let errors = Recorder::new();
    let _errors = engine.on_error({
        let sink = errors.sink();
        move |error: &DepthError| sink(error.clone())
    });

    engine.connect().unwrap();
    settle().await;
    let feed = factory.latest();
    feed.push_text(REJECTED);
    feed.push_text(SNAPSHOT);
    settle().await;

    match &errors.take()[..] {
        [DepthError::SubscriptionRejected { channel, reason }] => {
            assert_eq!(channel, "book");
            assert_eq!(reason, "Currency pair not supported");
        }
        other => panic!("expected one rejection, got {other:?}"),
    }
    assert_eq!(engine.status(), ConnectionStatus::Error);
    assert!(engine.current_data().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_malformed_frame_is_reported_not_latched() {
    let factory = MockFactory::default();
    let engine = factory.install(unshaped());
    let errors = Recorder::new();
    let _errors = engine.on_error({
        let sink = errors.sink();
        move |error: &DepthError| sink(error.clone())
    });

    engine.connect().unwrap();
    settle().await;
    let feed = factory.latest();
    feed.push_text("{not json");
    feed.push_text(SNAPSHOT);
    settle().await;

    assert!(matches!(&errors.take()[..], [DepthError::Protocol { .. }]));
    assert_eq!(engine.status(), ConnectionStatus::Connected);
    assert!(!engine.current_data().is_empty());
    assert!(matches!(engine.last_error(), Some(DepthError::Protocol { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_gives_up_after_max_attempts() {
    let factory = MockFactory::default();
    let config = unshaped().with_reconnect(ReconnectSettings {
        enabled: true,
        max_attempts: 2,
        delay_ms: 100,
    });
    let engine = factory.install(config);
    let statuses = Recorder::new();
    let _status = engine.on_status_update(statuses.sink());

    engine.connect().unwrap();
    // The session task has not been polled yet
    let feed = factory.latest();
    feed.fail_next_connects(10);

    sleep(Duration::from_secs(1)).await;

    assert_eq!(feed.connect_count(), 3);
    assert_eq!(engine.status(), ConnectionStatus::Error);
    assert!(matches!(
        engine.last_error(),
        Some(DepthError::ReconnectExhausted { attempts: 2, .. })
    ));
    assert_eq!(
        statuses.take(),
        vec![ConnectionStatus::Connecting, ConnectionStatus::Error]
    );

    // A fresh connect starts over
    engine.connect().unwrap();
    settle().await;
    assert_eq!(factory.connections(), 2);
    assert_eq!(engine.status(), ConnectionStatus::Connected);
}

// =============================================================================
// Configuration
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_symbol_change_resubscribes_with_empty_book() {
    let factory = MockFactory::default();
    let engine = factory.install(unshaped());
    let events = Recorder::new();
    let _config = engine.on_config_update({
        let sink = events.sink();
        move |event: &ConfigEvent| sink(event.clone())
    });

    engine.connect().unwrap();
    settle().await;
    let old = factory.latest();
    old.push_text(SNAPSHOT);
    settle().await;
    assert_eq!(engine.history().len(), 1);

    engine.set_symbol("ETH/USD").unwrap();

    assert!(engine.current_data().is_empty());
    assert!(engine.history().is_empty());
    assert_eq!(engine.symbol().as_str(), "ETH/USD");
    match &events.take()[..] {
        [ConfigEvent::Symbol(symbol), ConfigEvent::Changed(config)] => {
            assert_eq!(symbol.as_str(), "ETH/USD");
            assert_eq!(config.symbol, *symbol);
        }
        other => panic!("unexpected config events: {other:?}"),
    }

    settle().await;
    assert_eq!(factory.connections(), 2);
    let new = factory.latest();
    assert!(new.sent()[0].contains("ETH/USD"));
    assert_eq!(old.close_count(), 1);
    assert!(old.sent().iter().any(|f| f.contains("unsubscribe")));

    new.push_text(ETH_SNAPSHOT);
    settle().await;
    assert_eq!(engine.current_data().best_bid().unwrap().price, dec!(3000));
    assert_eq!(engine.status(), ConnectionStatus::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_symbol_change_drops_views_waiting_in_pipeline() {
    let factory = MockFactory::default();
    let engine = factory.install(Config::default());
    let data = Recorder::new();
    let _data = engine.on_data_update(views(&data));
    assert_eq!(engine.throttle_ms(), 100);

    engine.connect().unwrap();
    settle().await;
    factory.latest().push_text(SNAPSHOT);
    settle().await;

    engine.set_symbol("ETH/USD").unwrap();
    sleep(Duration::from_millis(200)).await;

    assert_eq!(data.len(), 0);
    assert!(engine.history().is_empty());
    assert!(engine.current_data().is_empty());
    assert_eq!(engine.symbol().as_str(), "ETH/USD");
}

#[tokio::test(start_paused = true)]
async fn test_old_session_frames_ignored_after_symbol_change() {
    let factory = MockFactory::default();
    let engine = factory.install(unshaped());
    let raw = Recorder::new();
    let _raw = engine.on_raw_data_update(views(&raw));

    engine.connect().unwrap();
    settle().await;
    let old = factory.latest();

    engine.set_symbol("ETH/USD").unwrap();
    old.push_text(SNAPSHOT);
    old.push_text(UPDATE);
    settle().await;

    assert_eq!(raw.len(), 0);
    assert!(engine.current_data().is_empty());
    assert_eq!(old.close_count(), 1);

    factory.latest().push_text(ETH_SNAPSHOT);
    settle().await;
    assert_eq!(raw.len(), 1);
    assert_eq!(engine.current_data().best_ask().unwrap().price, dec!(3001));
}

#[tokio::test(start_paused = true)]
async fn test_setting_current_value_is_silent() {
    let factory = MockFactory::default();
    let engine = factory.install(unshaped());
    let events = Recorder::new();
    let _config = engine.on_config_update({
        let sink = events.sink();
        move |event: &ConfigEvent| sink(event.clone())
    });

    engine.set_limit(10).unwrap();
    engine.set_symbol("BTC/USD").unwrap();
    engine.set_throttle_ms(0).unwrap();
    assert_eq!(events.len(), 0);

    assert!(matches!(engine.set_limit(0), Err(DepthError::Configuration(_))));
    assert!(matches!(engine.set_symbol("BTCUSD"), Err(DepthError::Configuration(_))));
    assert_eq!(events.len(), 0);
    assert_eq!(engine.limit(), 10);
}

#[tokio::test(start_paused = true)]
async fn test_grouping_change_recomputes_view() {
    let factory = MockFactory::default();
    let engine = factory.install(unshaped());
    let data = Recorder::new();
    let _data = engine.on_data_update(views(&data));

    engine.connect().unwrap();
    settle().await;
    factory.latest().push_text(SNAPSHOT);
    settle().await;
    data.take();

    engine.set_spread_grouping(dec!(1)).unwrap();

    let seen = data.take();
    assert_eq!(seen.len(), 1);
    let bids: Vec<_> = seen[0].bids.iter().map(|l| l.price).collect();
    assert_eq!(bids, vec![dec!(100), dec!(99), dec!(98)]);
    assert_eq!(factory.connections(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_limit_change_while_disconnected_does_not_connect() {
    let factory = MockFactory::default();
    let engine = factory.install(unshaped());

    engine.set_limit(50).unwrap();

    assert_eq!(engine.depth(), depth_engine::Depth::D100);
    assert_eq!(factory.connections(), 0);
    assert_eq!(engine.status(), ConnectionStatus::Disconnected);
}

// =============================================================================
// Teardown
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_destroy_stops_everything() {
    let factory = MockFactory::default();
    let engine = factory.install(unshaped().with_throttle_ms(100));
    let data = Recorder::new();
    let _data = engine.on_data_update(views(&data));

    engine.connect().unwrap();
    settle().await;
    let feed = factory.latest();
    feed.push_text(SNAPSHOT);
    settle().await;

    engine.destroy();
    assert!(engine.is_destroyed());
    assert!(engine.current_data().is_empty());
    assert!(engine.history().is_empty());

    sleep(Duration::from_millis(200)).await;
    assert_eq!(data.len(), 0);
    assert_eq!(feed.close_count(), 1);

    assert_eq!(engine.connect(), Err(DepthError::Destroyed));
    assert_eq!(engine.set_limit(20), Err(DepthError::Destroyed));
}
