//! Shared fixtures for engine tests
//!
//! Frames follow the shape of live Kraken API v2 `book` and `status`
//! messages, trimmed to a few levels.

#![allow(dead_code)]

use depth_engine::{Config, DepthEngine, Endpoint};
use depth_feed::{MockController, MockTransport, Transport};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub const STATUS: &str = r#"{
    "channel": "status",
    "type": "update",
    "data": [{
        "api_version": "v2",
        "connection_id": 12345678901234567890,
        "system": "online",
        "version": "2.0.10"
    }]
}"#;

pub const SUBSCRIBED: &str = r#"{
    "method": "subscribe",
    "req_id": 1,
    "result": {"channel": "book", "depth": 10, "snapshot": true, "symbol": "BTC/USD"},
    "success": true,
    "time_in": "2025-12-21T12:28:24.000000Z",
    "time_out": "2025-12-21T12:28:24.001000Z"
}"#;

pub const REJECTED: &str = r#"{
    "method": "subscribe",
    "error": "Currency pair not supported",
    "success": false,
    "time_in": "2025-12-21T12:28:24.000000Z",
    "time_out": "2025-12-21T12:28:24.001000Z"
}"#;

/// Asks 101 x1, 102 x2, 103 x4; bids 100 x3, 99 x1, 98.5 x2
pub const SNAPSHOT: &str = r#"{
    "channel": "book",
    "type": "snapshot",
    "data": [{
        "symbol": "BTC/USD",
        "bids": [
            {"price": 100.0, "qty": 3.0},
            {"price": 99.0, "qty": 1.0},
            {"price": 98.5, "qty": 2.0}
        ],
        "asks": [
            {"price": 101.0, "qty": 1.0},
            {"price": 102.0, "qty": 2.0},
            {"price": 103.0, "qty": 4.0}
        ],
        "checksum": 3310070434
    }]
}"#;

/// Removes the best ask and adds a bid at 100.5
pub const UPDATE: &str = r#"{
    "channel": "book",
    "type": "update",
    "data": [{
        "symbol": "BTC/USD",
        "bids": [{"price": 100.5, "qty": 0.5}],
        "asks": [{"price": 101.0, "qty": 0}],
        "checksum": 1917310217,
        "timestamp": "2025-12-21T12:28:25.123456Z"
    }]
}"#;

/// Book update for another pair on the same connection
pub const OTHER_SYMBOL: &str = r#"{
    "channel": "book",
    "type": "update",
    "data": [{
        "symbol": "ETH/USD",
        "bids": [{"price": 3000.0, "qty": 10.0}],
        "asks": [{"price": 3001.0, "qty": 10.0}],
        "checksum": 1
    }]
}"#;

pub const ETH_SNAPSHOT: &str = r#"{
    "channel": "book",
    "type": "snapshot",
    "data": [{
        "symbol": "ETH/USD",
        "bids": [{"price": 3000.0, "qty": 10.0}],
        "asks": [{"price": 3001.0, "qty": 5.0}],
        "checksum": 2
    }]
}"#;

/// Hands out a fresh mock per connection and keeps every controller
#[derive(Clone, Default)]
pub struct MockFactory {
    controllers: Arc<Mutex<Vec<MockController>>>,
}

impl MockFactory {
    pub fn install(&self, config: Config) -> DepthEngine {
        let controllers = Arc::clone(&self.controllers);
        DepthEngine::builder(config)
            .with_transport(move |endpoint: &Endpoint| -> Box<dyn Transport> {
                let (transport, controller) = MockTransport::new(endpoint.url());
                controllers.lock().push(controller);
                Box::new(transport)
            })
            .build()
            .expect("valid config")
    }

    /// Controller of the most recent connection
    pub fn latest(&self) -> MockController {
        self.controllers.lock().last().cloned().expect("no connection yet")
    }

    pub fn nth(&self, index: usize) -> MockController {
        self.controllers.lock()[index].clone()
    }

    pub fn connections(&self) -> usize {
        self.controllers.lock().len()
    }
}

/// Collects values handed to a listener
#[derive(Clone)]
pub struct Recorder<T> {
    seen: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub fn new() -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn sink(&self) -> impl Fn(T) + Send + Sync + 'static {
        let seen = Arc::clone(&self.seen);
        move |value| seen.lock().push(value)
    }

    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.seen.lock())
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }
}

/// Engine config with shaping off so views arrive synchronously
pub fn unshaped() -> Config {
    Config::default().with_throttle_ms(0).with_debounce_ms(0)
}

/// Let spawned tasks run; the paused clock auto-advances while idle
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
