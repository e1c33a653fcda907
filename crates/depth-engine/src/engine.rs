//! The depth engine
//!
//! [`DepthEngine`] composes the feed session, both price ledgers, the update
//! pipeline, the history buffer, the config state and the status machine.
//! It is the only type a UI needs.
//!
//! All mutable state sits behind one lock. Feed events, config changes and
//! pipeline emissions each run to completion under it; listeners are called
//! once it has been released, so a listener may call back into the engine.

use crate::bus::{EventBus, ListenerHandle};
use crate::config::{Config, ConfigError, ConfigEvent, ConfigState, ConfigUpdate, ReconnectSettings};
use crate::logging::LogHandle;
use crate::pipeline::UpdatePipeline;
use crate::status::{ConnectionStatus, Phase, StatusEvent, StatusMachine};
use depth_book::{ComputedView, HistoryBuffer, PriceLedger, ViewParams};
use depth_feed::{
    BookSignal, Endpoint, FeedEvent, FeedHandle, FeedSession, ReconnectPolicy, Subscription,
    Transport, WsTransport,
};
use depth_types::{Depth, DepthError, DepthResult, Symbol, SystemStatus};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Creates the transport for each connection
pub type TransportFactory = Arc<dyn Fn(&Endpoint) -> Box<dyn Transport> + Send + Sync>;

/// Data notifications
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// View that passed the update pipeline
    Data(Arc<ComputedView>),
    /// Full history after a view was recorded
    History(Vec<Arc<ComputedView>>),
    /// View recomputed after a book change, before rate-shaping
    RawData(Arc<ComputedView>),
}

/// Builder for [`DepthEngine`]
pub struct DepthEngineBuilder {
    config: Config,
    endpoint: Endpoint,
    transport: Option<TransportFactory>,
    log: Option<LogHandle>,
}

impl DepthEngineBuilder {
    /// Start from `config`
    pub fn new(config: Config) -> Self {
        Self {
            config,
            endpoint: Endpoint::Public,
            transport: None,
            log: None,
        }
    }

    /// Connect somewhere other than the production endpoint
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Replace the WebSocket transport, e.g. with a mock
    pub fn with_transport(
        mut self,
        factory: impl Fn(&Endpoint) -> Box<dyn Transport> + Send + Sync + 'static,
    ) -> Self {
        let factory: TransportFactory = Arc::new(factory);
        self.transport = Some(factory);
        self
    }

    /// Let the `debug` config field drive log verbosity
    pub fn with_log_handle(mut self, handle: LogHandle) -> Self {
        self.log = Some(handle);
        self
    }

    /// Validate the config and build the engine
    pub fn build(self) -> Result<DepthEngine, ConfigError> {
        let config = ConfigState::new(self.config)?;
        let status = StatusMachine::new();
        let config_bus = config.bus().clone();
        let status_bus = status.bus().clone();
        let transport: TransportFactory = match self.transport {
            Some(factory) => factory,
            None => Arc::new(|endpoint: &Endpoint| -> Box<dyn Transport> {
                Box::new(WsTransport::new(endpoint.url()))
            }),
        };

        if let Some(log) = &self.log {
            if let Err(e) = log.set_debug(config.config().debug) {
                warn!("Failed to apply log verbosity: {}", e);
            }
        }

        let shared = Arc::new_cyclic(|weak: &Weak<Shared>| {
            let pipeline = make_pipeline(weak.clone(), config.config());
            let history = HistoryBuffer::new(config.config().max_history_length);
            Shared {
                state: Mutex::new(State {
                    config,
                    status,
                    asks: PriceLedger::new(),
                    bids: PriceLedger::new(),
                    last_checksum: None,
                    current: Arc::new(ComputedView::empty(now_millis())),
                    history,
                    pipeline,
                    session: None,
                    generation: 0,
                    exchange_status: None,
                    last_error: None,
                    destroyed: false,
                }),
                config_bus,
                status_bus,
                events: EventBus::new(),
                endpoint: self.endpoint,
                transport,
                log: self.log,
            }
        });

        Ok(DepthEngine { shared })
    }
}

/// Real-time, depth-limited, price-grouped order book for one symbol
///
/// # Example
///
/// ```no_run
/// use depth_engine::{Config, DepthEngine};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let engine = DepthEngine::new(Config::default().with_symbol("ETH/USD")?)?;
///
///     let _updates = engine.on_data_update(|view| {
///         println!("spread {} over {} ask rows", view.spread, view.asks.len());
///     });
///     engine.connect()?;
///
///     tokio::time::sleep(std::time::Duration::from_secs(10)).await;
///     engine.destroy();
///     Ok(())
/// }
/// ```
pub struct DepthEngine {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<State>,
    config_bus: EventBus<ConfigEvent>,
    status_bus: EventBus<StatusEvent>,
    events: EventBus<EngineEvent>,
    endpoint: Endpoint,
    transport: TransportFactory,
    log: Option<LogHandle>,
}

struct State {
    config: ConfigState,
    status: StatusMachine,
    asks: PriceLedger,
    bids: PriceLedger,
    last_checksum: Option<u32>,
    current: Arc<ComputedView>,
    history: HistoryBuffer,
    pipeline: UpdatePipeline<Arc<ComputedView>>,
    session: Option<ActiveSession>,
    // Bumped whenever a session is started or abandoned; events tagged with
    // an older value are dropped.
    generation: u64,
    exchange_status: Option<SystemStatus>,
    last_error: Option<DepthError>,
    destroyed: bool,
}

struct ActiveSession {
    handle: FeedHandle,
    pump: JoinHandle<()>,
}

impl ActiveSession {
    fn stop(self) {
        self.handle.close();
        self.pump.abort();
    }
}

/// Notifications gathered under the lock, delivered after it
#[derive(Default)]
struct Outbox {
    config: Option<ConfigUpdate>,
    status: Vec<StatusEvent>,
    raw: Option<Arc<ComputedView>>,
    push: Option<UpdatePipeline<Arc<ComputedView>>>,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn make_pipeline(shared: Weak<Shared>, config: &Config) -> UpdatePipeline<Arc<ComputedView>> {
    UpdatePipeline::from_millis(config.throttle_ms, config.debounce_ms, move |view| {
        if let Some(shared) = shared.upgrade() {
            shared.record(view);
        }
    })
}

impl State {
    fn apply(&mut self, signal: BookSignal) {
        let data = match signal {
            BookSignal::Snapshot(data) => {
                self.asks.clear();
                self.bids.clear();
                data
            }
            BookSignal::Update(data) => data,
        };
        self.asks.batch_update(&data.asks);
        self.bids.batch_update(&data.bids);
        self.last_checksum = data.checksum;
    }

    fn recompute(&mut self) -> Arc<ComputedView> {
        let config = self.config.config();
        let params = ViewParams {
            limit: config.depth.as_u32() as usize,
            grouping: config.spread_grouping,
        };
        let view = Arc::new(ComputedView::compute(
            &self.asks,
            &self.bids,
            params,
            self.last_checksum,
            now_millis(),
        ));
        self.current = Arc::clone(&view);
        view
    }

    fn has_book(&self) -> bool {
        !(self.asks.is_empty() && self.bids.is_empty())
    }

    fn clear_book(&mut self) {
        self.asks.clear();
        self.bids.clear();
        self.last_checksum = None;
        self.current = Arc::new(ComputedView::empty(now_millis()));
    }

    fn is_live(&self) -> bool {
        self.session.is_some()
            && matches!(
                self.status.phase(),
                Phase::Connecting | Phase::Connected | Phase::Reconnecting
            )
    }
}

impl Shared {
    fn deliver(&self, outbox: Outbox) {
        if let Some(update) = &outbox.config {
            update.publish(&self.config_bus);
        }
        for event in &outbox.status {
            self.status_bus.emit(event);
        }
        if let Some(view) = outbox.raw {
            self.events.emit(&EngineEvent::RawData(Arc::clone(&view)));
            if let Some(pipeline) = outbox.push {
                pipeline.push(view);
            }
        }
    }

    /// Pipeline sink: record and publish a shaped view
    fn record(&self, view: Arc<ComputedView>) {
        let history = {
            let mut state = self.state.lock();
            if state.destroyed {
                return;
            }
            if state.config.config().history_enabled {
                state.history.push(Arc::clone(&view));
                Some(state.history.all())
            } else {
                None
            }
        };

        self.events.emit(&EngineEvent::Data(view));
        if let Some(history) = history {
            self.events.emit(&EngineEvent::History(history));
        }
    }

    fn handle_feed(&self, generation: u64, event: FeedEvent) {
        let mut outbox = Outbox::default();
        {
            let mut state = self.state.lock();
            if state.destroyed || state.generation != generation {
                trace!(generation, "Dropping event from superseded session");
                return;
            }

            match event {
                FeedEvent::Connecting => {
                    outbox.status.extend(state.status.set_phase(Phase::Connecting));
                }
                FeedEvent::Opened => {
                    outbox.status.extend(state.status.set_error(None));
                    outbox.status.extend(state.status.set_phase(Phase::Connected));
                }
                FeedEvent::Signal(signal) => {
                    if state.status.is_errored() {
                        debug!("Dropping book message while an error is latched");
                    } else if state.config.config().symbol != *signal.data().symbol.as_str() {
                        debug!(symbol = %signal.data().symbol, "Dropping book message for a previous symbol");
                    } else {
                        state.apply(signal);
                        outbox.raw = Some(state.recompute());
                        outbox.push = Some(state.pipeline.clone());
                    }
                }
                FeedEvent::SystemStatus(status) => {
                    state.exchange_status = Some(status);
                }
                FeedEvent::Subscribed { symbol, depth } => {
                    debug!(?symbol, ?depth, "Subscription confirmed");
                }
                FeedEvent::Disconnected { reason } => {
                    debug!(?reason, "Feed disconnected");
                }
                FeedEvent::Reconnecting { attempt, delay } => {
                    debug!(attempt, ?delay, "Feed reconnecting");
                    outbox.status.extend(state.status.set_phase(Phase::Reconnecting));
                }
                FeedEvent::Error(error) => {
                    state.last_error = Some(error.clone());
                    if error.is_connection_level() {
                        outbox.status.extend(state.status.set_error(Some(error)));
                    } else {
                        outbox.status.push(StatusEvent::Error(error));
                    }
                }
                FeedEvent::Failed(error) => {
                    error!("Feed gave up: {}", error);
                    state.last_error = Some(error.clone());
                    state.session = None;
                    outbox.status.extend(state.status.set_phase(Phase::Disconnected));
                    outbox.status.extend(state.status.set_error(Some(error)));
                }
                FeedEvent::Closed => {
                    state.session = None;
                }
            }
        }
        self.deliver(outbox);
    }
}

async fn forward_events(shared: Weak<Shared>, generation: u64, mut events: UnboundedReceiver<FeedEvent>) {
    while let Some(event) = events.recv().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        shared.handle_feed(generation, event);
    }
}

impl DepthEngine {
    /// Build an engine with the default WebSocket transport
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        Self::builder(config).build()
    }

    /// Start a builder
    pub fn builder(config: Config) -> DepthEngineBuilder {
        DepthEngineBuilder::new(config)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Open a connection and subscribe to the configured symbol
    ///
    /// An existing session is closed first. Must be called inside a tokio
    /// runtime.
    pub fn connect(&self) -> DepthResult<()> {
        let runtime = Handle::try_current().map_err(|_| {
            DepthError::Configuration("connect() must be called inside a tokio runtime".into())
        })?;

        let mut outbox = Outbox::default();
        {
            let mut state = self.shared.state.lock();
            if state.destroyed {
                return Err(DepthError::Destroyed);
            }

            let config = state.config.config();
            if config.symbol.base().is_empty() || config.symbol.quote().is_empty() {
                return Err(DepthError::subscription(format!(
                    "no symbol to subscribe to: {:?}",
                    config.symbol.as_str()
                )));
            }
            let subscription = Subscription::new(config.symbol.clone(), config.depth);
            let policy = ReconnectPolicy::from(config.reconnect);

            if let Some(previous) = state.session.take() {
                debug!("Closing previous session");
                previous.stop();
            }
            state.generation += 1;
            let generation = state.generation;
            outbox.status.extend(state.status.set_phase(Phase::Connecting));

            info!(symbol = %subscription.symbol, depth = %subscription.depth, "Connecting");
            let transport = (self.shared.transport)(&self.shared.endpoint);
            let (handle, events) = FeedSession::spawn(transport, subscription, policy);
            let pump = runtime.spawn(forward_events(Arc::downgrade(&self.shared), generation, events));
            state.session = Some(ActiveSession { handle, pump });
        }
        self.shared.deliver(outbox);
        Ok(())
    }

    /// Unsubscribe and close the connection
    ///
    /// The status becomes `Disconnected` unless an error is latched.
    pub fn disconnect(&self) {
        let mut outbox = Outbox::default();
        {
            let mut state = self.shared.state.lock();
            if state.destroyed {
                return;
            }
            if let Some(session) = state.session.take() {
                info!("Disconnecting");
                session.stop();
                state.generation += 1;
            }
            outbox.status.extend(state.status.set_phase(Phase::Disconnected));
        }
        self.shared.deliver(outbox);
    }

    /// Stop everything and detach every listener
    ///
    /// Pending pipeline values are dropped without emitting. Afterwards
    /// `connect` and the setters return [`DepthError::Destroyed`].
    pub fn destroy(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.pipeline.destroy();
            state.clear_book();
            state.history.clear();
            if let Some(session) = state.session.take() {
                session.stop();
            }
            state.generation += 1;
        }
        self.shared.config_bus.clear();
        self.shared.status_bus.clear();
        self.shared.events.clear();
        info!("Engine destroyed");
    }

    /// Check if `destroy` was called
    pub fn is_destroyed(&self) -> bool {
        self.shared.state.lock().destroyed
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Most recently computed view
    pub fn current_data(&self) -> Arc<ComputedView> {
        Arc::clone(&self.shared.state.lock().current)
    }

    /// Recorded views, oldest first
    pub fn history(&self) -> Vec<Arc<ComputedView>> {
        self.shared.state.lock().history.all()
    }

    /// Observed connection status
    pub fn status(&self) -> ConnectionStatus {
        self.shared.state.lock().status.status()
    }

    /// Most recently raised error, latched or not
    pub fn last_error(&self) -> Option<DepthError> {
        self.shared.state.lock().last_error.clone()
    }

    /// Trading status last reported by the exchange
    pub fn exchange_status(&self) -> Option<SystemStatus> {
        self.shared.state.lock().exchange_status
    }

    /// Full configuration
    pub fn config(&self) -> Config {
        self.shared.state.lock().config.config().clone()
    }

    /// Grouping steps offered for the current tick size
    pub fn grouping_options(&self) -> Vec<Decimal> {
        self.shared.state.lock().config.grouping_options().to_vec()
    }

    fn read<R>(&self, f: impl FnOnce(&Config) -> R) -> R {
        f(self.shared.state.lock().config.config())
    }

    // ========================================================================
    // Config getters
    // ========================================================================

    pub fn symbol(&self) -> Symbol {
        self.read(|c| c.symbol.clone())
    }

    pub fn limit(&self) -> u32 {
        self.read(|c| c.limit)
    }

    pub fn depth(&self) -> Depth {
        self.read(|c| c.depth)
    }

    pub fn tick_size(&self) -> Decimal {
        self.read(|c| c.tick_size)
    }

    pub fn spread_grouping(&self) -> Decimal {
        self.read(|c| c.spread_grouping)
    }

    pub fn history_enabled(&self) -> bool {
        self.read(|c| c.history_enabled)
    }

    pub fn max_history_length(&self) -> usize {
        self.read(|c| c.max_history_length)
    }

    pub fn throttle_ms(&self) -> u64 {
        self.read(|c| c.throttle_ms)
    }

    pub fn debounce_ms(&self) -> u64 {
        self.read(|c| c.debounce_ms)
    }

    pub fn reconnect(&self) -> ReconnectSettings {
        self.read(|c| c.reconnect)
    }

    pub fn debug(&self) -> bool {
        self.read(|c| c.debug)
    }

    // ========================================================================
    // Config setters
    // ========================================================================

    /// Switch to another trading pair; clears the book and history
    pub fn set_symbol(&self, symbol: &str) -> DepthResult<()> {
        let symbol: Symbol = symbol.parse().map_err(ConfigError::from)?;
        self.update_config(|c| c.set_symbol(symbol))
    }

    /// Change the visible rows; may raise the depth tier
    pub fn set_limit(&self, limit: u32) -> DepthResult<()> {
        self.update_config(|c| c.set_limit(limit))
    }

    /// Change the subscription depth tier
    pub fn set_depth(&self, depth: Depth) -> DepthResult<()> {
        self.update_config(|c| c.set_depth(depth))
    }

    /// Change the tick size; may raise the grouping step
    pub fn set_tick_size(&self, tick_size: Decimal) -> DepthResult<()> {
        self.update_config(|c| c.set_tick_size(tick_size))
    }

    /// Change the grouping step
    pub fn set_spread_grouping(&self, grouping: Decimal) -> DepthResult<()> {
        self.update_config(|c| c.set_spread_grouping(grouping))
    }

    pub fn set_history_enabled(&self, enabled: bool) -> DepthResult<()> {
        self.update_config(|c| c.set_history_enabled(enabled))
    }

    pub fn set_max_history_length(&self, length: usize) -> DepthResult<()> {
        self.update_config(|c| c.set_max_history_length(length))
    }

    pub fn set_throttle_ms(&self, ms: u64) -> DepthResult<()> {
        self.update_config(|c| c.set_throttle_ms(ms))
    }

    pub fn set_debounce_ms(&self, ms: u64) -> DepthResult<()> {
        self.update_config(|c| c.set_debounce_ms(ms))
    }

    /// Change reconnection settings for the next connection
    pub fn set_reconnect(&self, reconnect: ReconnectSettings) -> DepthResult<()> {
        self.update_config(|c| c.set_reconnect(reconnect))
    }

    pub fn set_debug(&self, debug: bool) -> DepthResult<()> {
        self.update_config(|c| c.set_debug(debug))
    }

    fn update_config(
        &self,
        apply: impl FnOnce(&mut ConfigState) -> Result<ConfigUpdate, ConfigError>,
    ) -> DepthResult<()> {
        let mut outbox = Outbox::default();
        let reconnect = {
            let mut state = self.shared.state.lock();
            if state.destroyed {
                return Err(DepthError::Destroyed);
            }
            let update = apply(&mut state.config)?;
            if update.is_noop() {
                return Ok(());
            }

            let effects = update.effects;
            if effects.clear_book {
                state.clear_book();
            }
            if effects.clear_history {
                state.history.clear();
            }
            if let Some(length) = effects.resize_history {
                state.history.set_max_length(length);
            }
            if effects.rebuild_pipeline {
                state.pipeline.destroy();
                state.pipeline = make_pipeline(Arc::downgrade(&self.shared), state.config.config());
            }
            if effects.recompute && state.has_book() {
                outbox.raw = Some(state.recompute());
                outbox.push = Some(state.pipeline.clone());
            }
            if let (Some(debug), Some(log)) = (effects.set_verbosity, &self.shared.log) {
                if let Err(e) = log.set_debug(debug) {
                    warn!("Failed to switch log verbosity: {}", e);
                }
            }

            let reconnect = effects.reconnect && state.is_live();
            if reconnect {
                // Abandon the old session before the lock is released so none
                // of its events land in the cleared book.
                if let Some(previous) = state.session.take() {
                    previous.stop();
                }
                state.generation += 1;
            }

            outbox.config = Some(update);
            reconnect
        };

        self.shared.deliver(outbox);
        if reconnect {
            info!("Resubscribing after config change");
            self.connect()?;
        }
        Ok(())
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Called with every view that passed the update pipeline
    pub fn on_data_update(
        &self,
        listener: impl Fn(&Arc<ComputedView>) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.shared.events.subscribe(move |event| {
            if let EngineEvent::Data(view) = event {
                listener(view);
            }
        })
    }

    /// Called with the full history each time a view is recorded
    pub fn on_history_update(
        &self,
        listener: impl Fn(&[Arc<ComputedView>]) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.shared.events.subscribe(move |event| {
            if let EngineEvent::History(history) = event {
                listener(history);
            }
        })
    }

    /// Called with every recomputed view, before rate-shaping
    pub fn on_raw_data_update(
        &self,
        listener: impl Fn(&Arc<ComputedView>) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.shared.events.subscribe(move |event| {
            if let EngineEvent::RawData(view) = event {
                listener(view);
            }
        })
    }

    /// Called when the observed status changes
    pub fn on_status_update(
        &self,
        listener: impl Fn(ConnectionStatus) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.shared.status_bus.subscribe(move |event| {
            if let StatusEvent::Status(status) = event {
                listener(*status);
            }
        })
    }

    /// Called with every config event
    pub fn on_config_update(
        &self,
        listener: impl Fn(&ConfigEvent) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.shared.config_bus.subscribe(listener)
    }

    /// Called with every error, latched or not
    pub fn on_error(&self, listener: impl Fn(&DepthError) + Send + Sync + 'static) -> ListenerHandle {
        self.shared.status_bus.subscribe(move |event| {
            if let StatusEvent::Error(error) = event {
                listener(error);
            }
        })
    }
}

impl Drop for DepthEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for DepthEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("DepthEngine")
            .field("symbol", &state.config.config().symbol)
            .field("status", &state.status.status())
            .field("generation", &state.generation)
            .field("destroyed", &state.destroyed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_build_rejects_invalid_config() {
        let err = DepthEngine::new(Config::default().with_limit(0)).unwrap_err();
        assert_eq!(err, ConfigError::LimitOutOfRange { limit: 0 });

        let config = Config {
            spread_grouping: dec!(0.01),
            ..Config::default()
        };
        assert!(matches!(
            DepthEngine::new(config),
            Err(ConfigError::GroupingBelowTick { .. })
        ));
    }

    #[test]
    fn test_connect_requires_runtime() {
        let engine = DepthEngine::new(Config::default()).unwrap();
        assert!(matches!(engine.connect(), Err(DepthError::Configuration(_))));
        assert_eq!(engine.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_getters_reflect_config() {
        let config = Config::default().with_limit(30).with_throttle_ms(0);
        let engine = DepthEngine::new(config.clone()).unwrap();

        assert_eq!(engine.config(), config);
        assert_eq!(engine.limit(), 30);
        assert_eq!(engine.depth(), Depth::D100);
        assert_eq!(engine.throttle_ms(), 0);
        assert_eq!(engine.grouping_options()[0], engine.tick_size());
        assert!(engine.current_data().is_empty());
        assert!(engine.last_error().is_none());
    }

    #[test]
    fn test_setters_apply_without_runtime() {
        let engine = DepthEngine::new(Config::default()).unwrap();
        engine.set_tick_size(dec!(1)).unwrap();
        assert_eq!(engine.spread_grouping(), dec!(1));
        engine.set_max_history_length(3).unwrap();
        assert_eq!(engine.max_history_length(), 3);
        assert!(matches!(
            engine.set_spread_grouping(dec!(0.5)),
            Err(DepthError::Configuration(_))
        ));
    }

    fn book(symbol: &str) -> depth_types::BookData {
        depth_types::BookData {
            symbol: symbol.into(),
            bids: vec![depth_types::Level::new(dec!(100), dec!(1))],
            asks: vec![depth_types::Level::new(dec!(101), dec!(1))],
            checksum: None,
            timestamp: None,
        }
    }

    #[test]
    fn test_book_for_previous_symbol_is_dropped() {
        let engine = DepthEngine::new(Config::default().with_throttle_ms(0)).unwrap();
        let generation = engine.shared.state.lock().generation;

        engine
            .shared
            .handle_feed(generation, FeedEvent::Signal(BookSignal::Snapshot(book("ETH/USD"))));
        assert!(engine.current_data().is_empty());

        engine
            .shared
            .handle_feed(generation, FeedEvent::Signal(BookSignal::Snapshot(book("BTC/USD"))));
        assert_eq!(engine.current_data().spread, dec!(1));
    }

    #[test]
    fn test_stale_generation_is_dropped() {
        let engine = DepthEngine::new(Config::default().with_throttle_ms(0)).unwrap();
        let generation = engine.shared.state.lock().generation;

        engine
            .shared
            .handle_feed(generation + 1, FeedEvent::Signal(BookSignal::Snapshot(book("BTC/USD"))));
        assert!(engine.current_data().is_empty());
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let engine = DepthEngine::new(Config::default()).unwrap();
        let _status = engine.on_status_update(|_| {});
        engine.destroy();
        engine.destroy();
        assert!(engine.is_destroyed());
        assert!(engine.shared.status_bus.is_empty());
        assert_eq!(engine.set_debug(true), Err(DepthError::Destroyed));
        assert!(format!("{engine:?}").contains("destroyed: true"));
    }
}
