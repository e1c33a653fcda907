//! Engine configuration and its validated, observable state
//!
//! [`Config`] is the plain value: serde-(de)serialisable, with defaults and
//! fluent `with_*` builders. [`ConfigState`] wraps one `Config` for the
//! lifetime of an engine. Its setters validate, update the value, and hand
//! back a [`ConfigUpdate`]: the events to publish and the [`ConfigEffects`]
//! the engine must apply. Setting a field to its current value is a no-op.
//!
//! # Example
//!
//! ```
//! use depth_engine::config::{Config, ConfigState};
//! use depth_types::Depth;
//!
//! let mut state = ConfigState::new(Config::default()).unwrap();
//! let update = state.set_limit(50).unwrap();
//! assert_eq!(state.config().depth, Depth::D100);
//! assert!(update.effects.reconnect);
//! ```

use crate::bus::EventBus;
use depth_feed::ReconnectPolicy;
use depth_types::{Depth, DepthError, Symbol, SymbolParseError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest number of visible rows
pub const MAX_LIMIT: u32 = 1000;

/// Configuration validation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Symbol is not `BASE/QUOTE`
    #[error("invalid symbol: {0}")]
    InvalidSymbol(#[from] SymbolParseError),

    /// Row limit outside 1..=1000
    #[error("limit must be between 1 and 1000, got {limit}")]
    LimitOutOfRange { limit: u32 },

    /// Depth tier cannot serve the row limit
    #[error("depth {depth} is below the {required} required for limit {limit}")]
    DepthBelowLimit {
        depth: Depth,
        required: Depth,
        limit: u32,
    },

    /// Tick size must be positive
    #[error("tick size must be positive, got {tick_size}")]
    InvalidTickSize { tick_size: Decimal },

    /// Grouping step finer than the tick
    #[error("spread grouping {grouping} is below tick size {tick_size}")]
    GroupingBelowTick { grouping: Decimal, tick_size: Decimal },

    /// History must keep at least one view
    #[error("max history length must be at least 1")]
    InvalidHistoryLength,

    /// Enabled reconnection needs a delay
    #[error("reconnect delay must be at least 1ms when reconnection is enabled")]
    InvalidReconnectDelay,

    /// Document could not be parsed
    #[error("invalid configuration document: {0}")]
    Parse(String),
}

impl From<ConfigError> for DepthError {
    fn from(err: ConfigError) -> Self {
        DepthError::Configuration(err.to_string())
    }
}

/// Reconnection settings as configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    /// Retry lost or failed connections
    pub enabled: bool,
    /// Consecutive attempts before giving up (0 = unlimited)
    pub max_attempts: u32,
    /// Delay before each attempt, in milliseconds
    pub delay_ms: u64,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        let policy = ReconnectPolicy::default();
        Self {
            enabled: policy.enabled,
            max_attempts: policy.max_attempts,
            delay_ms: policy.delay.as_millis() as u64,
        }
    }
}

impl From<ReconnectSettings> for ReconnectPolicy {
    fn from(settings: ReconnectSettings) -> Self {
        Self {
            enabled: settings.enabled,
            max_attempts: settings.max_attempts,
            delay: Duration::from_millis(settings.delay_ms),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Trading pair
    pub symbol: Symbol,
    /// Visible rows per side
    pub limit: u32,
    /// Subscription depth tier (never below the tier `limit` needs)
    pub depth: Depth,
    /// Minimum price increment of the pair
    pub tick_size: Decimal,
    /// Price grouping step (never below `tick_size`)
    pub spread_grouping: Decimal,
    /// Record emitted views
    pub history_enabled: bool,
    /// Views kept in history
    pub max_history_length: usize,
    /// Throttle delay (0 = disabled)
    pub throttle_ms: u64,
    /// Debounce delay (0 = disabled)
    pub debounce_ms: u64,
    /// Reconnection policy
    pub reconnect: ReconnectSettings,
    /// Verbose logging
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbol: Symbol::default(),
            limit: 10,
            depth: Depth::D10,
            tick_size: Decimal::new(1, 1),
            spread_grouping: Decimal::new(1, 1),
            history_enabled: true,
            max_history_length: depth_book::DEFAULT_HISTORY_LENGTH,
            throttle_ms: 100,
            debounce_ms: 0,
            reconnect: ReconnectSettings::default(),
            debug: false,
        }
    }
}

impl Config {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON document; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the trading pair
    pub fn with_symbol(mut self, symbol: &str) -> Result<Self, ConfigError> {
        self.symbol = symbol.parse()?;
        Ok(self)
    }

    /// Set the row limit, raising the depth tier if needed
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        if let Some(required) = Depth::for_limit(limit) {
            self.depth = self.depth.max(required);
        }
        self
    }

    /// Set the depth tier
    pub fn with_depth(mut self, depth: Depth) -> Self {
        self.depth = depth;
        self
    }

    /// Set the tick size, raising the grouping step if needed
    pub fn with_tick_size(mut self, tick_size: Decimal) -> Self {
        self.tick_size = tick_size;
        self.spread_grouping = self.spread_grouping.max(tick_size);
        self
    }

    /// Set the grouping step
    pub fn with_spread_grouping(mut self, grouping: Decimal) -> Self {
        self.spread_grouping = grouping;
        self
    }

    /// Enable or disable history
    pub fn with_history(mut self, enabled: bool, max_length: usize) -> Self {
        self.history_enabled = enabled;
        self.max_history_length = max_length;
        self
    }

    /// Set throttle delay in milliseconds (0 disables)
    pub fn with_throttle_ms(mut self, ms: u64) -> Self {
        self.throttle_ms = ms;
        self
    }

    /// Set debounce delay in milliseconds (0 disables)
    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Set reconnection settings
    pub fn with_reconnect(mut self, reconnect: ReconnectSettings) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Disable reconnection
    pub fn without_reconnect(mut self) -> Self {
        self.reconnect.enabled = false;
        self
    }

    /// Enable verbose logging
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Validate every field
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = required_depth(self.limit)?;
        if self.depth < required {
            return Err(ConfigError::DepthBelowLimit {
                depth: self.depth,
                required,
                limit: self.limit,
            });
        }
        check_tick_size(self.tick_size)?;
        check_grouping(self.spread_grouping, self.tick_size)?;
        if self.max_history_length == 0 {
            return Err(ConfigError::InvalidHistoryLength);
        }
        check_reconnect(&self.reconnect)
    }
}

fn required_depth(limit: u32) -> Result<Depth, ConfigError> {
    if limit == 0 || limit > MAX_LIMIT {
        return Err(ConfigError::LimitOutOfRange { limit });
    }
    Depth::for_limit(limit).ok_or(ConfigError::LimitOutOfRange { limit })
}

fn check_tick_size(tick_size: Decimal) -> Result<(), ConfigError> {
    if tick_size <= Decimal::ZERO {
        return Err(ConfigError::InvalidTickSize { tick_size });
    }
    Ok(())
}

fn check_grouping(grouping: Decimal, tick_size: Decimal) -> Result<(), ConfigError> {
    if grouping < tick_size {
        return Err(ConfigError::GroupingBelowTick {
            grouping,
            tick_size,
        });
    }
    Ok(())
}

fn check_reconnect(reconnect: &ReconnectSettings) -> Result<(), ConfigError> {
    if reconnect.enabled && reconnect.delay_ms == 0 {
        return Err(ConfigError::InvalidReconnectDelay);
    }
    Ok(())
}

/// Grouping steps offered for a tick size
///
/// Steps follow a 1, 2.5, 5 progression over four decades starting at the
/// tick's order of magnitude. Steps finer than the tick are dropped and the
/// tick itself always comes first.
pub fn grouping_options(tick_size: Decimal) -> Vec<Decimal> {
    if tick_size <= Decimal::ZERO {
        return Vec::new();
    }
    let tick = tick_size.normalize();

    let ten = Decimal::TEN;
    let mut magnitude = Decimal::ONE;
    while magnitude > tick {
        magnitude /= ten;
    }
    while let Some(next) = magnitude.checked_mul(ten).filter(|next| *next <= tick) {
        magnitude = next;
    }

    let multipliers = [Decimal::ONE, Decimal::new(25, 1), Decimal::new(5, 0)];
    let mut options = Vec::with_capacity(13);
    let mut decade = magnitude;
    for _ in 0..4 {
        for m in multipliers {
            if let Some(step) = decade.checked_mul(m) {
                let step = step.normalize();
                if step >= tick {
                    options.push(step);
                }
            }
        }
        match decade.checked_mul(ten) {
            Some(next) => decade = next,
            None => break,
        }
    }

    if options.first() != Some(&tick) {
        options.insert(0, tick);
    }
    options
}

/// Per-field change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigEvent {
    Symbol(Symbol),
    Limit(u32),
    Depth(Depth),
    TickSize(Decimal),
    GroupingOptions(Vec<Decimal>),
    SpreadGrouping(Decimal),
    HistoryEnabled(bool),
    MaxHistoryLength(usize),
    ThrottleMs(u64),
    DebounceMs(u64),
    Reconnect(ReconnectSettings),
    Debug(bool),
    /// Raised once after the field events of every successful change
    Changed(Config),
}

/// Follow-up work a config change requires from the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigEffects {
    /// Empty both ledgers
    pub clear_book: bool,
    /// Empty the history buffer
    pub clear_history: bool,
    /// Resubscribe if a connection is open or opening
    pub reconnect: bool,
    /// Recreate the update pipeline with the new delays
    pub rebuild_pipeline: bool,
    /// Recompute the view from the current ledgers
    pub recompute: bool,
    /// Apply a new history bound
    pub resize_history: Option<usize>,
    /// Switch log verbosity
    pub set_verbosity: Option<bool>,
}

/// Outcome of a setter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    /// Events to publish, in order
    pub events: Vec<ConfigEvent>,
    /// Work for the engine
    pub effects: ConfigEffects,
}

impl ConfigUpdate {
    /// Check if the setter changed nothing
    pub fn is_noop(&self) -> bool {
        self.events.is_empty()
    }

    /// Deliver the events on `bus`
    pub fn publish(&self, bus: &EventBus<ConfigEvent>) {
        for event in &self.events {
            bus.emit(event);
        }
    }
}

/// Validated configuration owned by an engine
#[derive(Debug)]
pub struct ConfigState {
    config: Config,
    grouping_options: Vec<Decimal>,
    bus: EventBus<ConfigEvent>,
}

impl ConfigState {
    /// Validate `config` and take ownership of it
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            grouping_options: grouping_options(config.tick_size),
            config,
            bus: EventBus::new(),
        })
    }

    /// Current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Grouping steps for the current tick size
    pub fn grouping_options(&self) -> &[Decimal] {
        &self.grouping_options
    }

    /// Bus the owner publishes [`ConfigUpdate`]s on
    pub fn bus(&self) -> &EventBus<ConfigEvent> {
        &self.bus
    }

    fn commit(&self, mut events: Vec<ConfigEvent>, effects: ConfigEffects) -> ConfigUpdate {
        events.push(ConfigEvent::Changed(self.config.clone()));
        ConfigUpdate { events, effects }
    }

    /// Change the trading pair
    pub fn set_symbol(&mut self, symbol: Symbol) -> Result<ConfigUpdate, ConfigError> {
        if symbol == self.config.symbol {
            return Ok(ConfigUpdate::default());
        }
        self.config.symbol = symbol.clone();
        Ok(self.commit(
            vec![ConfigEvent::Symbol(symbol)],
            ConfigEffects {
                clear_book: true,
                clear_history: true,
                reconnect: true,
                rebuild_pipeline: true,
                ..Default::default()
            },
        ))
    }

    /// Change the row limit; raises the depth tier when it can no longer serve it
    pub fn set_limit(&mut self, limit: u32) -> Result<ConfigUpdate, ConfigError> {
        let required = required_depth(limit)?;
        if limit == self.config.limit {
            return Ok(ConfigUpdate::default());
        }
        self.config.limit = limit;

        let mut events = vec![ConfigEvent::Limit(limit)];
        let mut effects = ConfigEffects::default();
        if self.config.depth < required {
            self.config.depth = required;
            events.push(ConfigEvent::Depth(required));
            effects.reconnect = true;
            effects.recompute = true;
        }
        Ok(self.commit(events, effects))
    }

    /// Change the depth tier
    pub fn set_depth(&mut self, depth: Depth) -> Result<ConfigUpdate, ConfigError> {
        if depth == self.config.depth {
            return Ok(ConfigUpdate::default());
        }
        let required = required_depth(self.config.limit)?;
        if depth < required {
            return Err(ConfigError::DepthBelowLimit {
                depth,
                required,
                limit: self.config.limit,
            });
        }
        self.config.depth = depth;
        Ok(self.commit(
            vec![ConfigEvent::Depth(depth)],
            ConfigEffects {
                reconnect: true,
                recompute: true,
                ..Default::default()
            },
        ))
    }

    /// Change the tick size; regenerates grouping options
    pub fn set_tick_size(&mut self, tick_size: Decimal) -> Result<ConfigUpdate, ConfigError> {
        check_tick_size(tick_size)?;
        if tick_size == self.config.tick_size {
            return Ok(ConfigUpdate::default());
        }
        self.config.tick_size = tick_size;
        self.grouping_options = grouping_options(tick_size);

        let mut events = vec![
            ConfigEvent::TickSize(tick_size),
            ConfigEvent::GroupingOptions(self.grouping_options.clone()),
        ];
        let mut effects = ConfigEffects::default();
        if self.config.spread_grouping < tick_size {
            self.config.spread_grouping = tick_size;
            events.push(ConfigEvent::SpreadGrouping(tick_size));
            effects.recompute = true;
        }
        Ok(self.commit(events, effects))
    }

    /// Change the grouping step
    pub fn set_spread_grouping(&mut self, grouping: Decimal) -> Result<ConfigUpdate, ConfigError> {
        check_grouping(grouping, self.config.tick_size)?;
        if grouping == self.config.spread_grouping {
            return Ok(ConfigUpdate::default());
        }
        self.config.spread_grouping = grouping;
        Ok(self.commit(
            vec![ConfigEvent::SpreadGrouping(grouping)],
            ConfigEffects {
                recompute: true,
                ..Default::default()
            },
        ))
    }

    /// Start or stop recording history
    pub fn set_history_enabled(&mut self, enabled: bool) -> Result<ConfigUpdate, ConfigError> {
        if enabled == self.config.history_enabled {
            return Ok(ConfigUpdate::default());
        }
        self.config.history_enabled = enabled;
        Ok(self.commit(vec![ConfigEvent::HistoryEnabled(enabled)], ConfigEffects::default()))
    }

    /// Change the history bound
    pub fn set_max_history_length(&mut self, length: usize) -> Result<ConfigUpdate, ConfigError> {
        if length == 0 {
            return Err(ConfigError::InvalidHistoryLength);
        }
        if length == self.config.max_history_length {
            return Ok(ConfigUpdate::default());
        }
        self.config.max_history_length = length;
        Ok(self.commit(
            vec![ConfigEvent::MaxHistoryLength(length)],
            ConfigEffects {
                resize_history: Some(length),
                ..Default::default()
            },
        ))
    }

    /// Change the throttle delay
    pub fn set_throttle_ms(&mut self, ms: u64) -> Result<ConfigUpdate, ConfigError> {
        if ms == self.config.throttle_ms {
            return Ok(ConfigUpdate::default());
        }
        self.config.throttle_ms = ms;
        Ok(self.commit(vec![ConfigEvent::ThrottleMs(ms)], rebuild_pipeline()))
    }

    /// Change the debounce delay
    pub fn set_debounce_ms(&mut self, ms: u64) -> Result<ConfigUpdate, ConfigError> {
        if ms == self.config.debounce_ms {
            return Ok(ConfigUpdate::default());
        }
        self.config.debounce_ms = ms;
        Ok(self.commit(vec![ConfigEvent::DebounceMs(ms)], rebuild_pipeline()))
    }

    /// Change reconnection settings; they apply from the next connection
    pub fn set_reconnect(&mut self, reconnect: ReconnectSettings) -> Result<ConfigUpdate, ConfigError> {
        check_reconnect(&reconnect)?;
        if reconnect == self.config.reconnect {
            return Ok(ConfigUpdate::default());
        }
        self.config.reconnect = reconnect;
        Ok(self.commit(vec![ConfigEvent::Reconnect(reconnect)], ConfigEffects::default()))
    }

    /// Toggle verbose logging
    pub fn set_debug(&mut self, debug: bool) -> Result<ConfigUpdate, ConfigError> {
        if debug == self.config.debug {
            return Ok(ConfigUpdate::default());
        }
        self.config.debug = debug;
        Ok(self.commit(
            vec![ConfigEvent::Debug(debug)],
            ConfigEffects {
                set_verbosity: Some(debug),
                ..Default::default()
            },
        ))
    }
}

fn rebuild_pipeline() -> ConfigEffects {
    ConfigEffects {
        rebuild_pipeline: true,
        ..Default::default()
    }
}
