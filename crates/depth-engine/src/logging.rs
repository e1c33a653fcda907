//! Log output with runtime-switchable verbosity
//!
//! [`init`] installs a `tracing-subscriber` registry whose [`EnvFilter`] sits
//! behind a reload layer. The returned [`LogHandle`] flips that filter
//! between the quiet directive (`RUST_LOG`, or `info`) and `debug`; the
//! engine does this whenever the `debug` config field changes.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

const QUIET: &str = "info";
const VERBOSE: &str = "debug";

/// Logging setup failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoggingError {
    /// A global subscriber is already installed
    #[error("failed to install subscriber: {0}")]
    Init(String),

    /// Filter directive rejected
    #[error("invalid filter directive: {0}")]
    Directive(String),

    /// Subscriber is gone
    #[error("failed to reload filter: {0}")]
    Reload(String),
}

/// Handle to the installed filter
#[derive(Debug, Clone)]
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    quiet: String,
}

impl LogHandle {
    /// Switch between the quiet directive and `debug`
    pub fn set_debug(&self, debug: bool) -> Result<(), LoggingError> {
        let directive = if debug { VERBOSE } else { self.quiet.as_str() };
        let filter = EnvFilter::try_new(directive).map_err(|e| LoggingError::Directive(e.to_string()))?;
        self.filter
            .reload(filter)
            .map_err(|e| LoggingError::Reload(e.to_string()))
    }
}

/// Install the global subscriber
///
/// Fails if another global subscriber is already set.
pub fn init(debug: bool) -> Result<LogHandle, LoggingError> {
    let quiet = std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| QUIET.to_string());
    let directive = if debug { VERBOSE } else { quiet.as_str() };
    let filter = EnvFilter::try_new(directive).map_err(|e| LoggingError::Directive(e.to_string()))?;

    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(LogHandle {
        filter: handle,
        quiet,
    })
}
