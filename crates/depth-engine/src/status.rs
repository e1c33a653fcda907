//! Connection status with an error overlay
//!
//! The machine tracks the connection [`Phase`] and, separately, whether an
//! error is latched. While an error is latched the observed
//! [`ConnectionStatus`] is `Error`; the phase keeps moving underneath and
//! becomes visible again once the error is cleared.

use crate::bus::EventBus;
use depth_types::DepthError;
use serde::Serialize;
use std::fmt;

/// Connection phase (everything the status can be except `Error`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Status as observed by consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Error,
}

impl From<Phase> for ConnectionStatus {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Disconnected => Self::Disconnected,
            Phase::Connecting => Self::Connecting,
            Phase::Connected => Self::Connected,
            Phase::Reconnecting => Self::Reconnecting,
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Status machine notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// Observed status changed
    Status(ConnectionStatus),
    /// An error was raised (latched or not)
    Error(DepthError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Phase(Phase),
    Errored { cause: DepthError, underlying: Phase },
}

/// Connection lifecycle state machine
#[derive(Debug)]
pub struct StatusMachine {
    state: State,
    bus: EventBus<StatusEvent>,
}

impl Default for StatusMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusMachine {
    /// Start disconnected with no error
    pub fn new() -> Self {
        Self {
            state: State::Phase(Phase::Disconnected),
            bus: EventBus::new(),
        }
    }

    /// Bus the owner publishes returned events on
    pub fn bus(&self) -> &EventBus<StatusEvent> {
        &self.bus
    }

    /// Observed status
    pub fn status(&self) -> ConnectionStatus {
        match &self.state {
            State::Phase(phase) => (*phase).into(),
            State::Errored { .. } => ConnectionStatus::Error,
        }
    }

    /// Phase underneath any latched error
    pub fn phase(&self) -> Phase {
        match &self.state {
            State::Phase(phase) => *phase,
            State::Errored { underlying, .. } => *underlying,
        }
    }

    /// Latched error, if any
    pub fn error(&self) -> Option<&DepthError> {
        match &self.state {
            State::Phase(_) => None,
            State::Errored { cause, .. } => Some(cause),
        }
    }

    /// Check if an error is latched
    pub fn is_errored(&self) -> bool {
        matches!(self.state, State::Errored { .. })
    }

    /// Move to `phase`
    ///
    /// Returns the status event to raise, if the observed status changed.
    pub fn set_phase(&mut self, phase: Phase) -> Option<StatusEvent> {
        match &mut self.state {
            State::Phase(current) if *current == phase => None,
            State::Phase(current) => {
                *current = phase;
                Some(StatusEvent::Status(phase.into()))
            }
            State::Errored { underlying, .. } => {
                *underlying = phase;
                None
            }
        }
    }

    /// Latch `Some(cause)` or clear with `None`
    ///
    /// Latching raises the error event, plus a status event when the observed
    /// status was not already `Error`. Clearing raises nothing.
    pub fn set_error(&mut self, error: Option<DepthError>) -> Vec<StatusEvent> {
        let underlying = self.phase();
        match error {
            Some(cause) => {
                let was_errored = self.is_errored();
                self.state = State::Errored {
                    cause: cause.clone(),
                    underlying,
                };
                let mut events = vec![StatusEvent::Error(cause)];
                if !was_errored {
                    events.push(StatusEvent::Status(ConnectionStatus::Error));
                }
                events
            }
            None => {
                self.state = State::Phase(underlying);
                Vec::new()
            }
        }
    }
}
