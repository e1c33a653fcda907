//! Rate-shaping between view computation and consumers
//!
//! Two optional stages run in sequence:
//!
//! - **throttle**: trailing edge with coalescing. The first value starts a
//!   timer; values arriving before it fires replace the pending one; on expiry
//!   the latest value moves on.
//! - **debounce**: every value restarts the timer; only a value followed by a
//!   quiet period moves on.
//!
//! A zero delay disables a stage. With no stage a push reaches the sink
//! synchronously. Timers are tokio tasks; outside a runtime every stage
//! passes values straight through.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

/// Receives values leaving the pipeline
pub type Sink<T> = Arc<dyn Fn(T) + Send + Sync>;

struct Stage<T> {
    delay: Duration,
    pending: Option<T>,
    timer: Option<JoinHandle<()>>,
    // Bumped whenever a timer is started or cancelled; a waking timer that
    // sees a different value has been superseded.
    epoch: u64,
}

impl<T> Stage<T> {
    fn new(delay: Duration) -> Option<Self> {
        (!delay.is_zero()).then_some(Self {
            delay,
            pending: None,
            timer: None,
            epoch: 0,
        })
    }

    fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.pending = None;
        self.epoch += 1;
    }
}

struct Stages<T> {
    throttle: Option<Stage<T>>,
    debounce: Option<Stage<T>>,
    destroyed: bool,
}

struct Inner<T> {
    stages: Mutex<Stages<T>>,
    sink: Sink<T>,
}

/// Throttle then debounce, feeding one sink
pub struct UpdatePipeline<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for UpdatePipeline<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for UpdatePipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stages = self.inner.stages.lock();
        f.debug_struct("UpdatePipeline")
            .field("throttle", &stages.throttle.as_ref().map(|s| s.delay))
            .field("debounce", &stages.debounce.as_ref().map(|s| s.delay))
            .field("destroyed", &stages.destroyed)
            .finish()
    }
}

impl<T: Send + 'static> UpdatePipeline<T> {
    /// Build a pipeline; zero delays disable their stage
    pub fn new(throttle: Duration, debounce: Duration, sink: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                stages: Mutex::new(Stages {
                    throttle: Stage::new(throttle),
                    debounce: Stage::new(debounce),
                    destroyed: false,
                }),
                sink: Arc::new(sink),
            }),
        }
    }

    /// Build a pipeline from millisecond delays
    pub fn from_millis(throttle_ms: u64, debounce_ms: u64, sink: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self::new(
            Duration::from_millis(throttle_ms),
            Duration::from_millis(debounce_ms),
            sink,
        )
    }

    /// Feed a value in
    pub fn push(&self, value: T) {
        let mut stages = self.inner.stages.lock();
        if stages.destroyed {
            return;
        }

        if let Some(throttle) = stages.throttle.as_mut() {
            if throttle.timer.is_some() {
                throttle.pending = Some(value);
                return;
            }
            if let Ok(runtime) = Handle::try_current() {
                throttle.pending = Some(value);
                throttle.epoch += 1;
                let epoch = throttle.epoch;
                let deadline = Instant::now() + throttle.delay;
                let inner = Arc::clone(&self.inner);
                throttle.timer = Some(runtime.spawn(async move {
                    tokio::time::sleep_until(deadline).await;
                    Inner::throttle_fired(&inner, epoch);
                }));
                return;
            }
            trace!("No runtime, throttle passes value through");
        }

        Inner::enter_debounce(&self.inner, stages, value);
    }

    /// Cancel every timer and drop pending values without emitting
    ///
    /// Later pushes are ignored.
    pub fn destroy(&self) {
        let mut guard = self.inner.stages.lock();
        let stages = &mut *guard;
        stages.destroyed = true;
        for stage in [stages.throttle.as_mut(), stages.debounce.as_mut()].into_iter().flatten() {
            stage.cancel();
        }
    }

    /// Check if `destroy` was called
    pub fn is_destroyed(&self) -> bool {
        self.inner.stages.lock().destroyed
    }

    /// Check if a value is waiting in any stage
    pub fn has_pending(&self) -> bool {
        let stages = self.inner.stages.lock();
        let pending = [stages.throttle.as_ref(), stages.debounce.as_ref()]
            .into_iter()
            .flatten()
            .any(|stage| stage.pending.is_some());
        pending
    }
}

impl<T: Send + 'static> Inner<T> {
    fn throttle_fired(inner: &Arc<Self>, epoch: u64) {
        let mut stages = inner.stages.lock();
        if stages.destroyed {
            return;
        }
        let value = match stages.throttle.as_mut() {
            Some(throttle) if throttle.epoch == epoch => {
                throttle.timer = None;
                throttle.pending.take()
            }
            _ => None,
        };
        match value {
            Some(value) => {
                trace!("Throttle released value");
                Self::enter_debounce(inner, stages, value);
            }
            None => trace!("Stale throttle timer"),
        }
    }

    /// Hand `value` to the debounce stage, or straight to the sink
    ///
    /// Consumes the stage lock so the sink always runs unlocked.
    fn enter_debounce(inner: &Arc<Self>, mut stages: parking_lot::MutexGuard<'_, Stages<T>>, value: T) {
        let runtime = match (stages.debounce.is_some(), Handle::try_current()) {
            (true, Ok(runtime)) => runtime,
            (has_stage, _) => {
                if has_stage {
                    trace!("No runtime, debounce passes value through");
                }
                drop(stages);
                (inner.sink)(value);
                return;
            }
        };
        let Some(debounce) = stages.debounce.as_mut() else {
            return;
        };

        // Restart: the previous timer must not fire
        if let Some(timer) = debounce.timer.take() {
            timer.abort();
        }
        debounce.pending = Some(value);
        debounce.epoch += 1;
        let epoch = debounce.epoch;
        let deadline = Instant::now() + debounce.delay;
        let task_inner = Arc::clone(inner);
        debounce.timer = Some(runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            Inner::debounce_fired(&task_inner, epoch);
        }));
    }

    fn debounce_fired(inner: &Arc<Self>, epoch: u64) {
        let mut stages = inner.stages.lock();
        if stages.destroyed {
            return;
        }
        let value = match stages.debounce.as_mut() {
            Some(debounce) if debounce.epoch == epoch => {
                debounce.timer = None;
                debounce.pending.take()
            }
            _ => None,
        };
        drop(stages);
        if let Some(value) = value {
            (inner.sink)(value);
        }
    }
}
