//! Typed event bus
//!
//! Each component publishes a closed event enum on its own [`EventBus`].
//! Listeners are plain closures; registering one returns a
//! [`ListenerHandle`] that detaches it on [`ListenerHandle::unsubscribe`].

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

/// Listener callback
pub type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Registry<E> {
    next_id: u64,
    listeners: Vec<(u64, Listener<E>)>,
}

/// Multi-listener broadcast of `E`
///
/// Cloning yields another handle to the same listener set. Listeners run on
/// the emitting thread, after the bus lock is released, so a listener may
/// subscribe or unsubscribe without deadlocking.
pub struct EventBus<E> {
    registry: Arc<Mutex<Registry<E>>>,
}

impl<E: 'static> EventBus<E> {
    /// Create a bus with no listeners
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Register a listener
    pub fn subscribe(&self, listener: impl Fn(&E) + Send + Sync + 'static) -> ListenerHandle {
        let id = {
            let mut registry = self.registry.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.push((id, Arc::new(listener)));
            id
        };

        let weak: Weak<Mutex<Registry<E>>> = Arc::downgrade(&self.registry);
        ListenerHandle {
            detach: Box::new(move || {
                if let Some(registry) = weak.upgrade() {
                    registry.lock().listeners.retain(|(other, _)| *other != id);
                }
            }),
        }
    }

    /// Deliver `event` to every listener in registration order
    pub fn emit(&self, event: &E) {
        let listeners: Vec<Listener<E>> = self
            .registry
            .lock()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Detach every listener
    pub fn clear(&self) {
        self.registry.lock().listeners.clear();
    }

    /// Number of attached listeners
    pub fn len(&self) -> usize {
        self.registry.lock().listeners.len()
    }

    /// Check if no listener is attached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: 'static> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.registry.lock().listeners.len())
            .finish()
    }
}

/// Registration token returned by every `subscribe`/`on_*` call
///
/// Dropping the handle leaves the listener attached.
#[must_use = "dropping the handle keeps the listener attached forever"]
pub struct ListenerHandle {
    detach: Box<dyn FnOnce() + Send + Sync>,
}

impl ListenerHandle {
    /// Detach the listener
    pub fn unsubscribe(self) {
        (self.detach)()
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle").finish_non_exhaustive()
    }
}
