//! Typed listener registry shared by objects and collections.
//!
//! Listeners are stored behind `Arc` so a trigger can run against a snapshot:
//! a listener may subscribe, unsubscribe or trigger further events without
//! deadlocking on the registry lock.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Handle returned by `on`, used to unsubscribe with `off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Ordered set of listeners of type `L` (usually a `dyn Fn(..)` trait object).
pub struct Events<L: ?Sized> {
    listeners: RwLock<Vec<(ListenerId, Arc<L>)>>,
}

impl<L: ?Sized> Events<L> {
    pub fn new() -> Self {
        Events {
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Register a listener. Listeners are invoked in registration order.
    pub fn on(&self, listener: Arc<L>) -> ListenerId {
        let id = ListenerId::next();
        self.listeners.write().push((id, listener));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Remove every listener.
    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Listeners registered at call time, in registration order.
    pub fn snapshot(&self) -> Vec<Arc<L>> {
        self.listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}

impl<L: ?Sized> Default for Events<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> fmt::Debug for Events<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Events")
            .field("listeners", &self.len())
            .finish()
    }
}
