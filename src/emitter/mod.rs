use std::sync::Arc;

use event_emitter_rs::EventEmitter;
use parking_lot::Mutex;

use crate::collection::Collection;
use crate::events::ListenerId;

/// Name under which every forwarded event is also emitted.
pub const ALL_EVENTS: &str = "all";

/// Forwards collection events to an [`EventEmitter`] as JSON strings.
///
/// Delivery through the emitter is asynchronous (each listener runs on its own
/// thread), which suits observers that must not block collection mutations.
///
/// # Example
///
/// ```ignore
/// use object_collection::emitter::EmittableCollection;
///
/// let emitter = collection.with_emitter();
/// emitter.on("add", |payload| {
///     println!("added: {}", payload);
/// });
/// collection.add(object, AddOptions::new())?;
/// ```
pub struct CollectionEmitter {
    collection: Collection,
    emitter: Arc<Mutex<EventEmitter>>,
    listener: ListenerId,
}

impl CollectionEmitter {
    /// Subscribe to `collection` and forward to a fresh emitter.
    pub fn new(collection: &Collection) -> Self {
        Self::attach(collection, EventEmitter::new())
    }

    /// Subscribe to `collection` and forward to `emitter`.
    pub fn attach(collection: &Collection, emitter: EventEmitter) -> Self {
        let emitter = Arc::new(Mutex::new(emitter));
        let sink = Arc::clone(&emitter);

        let listener = collection.on(move |event| {
            let payload = event.to_json().to_string();
            let mut emitter = sink.lock();
            emitter.emit(&event.name(), payload.clone());
            emitter.emit(ALL_EVENTS, payload);
        });

        CollectionEmitter {
            collection: collection.clone(),
            emitter,
            listener,
        }
    }

    /// Register a listener for a forwarded event name (or [`ALL_EVENTS`]).
    pub fn on<F>(&self, event: &str, listener: F) -> String
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.emitter.lock().on(event, listener)
    }

    /// Remove a listener registered with [`CollectionEmitter::on`].
    pub fn remove_listener(&self, id: &str) -> bool {
        self.emitter.lock().remove_listener(id).is_some()
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }
}

impl Drop for CollectionEmitter {
    fn drop(&mut self) {
        self.collection.off(self.listener);
    }
}

/// Trait for types that can be extended with emitter capabilities.
pub trait EmittableCollection {
    /// Forward events to a new asynchronous emitter.
    fn with_emitter(&self) -> CollectionEmitter;
}

impl EmittableCollection for Collection {
    fn with_emitter(&self) -> CollectionEmitter {
        CollectionEmitter::new(self)
    }
}
