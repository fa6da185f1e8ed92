//! Collections - ordered sets of objects kept in sync by identity.
//!
//! A collection owns an ordered list of members plus two indexes: by server id
//! (persisted members only) and by client id (every member). It subscribes to
//! each member's event stream and re-broadcasts member events as
//! [`CollectionEvent`]s.
//!
//! ## Example
//!
//! ```ignore
//! use object_collection::{AddOptions, Collection, CollectionOptions, Comparator};
//!
//! let scores = Collection::new(
//!     CollectionOptions::new()
//!         .with_model(ObjectClass::new("GameScore"))
//!         .with_comparator(Comparator::attribute("points")),
//! );
//! scores.on(|event| println!("{}", event.name()));
//! scores.add(json!([{"points": 30}, {"points": 10}]), AddOptions::new())?;
//! assert_eq!(scores.pluck("points"), vec![Some(json!(10)), Some(json!(30))]);
//! ```

mod error;
mod event;
mod options;
mod sequence;
mod sync;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::events::{Events, ListenerId};
use crate::object::{Object, ObjectClass, ObjectEvent, OBJECT_ID};
use crate::query::Query;

pub use error::CollectionError;
pub use event::{CollectionEvent, CollectionEventKind};
pub use options::{
    compare_values, AddOptions, CollectionOptions, Comparator, CreateOptions, FetchOptions,
    IntoMemberRefs, IntoModels, MemberRef, ModelInput, RemoveOptions, ResetOptions,
    SortOptions, SuccessCallback,
};
pub use sequence::{Chain, ObjectSequence};
pub use sync::Creation;

static NEXT_COLLECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique collection identity, carried by member `Added`/`Removed` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionId(u64);

impl CollectionId {
    fn next() -> Self {
        CollectionId(NEXT_COLLECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "collection-{}", self.0)
    }
}

/// Listener signature for collection events.
pub type CollectionListener = dyn Fn(&CollectionEvent) + Send + Sync;

#[derive(Default)]
struct CollectionState {
    models: Vec<Object>,
    by_id: HashMap<String, Object>,
    by_cid: HashMap<String, Object>,
    subscriptions: HashMap<String, ListenerId>,
}

impl CollectionState {
    /// Reject the batch if any client id or non-empty server id repeats,
    /// within the batch or against current members.
    fn check_duplicates(&self, batch: &[Object]) -> Result<(), CollectionError> {
        let mut cids = HashSet::new();
        let mut ids = HashSet::new();

        for object in batch {
            let cid = object.cid();
            if !cids.insert(cid) || self.by_cid.contains_key(cid) {
                return Err(CollectionError::DuplicateCid(cid.to_string()));
            }
            if let Some(id) = object.id() {
                if self.by_id.contains_key(&id) || !ids.insert(id.clone()) {
                    return Err(CollectionError::DuplicateId(id));
                }
            }
        }
        Ok(())
    }

    fn lookup(&self, member: &MemberRef) -> Option<Object> {
        match member {
            MemberRef::Object(object) => self
                .by_cid
                .get(object.cid())
                .or_else(|| object.id().and_then(|id| self.by_id.get(&id)))
                .cloned(),
            MemberRef::Key(key) => self
                .by_cid
                .get(key)
                .or_else(|| self.by_id.get(key))
                .cloned(),
        }
    }

    /// Drop a member from the list and both indexes. Returns its former
    /// position and the collection's listener on it.
    fn detach(&mut self, object: &Object) -> Option<(usize, Option<ListenerId>)> {
        let index = self.models.iter().position(|member| member == object)?;
        self.models.remove(index);
        self.by_cid.remove(object.cid());
        if let Some(id) = object.id() {
            self.unindex(&id, object);
        }
        Some((index, self.subscriptions.remove(object.cid())))
    }

    /// Drop `object`'s entry under `id`. Another member carrying the same id
    /// takes its place, so every indexed id keeps pointing at a member.
    fn unindex(&mut self, id: &str, object: &Object) {
        if self.by_id.get(id) != Some(object) {
            return;
        }
        self.by_id.remove(id);
        let successor = self
            .models
            .iter()
            .find(|member| *member != object && member.id().as_deref() == Some(id))
            .cloned();
        if let Some(successor) = successor {
            self.by_id.insert(id.to_string(), successor);
        }
    }
}

struct CollectionInner {
    id: CollectionId,
    model: ObjectClass,
    comparator: RwLock<Option<Comparator>>,
    query: RwLock<Option<Arc<dyn Query>>>,
    state: Mutex<CollectionState>,
    events: Events<CollectionListener>,
}

impl Drop for CollectionInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for (cid, listener) in state.subscriptions.drain() {
            if let Some(object) = state.by_cid.get(&cid) {
                object.off(listener);
            }
        }
    }
}

/// Shared handle to an ordered, identity-indexed set of objects.
#[derive(Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
}

impl Default for Collection {
    fn default() -> Self {
        Collection::new(CollectionOptions::default())
    }
}

impl Collection {
    /// Create an empty collection.
    pub fn new(options: CollectionOptions) -> Self {
        let CollectionOptions {
            comparator,
            model,
            query,
        } = options;

        Collection {
            inner: Arc::new(CollectionInner {
                id: CollectionId::next(),
                model,
                comparator: RwLock::new(comparator),
                query: RwLock::new(query),
                state: Mutex::new(CollectionState::default()),
                events: Events::new(),
            }),
        }
    }

    /// Create a collection seeded (silently) with `models`.
    pub fn with_models<I: IntoModels>(
        models: I,
        options: CollectionOptions,
    ) -> Result<Self, CollectionError> {
        let collection = Collection::new(options);
        collection.reset(models, ResetOptions::silent())?;
        Ok(collection)
    }

    pub fn id(&self) -> CollectionId {
        self.inner.id
    }

    pub fn model(&self) -> &ObjectClass {
        &self.inner.model
    }

    pub fn comparator(&self) -> Option<Comparator> {
        self.inner.comparator.read().clone()
    }

    /// Replace the comparator. Members are re-ordered on the next `add` or `sort`.
    pub fn set_comparator(&self, comparator: Option<Comparator>) {
        *self.inner.comparator.write() = comparator;
    }

    pub fn query(&self) -> Option<Arc<dyn Query>> {
        self.inner.query.read().clone()
    }

    pub fn set_query(&self, query: Option<Arc<dyn Query>>) {
        *self.inner.query.write() = query;
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().models.is_empty()
    }

    /// Snapshot of the members in order.
    pub fn models(&self) -> Vec<Object> {
        self.inner.state.lock().models.clone()
    }

    /// Add one or more objects or attribute bags.
    ///
    /// The batch is all-or-nothing: an invalid attribute bag or a duplicate
    /// client/server id fails the whole call before anything is inserted.
    /// Returns the added objects in input order.
    pub fn add<I: IntoModels>(
        &self,
        items: I,
        options: AddOptions,
    ) -> Result<Vec<Object>, CollectionError> {
        let added = items
            .into_models()
            .into_iter()
            .map(|input| self.prepare(input))
            .collect::<Result<Vec<_>, _>>()?;
        if added.is_empty() {
            return Ok(added);
        }

        let positions = {
            let mut state = self.inner.state.lock();
            state.check_duplicates(&added)?;

            for object in &added {
                let listener = object.on(self.member_listener());
                state.subscriptions.insert(object.cid().to_string(), listener);
                state.by_cid.insert(object.cid().to_string(), object.clone());
                if let Some(id) = object.id() {
                    state.by_id.insert(id, object.clone());
                }
            }

            let at = options.at.unwrap_or(state.models.len()).min(state.models.len());
            state.models.splice(at..at, added.iter().cloned());

            if let Some(comparator) = self.inner.comparator.read().as_ref() {
                comparator.sort(&mut state.models);
            }

            let cids: HashSet<&str> = added.iter().map(Object::cid).collect();
            let positions: Vec<(usize, Object)> = state
                .models
                .iter()
                .enumerate()
                .filter(|(_, member)| cids.contains(member.cid()))
                .map(|(index, member)| (index, member.clone()))
                .collect();
            positions
        };

        tracing::debug!(
            target: "object_collection::collection",
            collection = %self.inner.id,
            added = added.len(),
            length = self.len(),
            "added objects"
        );

        if !options.silent {
            for (index, object) in positions {
                object.trigger(ObjectEvent::Added {
                    collection: self.inner.id,
                    index,
                });
            }
        }
        Ok(added)
    }

    /// Remove members given as objects, client ids or server ids.
    ///
    /// Unknown references are skipped. Returns the removed objects.
    pub fn remove<I: IntoMemberRefs>(&self, items: I, options: RemoveOptions) -> Vec<Object> {
        let mut removed = Vec::new();

        for member in items.into_member_refs() {
            let detached = {
                let mut state = self.inner.state.lock();
                state.lookup(&member).and_then(|object| {
                    state
                        .detach(&object)
                        .map(|(index, listener)| (object, index, listener))
                })
            };
            let Some((object, index, listener)) = detached else {
                continue;
            };

            if !options.silent {
                object.trigger(ObjectEvent::Removed {
                    collection: self.inner.id,
                    index,
                });
            }
            if let Some(listener) = listener {
                object.off(listener);
            }
            removed.push(object);
        }

        if !removed.is_empty() {
            tracing::debug!(
                target: "object_collection::collection",
                collection = %self.inner.id,
                removed = removed.len(),
                length = self.len(),
                "removed objects"
            );
        }
        removed
    }

    /// Member with the given server id. Accepts an id or an object (its id is used).
    pub fn get(&self, id: impl Into<MemberRef>) -> Option<Object> {
        let id = match id.into() {
            MemberRef::Object(object) => object.id()?,
            MemberRef::Key(key) => key,
        };
        if id.is_empty() {
            return None;
        }
        self.inner.state.lock().by_id.get(&id).cloned()
    }

    /// Member with the given client id. Accepts a cid or an object (its cid is used).
    pub fn get_by_cid(&self, cid: impl Into<MemberRef>) -> Option<Object> {
        let cid = match cid.into() {
            MemberRef::Object(object) => object.cid().to_string(),
            MemberRef::Key(key) => key,
        };
        if cid.is_empty() {
            return None;
        }
        self.inner.state.lock().by_cid.get(&cid).cloned()
    }

    pub fn at(&self, index: usize) -> Option<Object> {
        self.inner.state.lock().models.get(index).cloned()
    }

    /// Re-order members with the comparator. Emits `Reset` unless silent.
    pub fn sort(&self, options: SortOptions) -> Result<(), CollectionError> {
        let comparator = self
            .comparator()
            .ok_or(CollectionError::MissingComparator)?;
        comparator.sort(&mut self.inner.state.lock().models);

        if !options.silent {
            self.trigger(CollectionEvent::Reset);
        }
        Ok(())
    }

    /// Each member's value for `attr`, in order.
    pub fn pluck(&self, attr: &str) -> Vec<Option<Value>> {
        self.models().iter().map(|object| object.get(attr)).collect()
    }

    /// Replace every member with `items`, emitting a single `Reset` unless silent.
    ///
    /// The new batch is validated before current members are detached, so a
    /// rejected reset leaves the collection as it was.
    pub fn reset<I: IntoModels>(
        &self,
        items: I,
        options: ResetOptions,
    ) -> Result<Vec<Object>, CollectionError> {
        let incoming = items
            .into_models()
            .into_iter()
            .map(|input| self.prepare(input))
            .collect::<Result<Vec<_>, _>>()?;
        CollectionState::default().check_duplicates(&incoming)?;

        let previous = std::mem::take(&mut *self.inner.state.lock());
        for (cid, listener) in previous.subscriptions {
            if let Some(object) = previous.by_cid.get(&cid) {
                object.off(listener);
            }
        }

        let added = self.add(incoming, AddOptions::new().silent())?;
        tracing::debug!(
            target: "object_collection::collection",
            collection = %self.inner.id,
            detached = previous.models.len(),
            length = added.len(),
            "reset collection"
        );

        if !options.silent {
            self.trigger(CollectionEvent::Reset);
        }
        Ok(added)
    }

    /// Chainable view over a snapshot of the members.
    pub fn chain(&self) -> Chain {
        Chain::new(self.models())
    }

    /// JSON array of every member's JSON form.
    pub fn to_json(&self) -> Value {
        Value::Array(self.models().iter().map(Object::to_json).collect())
    }

    /// Subscribe to every collection event.
    pub fn on<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&CollectionEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(Arc::new(listener))
    }

    /// Subscribe to one kind of collection event.
    pub fn on_kind<F>(&self, kind: CollectionEventKind, listener: F) -> ListenerId
    where
        F: Fn(&CollectionEvent) + Send + Sync + 'static,
    {
        self.on(move |event| {
            if event.kind() == kind {
                listener(event)
            }
        })
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.events.off(id)
    }

    /// Deliver an event to every listener registered at call time.
    pub fn trigger(&self, event: CollectionEvent) {
        tracing::trace!(
            target: "object_collection::collection",
            collection = %self.inner.id,
            event = %event.name(),
            "trigger"
        );
        for listener in self.inner.events.snapshot() {
            listener(&event);
        }
    }

    fn prepare(&self, input: ModelInput) -> Result<Object, CollectionError> {
        match input {
            ModelInput::Object(object) => Ok(object),
            ModelInput::Raw(Value::Object(attributes)) => self
                .inner
                .model
                .build(attributes)
                .map_err(|err| CollectionError::InvalidModel(err.to_string())),
            ModelInput::Raw(other) => Err(CollectionError::InvalidModel(format!(
                "expected an attribute object, got {}",
                other
            ))),
        }
    }

    fn member_listener(&self) -> impl Fn(&Object, &ObjectEvent) + Send + Sync + 'static {
        let collection: Weak<CollectionInner> = Arc::downgrade(&self.inner);
        move |object: &Object, event: &ObjectEvent| {
            if let Some(inner) = collection.upgrade() {
                Collection { inner }.on_member_event(object, event);
            }
        }
    }

    /// Re-broadcast a member event, applying the membership rules.
    fn on_member_event(&self, object: &Object, event: &ObjectEvent) {
        let rebroadcast = match event {
            ObjectEvent::Added { collection, index } => {
                if *collection != self.inner.id {
                    return;
                }
                CollectionEvent::Add {
                    object: object.clone(),
                    index: *index,
                }
            }
            ObjectEvent::Removed { collection, index } => {
                if *collection != self.inner.id {
                    return;
                }
                CollectionEvent::Remove {
                    object: object.clone(),
                    index: *index,
                }
            }
            ObjectEvent::Destroyed => {
                self.remove(object, RemoveOptions::default());
                CollectionEvent::MemberDestroyed {
                    object: object.clone(),
                }
            }
            ObjectEvent::Changed { attr } => {
                if attr.as_deref() == Some(OBJECT_ID) {
                    self.rekey(object);
                }
                CollectionEvent::MemberChanged {
                    object: object.clone(),
                    attr: attr.clone(),
                }
            }
            ObjectEvent::Synced => CollectionEvent::Sync {
                object: object.clone(),
            },
            ObjectEvent::Invalid { message } => CollectionEvent::MemberInvalid {
                object: object.clone(),
                message: message.clone(),
            },
            ObjectEvent::Custom(name) => CollectionEvent::MemberEvent {
                object: object.clone(),
                name: name.clone(),
            },
        };
        self.trigger(rebroadcast);
    }

    /// Move a member's server-id index entry from its previous id to its current one.
    /// An id already held by another member stays with that member.
    fn rekey(&self, object: &Object) {
        let mut state = self.inner.state.lock();
        if !state.by_cid.contains_key(object.cid()) {
            return;
        }

        if let Some(Value::String(previous)) = object.previous(OBJECT_ID) {
            state.unindex(&previous, object);
        }
        if let Some(id) = object.id() {
            let taken = state
                .by_id
                .get(&id)
                .is_some_and(|existing| existing != object);
            if taken {
                tracing::warn!(
                    target: "object_collection::collection",
                    collection = %self.inner.id,
                    cid = %object.cid(),
                    id = %id,
                    "server id already indexed for another member, keeping the existing entry"
                );
            } else {
                state.by_id.insert(id, object.clone());
            }
        }
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("id", &self.inner.id)
            .field("model", &self.inner.model.name())
            .field("length", &self.len())
            .finish()
    }
}
