//! Objects - attribute bags with client/server identity and a lifecycle event stream.
//!
//! Every `Object` gets a client id (`cid`) at construction. The server id
//! (`objectId`) is absent until the object is saved through its class's store.
//! `Object` is a cheap handle: clones share identity, attributes and listeners.

mod class;
mod error;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::collection::CollectionId;
use crate::events::{Events, ListenerId};

pub use class::{ObjectClass, Validator};
pub use error::ObjectError;

/// Attribute storage for an object.
pub type Attributes = serde_json::Map<String, Value>;

/// Attribute name under which the server id is reported.
pub const OBJECT_ID: &str = "objectId";

static NEXT_CID: AtomicU64 = AtomicU64::new(1);

/// Listener signature for object events.
pub type ObjectListener = dyn Fn(&Object, &ObjectEvent) + Send + Sync;

/// Events an object can emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectEvent {
    /// An attribute changed (`Some(attr)`), or a batch of changes finished (`None`).
    Changed { attr: Option<String> },
    /// A `set` was rejected by the class validator.
    Invalid { message: String },
    /// The object was persisted.
    Synced,
    /// The object was destroyed.
    Destroyed,
    /// The object was inserted into `collection` at `index`.
    Added {
        collection: CollectionId,
        index: usize,
    },
    /// The object was removed from `collection`; `index` is its position before removal.
    Removed {
        collection: CollectionId,
        index: usize,
    },
    /// Application-defined event.
    Custom(String),
}

impl ObjectEvent {
    /// Conventional event name (`"change:title"`, `"destroy"`, ...).
    pub fn name(&self) -> String {
        match self {
            ObjectEvent::Changed { attr: Some(attr) } => format!("change:{}", attr),
            ObjectEvent::Changed { attr: None } => "change".to_string(),
            ObjectEvent::Invalid { .. } => "invalid".to_string(),
            ObjectEvent::Synced => "sync".to_string(),
            ObjectEvent::Destroyed => "destroy".to_string(),
            ObjectEvent::Added { .. } => "add".to_string(),
            ObjectEvent::Removed { .. } => "remove".to_string(),
            ObjectEvent::Custom(name) => name.clone(),
        }
    }
}

/// Server id carried in an `objectId` attribute. Empty strings and null clear it.
pub(crate) fn parse_id(value: Value) -> Result<Option<String>, ObjectError> {
    match value {
        Value::String(id) if id.is_empty() => Ok(None),
        Value::String(id) => Ok(Some(id)),
        Value::Null => Ok(None),
        other => Err(ObjectError::Invalid(format!(
            "{} must be a string, got {}",
            OBJECT_ID, other
        ))),
    }
}

struct ObjectState {
    id: Option<String>,
    previous_id: Option<String>,
    attributes: Attributes,
    previous_attributes: Attributes,
}

struct ObjectInner {
    cid: String,
    class: ObjectClass,
    state: RwLock<ObjectState>,
    events: Events<ObjectListener>,
}

/// Shared handle to a model object.
#[derive(Clone)]
pub struct Object {
    inner: Arc<ObjectInner>,
}

impl Object {
    /// Construct without validation. An `objectId` string attribute becomes the server id.
    pub(crate) fn from_attributes(class: ObjectClass, mut attributes: Attributes) -> Self {
        let id = attributes
            .remove(OBJECT_ID)
            .and_then(|value| parse_id(value).ok().flatten());
        let cid = format!("c{}", NEXT_CID.fetch_add(1, Ordering::Relaxed));

        Object {
            inner: Arc::new(ObjectInner {
                cid,
                class,
                state: RwLock::new(ObjectState {
                    id,
                    previous_id: None,
                    previous_attributes: attributes.clone(),
                    attributes,
                }),
                events: Events::new(),
            }),
        }
    }

    /// Client id, unique per instance for the lifetime of the process.
    pub fn cid(&self) -> &str {
        &self.inner.cid
    }

    /// Server id, once persisted.
    pub fn id(&self) -> Option<String> {
        self.inner.state.read().id.clone()
    }

    pub fn is_new(&self) -> bool {
        self.inner.state.read().id.is_none()
    }

    pub fn class(&self) -> &ObjectClass {
        &self.inner.class
    }

    pub fn class_name(&self) -> &str {
        self.inner.class.name()
    }

    /// Current value of an attribute. `objectId` reports the server id.
    pub fn get(&self, attr: &str) -> Option<Value> {
        let state = self.inner.state.read();
        if attr == OBJECT_ID {
            return state.id.clone().map(Value::String);
        }
        state.attributes.get(attr).cloned()
    }

    pub fn has(&self, attr: &str) -> bool {
        !matches!(self.get(attr), None | Some(Value::Null))
    }

    /// Value of an attribute before the most recent change.
    pub fn previous(&self, attr: &str) -> Option<Value> {
        let state = self.inner.state.read();
        if attr == OBJECT_ID {
            return state.previous_id.clone().map(Value::String);
        }
        state.previous_attributes.get(attr).cloned()
    }

    pub fn attributes(&self) -> Attributes {
        self.inner.state.read().attributes.clone()
    }

    /// Set one attribute. See [`Object::set_all`].
    pub fn set(&self, attr: impl Into<String>, value: impl Into<Value>) -> Result<(), ObjectError> {
        let mut attributes = Attributes::new();
        attributes.insert(attr.into(), value.into());
        self.set_all(attributes)
    }

    /// Merge attributes after validating the result with the class validator.
    ///
    /// Emits `Changed { attr: Some(..) }` for every attribute whose value changed,
    /// then a single `Changed { attr: None }`. An `objectId` entry is applied
    /// together with the attributes and reported first. A rejected set emits
    /// `Invalid` and leaves the object untouched, server id included.
    pub fn set_all(&self, mut attributes: Attributes) -> Result<(), ObjectError> {
        let requested_id = match attributes.remove(OBJECT_ID).map(parse_id) {
            Some(Err(err)) => return self.reject(err),
            Some(Ok(id)) => Some(id),
            None => None,
        };

        let changed = {
            let mut state = self.inner.state.write();
            let id_changed = matches!(&requested_id, Some(id) if *id != state.id);

            let mut candidate = state.attributes.clone();
            let mut changed = Vec::new();
            for (key, value) in attributes {
                if candidate.get(&key) != Some(&value) {
                    changed.push(key.clone());
                }
                candidate.insert(key, value);
            }

            if !changed.is_empty() {
                if let Err(err) = self.inner.class.validate(&candidate) {
                    drop(state);
                    return self.reject(err);
                }
                state.previous_attributes = std::mem::replace(&mut state.attributes, candidate);
            }
            if let (true, Some(id)) = (id_changed, requested_id) {
                state.previous_id = std::mem::replace(&mut state.id, id);
                changed.insert(0, OBJECT_ID.to_string());
            }
            changed
        };

        if !changed.is_empty() {
            self.emit_changes(changed);
        }
        Ok(())
    }

    /// Remove an attribute.
    pub fn unset(&self, attr: &str) -> Result<(), ObjectError> {
        let removed = {
            let mut state = self.inner.state.write();
            if !state.attributes.contains_key(attr) {
                return Ok(());
            }
            let mut candidate = state.attributes.clone();
            candidate.remove(attr);

            if let Err(err) = self.inner.class.validate(&candidate) {
                drop(state);
                return self.reject(err);
            }

            state.previous_attributes = std::mem::replace(&mut state.attributes, candidate);
            attr.to_string()
        };

        self.emit_changes(vec![removed]);
        Ok(())
    }

    /// Assign the server id. An empty id clears it.
    ///
    /// Records the previous id (readable via `previous("objectId")`) and emits
    /// `Changed { attr: Some("objectId") }` when the id actually changes.
    pub fn set_id(&self, id: impl Into<String>) {
        let id = Some(id.into()).filter(|id| !id.is_empty());
        {
            let mut state = self.inner.state.write();
            if state.id == id {
                return;
            }
            state.previous_id = std::mem::replace(&mut state.id, id);
        }
        self.emit_changes(vec![OBJECT_ID.to_string()]);
    }

    /// JSON form: `objectId` (when persisted) followed by the attributes.
    pub fn to_json(&self) -> Value {
        let state = self.inner.state.read();
        let mut map = Attributes::new();
        if let Some(id) = &state.id {
            map.insert(OBJECT_ID.to_string(), Value::String(id.clone()));
        }
        for (key, value) in &state.attributes {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }

    /// Subscribe to every event this object emits.
    pub fn on<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Object, &ObjectEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(Arc::new(listener))
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.events.off(id)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.events.len()
    }

    /// Deliver an event to every listener registered at call time.
    pub fn trigger(&self, event: ObjectEvent) {
        tracing::trace!(
            target: "object_collection::object",
            cid = %self.inner.cid,
            event = %event.name(),
            "trigger"
        );
        for listener in self.inner.events.snapshot() {
            listener(self, &event);
        }
    }

    /// Persist through the class store, emit `Synced` and resolve with this object.
    pub async fn save(&self) -> Result<Object, ObjectError> {
        self.persist().await?;
        self.trigger(ObjectEvent::Synced);
        Ok(self.clone())
    }

    /// Persist without emitting `Synced`; assigns the server id on first save.
    pub(crate) async fn persist(&self) -> Result<(), ObjectError> {
        let store = self
            .inner
            .class
            .store()
            .ok_or_else(|| ObjectError::NoStore(self.class_name().to_string()))?;
        let (id, attributes) = {
            let state = self.inner.state.read();
            (state.id.clone(), state.attributes.clone())
        };

        let saved_id = store
            .save(self.class_name(), id.as_deref(), &attributes)
            .await?;
        tracing::debug!(
            target: "object_collection::object",
            cid = %self.inner.cid,
            id = %saved_id,
            class = %self.class_name(),
            "saved object"
        );

        if id.as_deref() != Some(saved_id.as_str()) {
            self.set_id(saved_id);
        }
        Ok(())
    }

    /// Delete from the store when persisted, then emit `Destroyed`.
    pub async fn destroy(&self) -> Result<(), ObjectError> {
        if let Some(id) = self.id() {
            let store = self
                .inner
                .class
                .store()
                .ok_or_else(|| ObjectError::NoStore(self.class_name().to_string()))?;
            store.destroy(self.class_name(), &id).await?;
            tracing::debug!(
                target: "object_collection::object",
                cid = %self.inner.cid,
                id = %id,
                "destroyed object"
            );
        }
        self.trigger(ObjectEvent::Destroyed);
        Ok(())
    }

    fn reject(&self, err: ObjectError) -> Result<(), ObjectError> {
        self.trigger(ObjectEvent::Invalid {
            message: err.to_string(),
        });
        Err(err)
    }

    fn emit_changes(&self, changed: Vec<String>) {
        for attr in changed {
            self.trigger(ObjectEvent::Changed { attr: Some(attr) });
        }
        self.trigger(ObjectEvent::Changed { attr: None });
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Object {}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Object")
            .field("class", &self.inner.class.name())
            .field("cid", &self.inner.cid)
            .field("id", &state.id)
            .field("attributes", &state.attributes)
            .finish()
    }
}
