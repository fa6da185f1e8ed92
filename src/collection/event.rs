use serde_json::{json, Value};

use crate::object::Object;

/// Events a collection emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionEvent {
    /// `object` was inserted at its final position `index`.
    Add { object: Object, index: usize },
    /// `object` was removed; `index` is its position before removal.
    Remove { object: Object, index: usize },
    /// Members were replaced or re-ordered.
    Reset,
    /// A member finished saving.
    Sync { object: Object },
    /// A member attribute changed (`None` closes a batch of changes).
    MemberChanged { object: Object, attr: Option<String> },
    /// A member was destroyed; it has already been removed.
    MemberDestroyed { object: Object },
    /// A member rejected a `set`.
    MemberInvalid { object: Object, message: String },
    /// A member emitted an application-defined event.
    MemberEvent { object: Object, name: String },
}

/// Discriminant of [`CollectionEvent`], for filtered subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionEventKind {
    Add,
    Remove,
    Reset,
    Sync,
    MemberChanged,
    MemberDestroyed,
    MemberInvalid,
    MemberEvent,
}

impl CollectionEvent {
    pub fn kind(&self) -> CollectionEventKind {
        match self {
            CollectionEvent::Add { .. } => CollectionEventKind::Add,
            CollectionEvent::Remove { .. } => CollectionEventKind::Remove,
            CollectionEvent::Reset => CollectionEventKind::Reset,
            CollectionEvent::Sync { .. } => CollectionEventKind::Sync,
            CollectionEvent::MemberChanged { .. } => CollectionEventKind::MemberChanged,
            CollectionEvent::MemberDestroyed { .. } => CollectionEventKind::MemberDestroyed,
            CollectionEvent::MemberInvalid { .. } => CollectionEventKind::MemberInvalid,
            CollectionEvent::MemberEvent { .. } => CollectionEventKind::MemberEvent,
        }
    }

    /// The member the event concerns. `None` for `Reset`.
    pub fn object(&self) -> Option<&Object> {
        match self {
            CollectionEvent::Reset => None,
            CollectionEvent::Add { object, .. }
            | CollectionEvent::Remove { object, .. }
            | CollectionEvent::Sync { object }
            | CollectionEvent::MemberChanged { object, .. }
            | CollectionEvent::MemberDestroyed { object }
            | CollectionEvent::MemberInvalid { object, .. }
            | CollectionEvent::MemberEvent { object, .. } => Some(object),
        }
    }

    /// Conventional event name (`"add"`, `"change:title"`, ...).
    pub fn name(&self) -> String {
        match self {
            CollectionEvent::Add { .. } => "add".to_string(),
            CollectionEvent::Remove { .. } => "remove".to_string(),
            CollectionEvent::Reset => "reset".to_string(),
            CollectionEvent::Sync { .. } => "sync".to_string(),
            CollectionEvent::MemberChanged { attr: Some(attr), .. } => format!("change:{}", attr),
            CollectionEvent::MemberChanged { attr: None, .. } => "change".to_string(),
            CollectionEvent::MemberDestroyed { .. } => "destroy".to_string(),
            CollectionEvent::MemberInvalid { .. } => "invalid".to_string(),
            CollectionEvent::MemberEvent { name, .. } => name.clone(),
        }
    }

    /// JSON payload: event name, member JSON and index where applicable.
    pub fn to_json(&self) -> Value {
        let mut payload = json!({ "event": self.name() });
        if let Some(object) = self.object() {
            payload["object"] = object.to_json();
            payload["cid"] = Value::String(object.cid().to_string());
        }
        match self {
            CollectionEvent::Add { index, .. } | CollectionEvent::Remove { index, .. } => {
                payload["index"] = json!(index);
            }
            CollectionEvent::MemberInvalid { message, .. } => {
                payload["message"] = Value::String(message.clone());
            }
            _ => {}
        }
        payload
    }
}
