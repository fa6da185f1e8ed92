//! Shared fixtures: a game score class, recording listeners and failing backends.

#![allow(dead_code)]

use async_trait::async_trait;
use object_collection::{
    Attributes, Collection, CollectionOptions, Comparator, InMemoryObjectStore, Object,
    ObjectClass, ObjectStore, Query, QueryError, StoreError, StoredObject,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

pub fn attrs(value: Value) -> Attributes {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

/// `GameScore` objects; negative points are rejected.
pub fn score_class() -> ObjectClass {
    ObjectClass::new("GameScore").with_validator(|attributes| {
        match attributes.get("points").and_then(Value::as_i64) {
            Some(points) if points < 0 => Err("points must not be negative".to_string()),
            _ => Ok(()),
        }
    })
}

pub fn score_class_with_store(store: Arc<dyn ObjectStore>) -> ObjectClass {
    score_class().with_store(store)
}

pub fn score(rank: i64) -> Object {
    score_class()
        .build(attrs(json!({ "rank": rank, "points": rank * 10 })))
        .unwrap()
}

pub fn ranked_scores() -> Collection {
    Collection::new(
        CollectionOptions::new()
            .with_model(score_class())
            .with_comparator(Comparator::attribute("rank")),
    )
}

/// Collects event names as they are emitted.
#[derive(Clone, Default)]
pub struct Recorder {
    names: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn attach(collection: &Collection) -> Self {
        let recorder = Recorder::default();
        let names = Arc::clone(&recorder.names);
        collection.on(move |event| names.lock().unwrap().push(event.name()));
        recorder
    }

    pub fn attach_object(object: &Object) -> Self {
        let recorder = Recorder::default();
        let names = Arc::clone(&recorder.names);
        object.on(move |_, event| names.lock().unwrap().push(event.name()));
        recorder
    }

    pub fn names(&self) -> Vec<String> {
        self.names.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.names().iter().filter(|n| n.as_str() == name).count()
    }

    pub fn clear(&self) {
        self.names.lock().unwrap().clear();
    }
}

/// Query that always fails.
pub struct FailingQuery;

#[async_trait]
impl Query for FailingQuery {
    async fn find(&self) -> Result<Vec<Object>, QueryError> {
        Err(QueryError::Failed("backend unavailable".to_string()))
    }
}

/// Query returning a fixed set of objects.
pub struct StaticQuery {
    pub objects: Vec<Object>,
}

#[async_trait]
impl Query for StaticQuery {
    async fn find(&self) -> Result<Vec<Object>, QueryError> {
        Ok(self.objects.clone())
    }
}

/// Store that rejects every write.
#[derive(Default)]
pub struct FailingStore {
    inner: InMemoryObjectStore,
}

#[async_trait]
impl ObjectStore for FailingStore {
    async fn save(
        &self,
        _class_name: &str,
        _id: Option<&str>,
        _attributes: &Attributes,
    ) -> Result<String, StoreError> {
        Err(StoreError::Backend("write rejected".to_string()))
    }

    async fn destroy(&self, class_name: &str, id: &str) -> Result<bool, StoreError> {
        self.inner.destroy(class_name, id).await
    }

    async fn find(&self, class_name: &str) -> Result<Vec<StoredObject>, StoreError> {
        self.inner.find(class_name).await
    }
}
