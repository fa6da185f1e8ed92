//! Queries - suspending lookups that resolve to lists of objects.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::object::{Attributes, Object, ObjectClass, OBJECT_ID};
use crate::store::StoreError;

/// Executes a lookup against the backend.
#[async_trait]
pub trait Query: Send + Sync {
    async fn find(&self) -> Result<Vec<Object>, QueryError>;
}

/// Error type for query execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The class has no backing store to query.
    NoStore(String),
    /// The store failed.
    Store(StoreError),
    /// Any other failure reported by a query implementation.
    Failed(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::NoStore(class_name) => {
                write!(f, "cannot query class {} without a store", class_name)
            }
            QueryError::Store(err) => write!(f, "query store error: {}", err),
            QueryError::Failed(msg) => write!(f, "query failed: {}", msg),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        QueryError::Store(err)
    }
}

type Filter = Arc<dyn Fn(&Attributes) -> bool + Send + Sync>;

/// Every stored object of a class, optionally filtered and limited.
#[derive(Clone)]
pub struct ClassQuery {
    class: ObjectClass,
    filter: Option<Filter>,
    limit: Option<usize>,
}

impl ClassQuery {
    pub fn new(class: ObjectClass) -> Self {
        ClassQuery {
            class,
            filter: None,
            limit: None,
        }
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Attributes) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn class(&self) -> &ObjectClass {
        &self.class
    }
}

#[async_trait]
impl Query for ClassQuery {
    async fn find(&self) -> Result<Vec<Object>, QueryError> {
        let store = self
            .class
            .store()
            .ok_or_else(|| QueryError::NoStore(self.class.name().to_string()))?;
        let records = store.find(self.class.name()).await?;

        let objects: Vec<Object> = records
            .into_iter()
            .filter(|record| match &self.filter {
                Some(filter) => filter(&record.attributes),
                None => true,
            })
            .take(self.limit.unwrap_or(usize::MAX))
            .map(|record| {
                let mut attributes = record.attributes;
                attributes.insert(OBJECT_ID.to_string(), Value::String(record.id));
                Object::from_attributes(self.class.clone(), attributes)
            })
            .collect();

        tracing::debug!(
            target: "object_collection::query",
            class = %self.class.name(),
            results = objects.len(),
            "query resolved"
        );
        Ok(objects)
    }
}

impl fmt::Debug for ClassQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassQuery")
            .field("class", &self.class.name())
            .field("filter", &self.filter.is_some())
            .field("limit", &self.limit)
            .finish()
    }
}
