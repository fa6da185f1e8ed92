//! ObjectStore - persistence seam for objects.
//!
//! The store plays the role of the remote backend: it assigns server ids on
//! first save, updates existing records and lists every record of a class.
//!
//! ## Example
//!
//! ```ignore
//! use object_collection::{InMemoryObjectStore, ObjectClass};
//!
//! let store = Arc::new(InMemoryObjectStore::new());
//! let class = ObjectClass::new("GameScore").with_store(store);
//! let score = class.build(attrs)?;
//! score.save().await?;
//! ```

mod in_memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::object::Attributes;

/// A record as held by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    pub id: String,
    pub attributes: Attributes,
    pub version: u64,
}

/// Abstract persistence for objects, keyed by class name and server id.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Insert (when `id` is `None`) or update a record. Returns its server id.
    async fn save(
        &self,
        class_name: &str,
        id: Option<&str>,
        attributes: &Attributes,
    ) -> Result<String, StoreError>;

    /// Delete a record. Returns true if it existed.
    async fn destroy(&self, class_name: &str, id: &str) -> Result<bool, StoreError>;

    /// Every record of a class, in creation order.
    async fn find(&self, class_name: &str) -> Result<Vec<StoredObject>, StoreError>;
}

/// Error type for store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The storage lock was poisoned.
    LockPoisoned(&'static str),
    /// Update of a record the store does not know.
    NotFound { class_name: String, id: String },
    /// Record encoding/decoding failed.
    Serde(String),
    /// Backend-level failure.
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::LockPoisoned(operation) => {
                write!(f, "store lock poisoned during {}", operation)
            }
            StoreError::NotFound { class_name, id } => {
                write!(f, "object not found: {}:{}", class_name, id)
            }
            StoreError::Serde(msg) => write!(f, "object serialization error: {}", msg),
            StoreError::Backend(msg) => write!(f, "store error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

pub use in_memory::InMemoryObjectStore;
