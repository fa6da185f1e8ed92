//! InMemoryObjectStore - HashMap-backed object store for testing and development.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use rand::distr::Alphanumeric;
use rand::Rng;

use super::{ObjectStore, StoreError, StoredObject};
use crate::object::Attributes;

const ID_LENGTH: usize = 10;

/// Internal stored representation of an object.
struct StoredRecord {
    bytes: Vec<u8>,
    version: u64,
    sequence: u64,
}

#[derive(Default)]
struct Storage {
    records: HashMap<String, StoredRecord>,
    next_sequence: u64,
}

/// In-memory object store backed by a HashMap.
///
/// Storage key is `"Class:id"`. Clone-friendly via Arc.
#[derive(Clone)]
pub struct InMemoryObjectStore {
    storage: Arc<RwLock<Storage>>,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryObjectStore {
    /// Create a new empty object store.
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(Storage::default())),
        }
    }

    fn make_key(class_name: &str, id: &str) -> String {
        format!("{}:{}", class_name, id)
    }

    fn generate_id() -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(ID_LENGTH)
            .map(char::from)
            .collect()
    }

    /// Number of records stored for a class.
    pub fn count(&self, class_name: &str) -> Result<usize, StoreError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::LockPoisoned("count"))?;
        let prefix = format!("{}:", class_name);
        Ok(storage
            .records
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .count())
    }

    fn save_record(
        &self,
        class_name: &str,
        id: Option<&str>,
        attributes: &Attributes,
    ) -> Result<String, StoreError> {
        let bytes = serde_json::to_vec(attributes).map_err(|e| StoreError::Serde(e.to_string()))?;

        let mut storage = self
            .storage
            .write()
            .map_err(|_| StoreError::LockPoisoned("save"))?;

        match id {
            Some(id) => {
                let key = Self::make_key(class_name, id);
                let record =
                    storage
                        .records
                        .get_mut(&key)
                        .ok_or_else(|| StoreError::NotFound {
                            class_name: class_name.to_string(),
                            id: id.to_string(),
                        })?;
                record.bytes = bytes;
                record.version += 1;
                Ok(id.to_string())
            }
            None => {
                let mut id = Self::generate_id();
                while storage
                    .records
                    .contains_key(&Self::make_key(class_name, &id))
                {
                    id = Self::generate_id();
                }

                storage.next_sequence += 1;
                let sequence = storage.next_sequence;
                storage.records.insert(
                    Self::make_key(class_name, &id),
                    StoredRecord {
                        bytes,
                        version: 1,
                        sequence,
                    },
                );
                Ok(id)
            }
        }
    }

    fn destroy_record(&self, class_name: &str, id: &str) -> Result<bool, StoreError> {
        let key = Self::make_key(class_name, id);
        let mut storage = self
            .storage
            .write()
            .map_err(|_| StoreError::LockPoisoned("destroy"))?;

        Ok(storage.records.remove(&key).is_some())
    }

    fn find_records(&self, class_name: &str) -> Result<Vec<StoredObject>, StoreError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::LockPoisoned("find"))?;

        let prefix = format!("{}:", class_name);
        let mut results = Vec::new();

        for (key, stored) in storage.records.iter() {
            if let Some(id) = key.strip_prefix(&prefix) {
                let attributes: Attributes = serde_json::from_slice(&stored.bytes)
                    .map_err(|e| StoreError::Serde(e.to_string()))?;
                results.push((
                    stored.sequence,
                    StoredObject {
                        id: id.to_string(),
                        attributes,
                        version: stored.version,
                    },
                ));
            }
        }

        results.sort_by_key(|(sequence, _)| *sequence);
        Ok(results.into_iter().map(|(_, object)| object).collect())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn save(
        &self,
        class_name: &str,
        id: Option<&str>,
        attributes: &Attributes,
    ) -> Result<String, StoreError> {
        self.save_record(class_name, id, attributes)
    }

    async fn destroy(&self, class_name: &str, id: &str) -> Result<bool, StoreError> {
        self.destroy_record(class_name, id)
    }

    async fn find(&self, class_name: &str) -> Result<Vec<StoredObject>, StoreError> {
        self.find_records(class_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> Attributes {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[tokio::test]
    async fn save_assigns_id() {
        let store = InMemoryObjectStore::new();
        let id = store
            .save("Score", None, &attrs(json!({"points": 10})))
            .await
            .unwrap();

        assert_eq!(id.len(), ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));

        let found = store.find("Score").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
        assert_eq!(found[0].version, 1);
        assert_eq!(found[0].attributes["points"], json!(10));

        let exported = serde_json::to_value(&found[0]).unwrap();
        assert_eq!(exported, json!({"id": id, "attributes": {"points": 10}, "version": 1}));
        let imported: StoredObject = serde_json::from_value(exported).unwrap();
        assert_eq!(imported, found[0]);
    }

    #[tokio::test]
    async fn save_existing_increments_version() {
        let store = InMemoryObjectStore::new();
        let id = store
            .save("Score", None, &attrs(json!({"points": 1})))
            .await
            .unwrap();
        let again = store
            .save("Score", Some(&id), &attrs(json!({"points": 2})))
            .await
            .unwrap();
        assert_eq!(again, id);

        let found = store.find("Score").await.unwrap();
        assert_eq!(found[0].version, 2);
        assert_eq!(found[0].attributes["points"], json!(2));
    }

    #[tokio::test]
    async fn save_unknown_id_fails() {
        let store = InMemoryObjectStore::new();
        let err = store
            .save("Score", Some("missing"), &Attributes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn find_is_scoped_to_class_and_ordered() {
        let store = InMemoryObjectStore::new();
        let first = store.save("Score", None, &Attributes::new()).await.unwrap();
        store.save("Player", None, &Attributes::new()).await.unwrap();
        let second = store.save("Score", None, &Attributes::new()).await.unwrap();

        let ids: Vec<String> = store
            .find("Score")
            .await
            .unwrap()
            .into_iter()
            .map(|object| object.id)
            .collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(store.count("Player").unwrap(), 1);
    }

    #[tokio::test]
    async fn destroy_existing_and_missing() {
        let store = InMemoryObjectStore::new();
        let id = store.save("Score", None, &Attributes::new()).await.unwrap();

        assert!(store.destroy("Score", &id).await.unwrap());
        assert!(!store.destroy("Score", &id).await.unwrap());
        assert_eq!(store.count("Score").unwrap(), 0);
    }

    #[tokio::test]
    async fn clone_shares_storage() {
        let store = InMemoryObjectStore::new();
        let clone = store.clone();

        store.save("Score", None, &Attributes::new()).await.unwrap();
        assert_eq!(clone.count("Score").unwrap(), 1);
    }
}
