use std::fmt;
use std::sync::Arc;

use super::{parse_id, Attributes, Object, ObjectError, OBJECT_ID};
use crate::query::ClassQuery;
use crate::store::ObjectStore;

/// Attribute validator: `Err(message)` rejects the attributes.
pub type Validator = Arc<dyn Fn(&Attributes) -> Result<(), String> + Send + Sync>;

/// Object constructor: class name, optional validator and optional backing store.
///
/// A collection uses its class to coerce raw attribute bags into objects and,
/// when no query is bound, to build the default query for `fetch`.
#[derive(Clone)]
pub struct ObjectClass {
    name: String,
    validator: Option<Validator>,
    store: Option<Arc<dyn ObjectStore>>,
}

impl ObjectClass {
    pub fn new(name: impl Into<String>) -> Self {
        ObjectClass {
            name: name.into(),
            validator: None,
            store: None,
        }
    }

    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Attributes) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> Option<Arc<dyn ObjectStore>> {
        self.store.clone()
    }

    pub fn validate(&self, attributes: &Attributes) -> Result<(), ObjectError> {
        match &self.validator {
            Some(validator) => validator(attributes).map_err(ObjectError::Invalid),
            None => Ok(()),
        }
    }

    /// Validate `attributes` and construct a new object of this class.
    pub fn build(&self, attributes: Attributes) -> Result<Object, ObjectError> {
        if let Some(id) = attributes.get(OBJECT_ID) {
            parse_id(id.clone())?;
        }
        let object = Object::from_attributes(self.clone(), attributes);
        self.validate(&object.attributes())?;
        Ok(object)
    }

    /// Query over every stored object of this class. `None` without a store.
    pub fn query(&self) -> Option<ClassQuery> {
        self.store.as_ref().map(|_| ClassQuery::new(self.clone()))
    }
}

impl Default for ObjectClass {
    fn default() -> Self {
        ObjectClass::new("Object")
    }
}

impl fmt::Debug for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectClass")
            .field("name", &self.name)
            .field("validator", &self.validator.is_some())
            .field("store", &self.store.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryObjectStore;
    use serde_json::json;

    #[test]
    fn build_runs_validator() {
        let class = ObjectClass::new("Item").with_validator(|attrs: &Attributes| {
            if attrs.contains_key("title") {
                Ok(())
            } else {
                Err("title is required".to_string())
            }
        });

        let err = class.build(Attributes::new()).unwrap_err();
        assert_eq!(err, ObjectError::Invalid("title is required".to_string()));

        let mut attrs = Attributes::new();
        attrs.insert("title".to_string(), json!("ok"));
        let object = class.build(attrs).unwrap();
        assert_eq!(object.class_name(), "Item");
    }

    #[test]
    fn build_rejects_non_string_object_id() {
        let mut attrs = Attributes::new();
        attrs.insert(OBJECT_ID.to_string(), json!(5));

        let err = ObjectClass::new("Item").build(attrs).unwrap_err();
        assert!(matches!(err, ObjectError::Invalid(message) if message.contains(OBJECT_ID)));

        let mut attrs = Attributes::new();
        attrs.insert(OBJECT_ID.to_string(), json!(null));
        assert!(ObjectClass::new("Item").build(attrs).unwrap().is_new());
    }

    #[test]
    fn query_requires_store() {
        assert!(ObjectClass::new("Item").query().is_none());

        let class = ObjectClass::new("Item").with_store(Arc::new(InMemoryObjectStore::new()));
        assert!(class.query().is_some());
    }

    #[test]
    fn default_class_name() {
        let class = ObjectClass::default();
        assert_eq!(class.name(), "Object");
        assert!(format!("{:?}", class).contains("validator: false"));
    }
}
