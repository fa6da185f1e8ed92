use std::fmt;

use crate::store::StoreError;

/// Error type for object operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectError {
    /// The class validator rejected the attributes.
    Invalid(String),
    /// Save/destroy on a class without a backing store.
    NoStore(String),
    /// The store failed.
    Store(StoreError),
}

impl fmt::Display for ObjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectError::Invalid(msg) => write!(f, "invalid attributes: {}", msg),
            ObjectError::NoStore(class_name) => {
                write!(f, "class {} has no store configured", class_name)
            }
            ObjectError::Store(err) => write!(f, "store error: {}", err),
        }
    }
}

impl std::error::Error for ObjectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ObjectError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ObjectError {
    fn from(err: StoreError) -> Self {
        ObjectError::Store(err)
    }
}
