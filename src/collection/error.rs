use std::fmt;

use crate::object::ObjectError;
use crate::query::QueryError;

/// Error type for collection operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    /// An attribute bag could not be coerced into an object.
    InvalidModel(String),
    /// Two objects with the same client id.
    DuplicateCid(String),
    /// Two objects with the same server id.
    DuplicateId(String),
    /// `sort` without a comparator.
    MissingComparator,
    /// `fetch` with no query bound, given, or derivable from the model class.
    MissingQuery,
    /// The query failed.
    Query(QueryError),
    /// Saving an object failed.
    Object(ObjectError),
    /// The spawned save task panicked or was cancelled.
    SaveAborted(String),
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionError::InvalidModel(msg) => {
                write!(f, "can't add an invalid model to a collection: {}", msg)
            }
            CollectionError::DuplicateCid(cid) => write!(
                f,
                "duplicate cid {}: can't add the same model to a collection twice",
                cid
            ),
            CollectionError::DuplicateId(id) => write!(
                f,
                "duplicate id {}: can't add the same model to a collection twice",
                id
            ),
            CollectionError::MissingComparator => {
                write!(f, "cannot sort a collection without a comparator")
            }
            CollectionError::MissingQuery => {
                write!(f, "cannot fetch a collection without a query")
            }
            CollectionError::Query(err) => write!(f, "fetch failed: {}", err),
            CollectionError::Object(err) => write!(f, "save failed: {}", err),
            CollectionError::SaveAborted(msg) => write!(f, "save aborted: {}", msg),
        }
    }
}

impl std::error::Error for CollectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectionError::Query(err) => Some(err),
            CollectionError::Object(err) => Some(err),
            _ => None,
        }
    }
}

impl From<QueryError> for CollectionError {
    fn from(err: QueryError) -> Self {
        CollectionError::Query(err)
    }
}

impl From<ObjectError> for CollectionError {
    fn from(err: ObjectError) -> Self {
        CollectionError::Object(err)
    }
}
