//! The normalized object store boundary.
//!
//! Materialized objects are JSON maps keyed by field name. Nested
//! objects are stored as their own entries and pointed at with reference
//! values of the shape `{ "__ref": "<id>" }`.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde_json::Value as Json;
use thiserror::Error;

use crate::operation::JsonMap;

/// Identifier of the synthetic root-query object.
///
/// Root references are created by the query machinery, not by responses,
/// and may never materialize as stored objects.
pub const ROOT_QUERY_ID: &str = "ROOT_QUERY";

/// Field key marking a stored value as a reference to another object.
pub const REF_KEY: &str = "__ref";

/// A materialized object: fields keyed by field name, with at least a
/// `__typename` string for every object produced by a response.
pub type StoredObject = JsonMap;

/// Errors raised by the cache walkers.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A referenced object is not in the store.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// A selected field is missing on a stored object.
    #[error("field '{field}' missing on stored object {id}")]
    FieldMissing {
        /// Identifier of the incomplete object.
        id: String,
        /// The missing field.
        field: String,
    },

    /// A fragment spread names a fragment the document does not define.
    #[error("unknown fragment: {0}")]
    UnknownFragment(String),

    /// The document contains no operation definition to walk.
    #[error("query has no operation definition")]
    NoOperation,

    /// The decision function failed; the read is aborted.
    #[error(transparent)]
    Match(#[from] crate::error::MatchError),
}

/// Read access into the normalized object store.
pub trait ObjectStore: Send + Sync {
    /// Resolves an identifier to a materialized object, or absent.
    fn resolve(&self, id: &str) -> Option<StoredObject>;
}

/// Builds a reference value pointing at `id`.
#[must_use]
pub fn make_ref(id: &str) -> Json {
    let mut map = JsonMap::new();
    map.insert(REF_KEY.to_string(), Json::String(id.to_string()));
    Json::Object(map)
}

/// If `value` is a reference, the identifier it points at.
#[must_use]
pub fn as_ref_id(value: &Json) -> Option<&str> {
    value.as_object()?.get(REF_KEY)?.as_str()
}

/// Thread-safe in-memory store.
///
/// Intended for embedded usage, tests, and as a reference
/// implementation of the store boundary.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl InMemoryObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a whole object.
    pub fn insert(&self, id: impl Into<String>, object: StoredObject) {
        let mut objects = self
            .objects
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        objects.insert(id.into(), object);
    }

    /// Merges one field into an object, creating the object if needed.
    pub fn set_field(&self, id: &str, field: &str, value: Json) {
        let mut objects = self
            .objects
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        objects
            .entry(id.to_string())
            .or_default()
            .insert(field.to_string(), value);
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        objects.len()
    }

    /// Returns true if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn resolve(&self, id: &str) -> Option<StoredObject> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        objects.get(id).cloned()
    }
}
