//! The type relation table.
//!
//! A process-scoped mapping from concrete type name to the set of
//! abstract (union/interface) type names it has been confirmed to
//! satisfy. The table starts empty and is populated progressively by the
//! active strategy's middleware; the decision function consults it on
//! every fragment encountered during a cache read.
//!
//! Pairs are never removed and never overwritten. The two record
//! operations implement the two merge policies the strategies rely on:
//! whole-entry accept-once for server-supplied relation maps, and
//! per-pair additive union for introspected relations.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

/// Shared handle to the type relation table.
///
/// Cloning the handle shares the underlying table: the decision function
/// and the strategy middleware operate on the same state. All mutations
/// are idempotent unions, so a lock poisoned by a panicking reader is
/// recovered rather than propagated.
#[derive(Debug, Clone, Default)]
pub struct TypeRelationTable {
    inner: Arc<RwLock<HashMap<String, HashSet<String>>>>,
}

impl TypeRelationTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a whole entry for `concrete`, but only if the table has no
    /// entry for it at all yet.
    ///
    /// This is the extension strategy's merge policy: the first response
    /// to describe a concrete type wins, and later contributions for the
    /// same type are ignored wholesale. Returns true if the entry was
    /// accepted.
    pub fn record_if_absent<I, S>(&self, concrete: &str, abstract_types: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if map.contains_key(concrete) {
            return false;
        }
        map.insert(
            concrete.to_string(),
            abstract_types.into_iter().map(Into::into).collect(),
        );
        true
    }

    /// Records a single (concrete, abstract) pair, independent of any
    /// other pairs already known for `concrete`.
    ///
    /// This is the introspection strategy's merge policy: a concrete type
    /// accumulates memberships over the session, each recorded at most
    /// once. Returns true if the pair was newly inserted.
    pub fn record_additive(&self, concrete: &str, abstract_type: &str) -> bool {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.entry(concrete.to_string())
            .or_default()
            .insert(abstract_type.to_string())
    }

    /// Guarantees at least an (possibly empty) entry exists for `name`.
    ///
    /// Idempotent. The introspection strategy marks every abstract type it
    /// has requested this way, so the same type is never requested twice
    /// even when the server reports no implementers.
    pub fn ensure_entry(&self, name: &str) {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.entry(name.to_string()).or_default();
    }

    /// Returns true if `concrete` has been confirmed to satisfy
    /// `abstract_type`.
    #[must_use]
    pub fn contains(&self, concrete: &str, abstract_type: &str) -> bool {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(concrete).is_some_and(|set| set.contains(abstract_type))
    }

    /// Returns true if the table has an entry for `name`, even an empty
    /// one.
    #[must_use]
    pub fn knows_type(&self, name: &str) -> bool {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.contains_key(name)
    }

    /// Number of concrete types with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.len()
    }

    /// Returns true if no entries have been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
