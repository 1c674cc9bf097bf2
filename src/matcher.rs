//! The progressive fragment matcher.
//!
//! Decides, per (object, type-condition) pair encountered during a cache
//! read, whether a stored object satisfies a fragment's type condition.
//! The abstract-type hierarchy is not known up front; it accumulates in
//! a shared [`TypeRelationTable`] populated by the active strategy's
//! middleware as responses come back.

use std::sync::Arc;

use serde_json::Value as Json;

use crate::cache::{ObjectStore, ROOT_QUERY_ID};
use crate::error::{ConfigError, FragqlResult, MatchError};
use crate::link::Link;
use crate::relations::TypeRelationTable;
use crate::strategy::Strategy;

/// An identifier with lookup capability into the object store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectReference {
    /// The stored object's identifier.
    pub id: String,
}

impl ObjectReference {
    /// Creates a reference to the object identified by `id`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// A reference to the synthetic root-query object.
    #[must_use]
    pub fn root() -> Self {
        Self::new(ROOT_QUERY_ID)
    }
}

/// Store-access context handed to the decision function by the
/// cache-read machinery.
#[derive(Clone, Copy)]
pub struct MatchContext<'a> {
    /// The normalized object store backing the read.
    pub store: &'a dyn ObjectStore,
}

impl<'a> MatchContext<'a> {
    /// Creates a context over `store`.
    #[must_use]
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }
}

/// A fragment matcher with progressively discovered type relations.
///
/// Construct one per client session, register its [`link`](Self::link)
/// in the request pipeline, and hand [`matches`](Self::matches) to the
/// cache-read machinery. All three share one relation table.
#[derive(Debug)]
pub struct FragmentMatcher {
    strategy: Strategy,
    relations: TypeRelationTable,
}

impl FragmentMatcher {
    /// Creates a matcher with the default strategy (extension).
    #[must_use]
    pub fn new() -> Self {
        Self::with_strategy(Strategy::default())
    }

    /// Creates a matcher with an explicit strategy.
    #[must_use]
    pub fn with_strategy(strategy: Strategy) -> Self {
        Self {
            strategy,
            relations: TypeRelationTable::new(),
        }
    }

    /// Creates a matcher from a configuration strategy name.
    ///
    /// # Errors
    /// Unknown names fail here, at construction, listing the valid names.
    pub fn with_strategy_name(name: &str) -> Result<Self, ConfigError> {
        Ok(Self::with_strategy(Strategy::from_name(name)?))
    }

    /// The active strategy.
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// The shared relation table.
    #[must_use]
    pub fn relations(&self) -> &TypeRelationTable {
        &self.relations
    }

    /// The active strategy's middleware, bound to this matcher's table.
    #[must_use]
    pub fn link(&self) -> Arc<dyn Link> {
        self.strategy.link(self.relations.clone())
    }

    /// Readiness probe: no asynchronous initialization is required.
    ///
    /// # Errors
    /// Never fails; the signature matches fragment matchers that do need
    /// setup.
    pub fn ensure_ready(&self) -> FragqlResult<()> {
        Ok(())
    }

    /// Signals the caller it may skip the generic initialization
    /// handshake performed for matchers that need async setup.
    #[must_use]
    pub const fn can_bypass_init(&self) -> bool {
        true
    }

    /// Decides whether the object behind `reference` satisfies
    /// `type_condition`.
    ///
    /// Read-only and cheap: one store resolve plus at most one table
    /// lookup. Called once per (object, fragment) pair during every
    /// cache read.
    ///
    /// An unresolvable reference matches only when it is the
    /// `ROOT_QUERY` sentinel: synthetic root references never
    /// materialize as stored objects, and reads against the root must
    /// still include its fragments. See
    /// apollographql/apollo-client#4620; callers depend on this exact
    /// behavior.
    ///
    /// # Errors
    /// A resolved object without `__typename` is malformed stored data;
    /// the error aborts the in-progress cache read and is not a
    /// recoverable per-call condition.
    pub fn matches(
        &self,
        reference: &ObjectReference,
        type_condition: &str,
        context: &MatchContext<'_>,
    ) -> Result<bool, MatchError> {
        let Some(object) = context.store.resolve(&reference.id) else {
            return Ok(reference.id == ROOT_QUERY_ID);
        };

        let typename = object
            .get("__typename")
            .and_then(Json::as_str)
            .map(str::to_string);
        let Some(typename) = typename else {
            return Err(MatchError::MissingTypename {
                id: reference.id.clone(),
                object: Json::Object(object).to_string(),
            });
        };

        if typename == type_condition {
            return Ok(true);
        }

        Ok(self.relations.contains(&typename, type_condition))
    }
}

impl Default for FragmentMatcher {
    fn default() -> Self {
        Self::new()
    }
}
