//! # fragql - Progressive fragment matching for GraphQL clients
//!
//! fragql decides, at query-execution time, whether a concrete runtime
//! object satisfies an abstract (union/interface) type condition from a
//! query fragment - without the client holding the full abstract-type
//! hierarchy up front. The hierarchy is discovered progressively by one
//! of two interchangeable population strategies layered on the
//! request/response pipeline.
//!
//! ## Core Concepts
//!
//! - **`TypeRelationTable`**: session-scoped mapping from concrete type
//!   to the abstract types it is known to satisfy
//! - **`FragmentMatcher`**: the synchronous decision function consulted
//!   per (object, fragment) pair during cache reads
//! - **Strategies**: `extension` (a cooperating server attaches relation
//!   data to response extensions) and `introspection` (outgoing queries
//!   are rewritten to request missing relations inline)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fragql::{FragmentMatcher, Operation, Pipeline, Strategy};
//!
//! let matcher = FragmentMatcher::with_strategy(Strategy::Introspection);
//! let pipeline = Pipeline::new(transport).with_link(matcher.link());
//!
//! for result in pipeline.execute(Operation::parse(query)?) {
//!     // relation data has been absorbed by the time results arrive
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod ast;
pub mod cache;
pub mod error;
pub mod link;
pub mod matcher;
pub mod operation;
pub mod relations;
pub mod strategy;

// Re-export primary types at crate root for convenience
pub use cache::{
    read_query, write_query, CacheError, InMemoryObjectStore, ObjectStore, StoredObject,
    ROOT_QUERY_ID,
};
pub use error::{ConfigError, FragqlError, FragqlResult, MatchError, TransportError};
pub use link::{
    response_channel, Forward, Link, Pipeline, ResponseSender, ResponseStream, Transport,
    TransportResult,
};
pub use matcher::{FragmentMatcher, MatchContext, ObjectReference};
pub use operation::{JsonMap, Operation, QueryResponse, ResponseError};
pub use relations::TypeRelationTable;
pub use strategy::{ExtensionLink, IntrospectionLink, Strategy};
