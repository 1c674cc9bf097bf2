//! Extension strategy middleware.
//!
//! Outgoing operations are tagged with `extensions.possibleTypes = true`,
//! signalling a cooperating server to attach the relation data it
//! computed server-side to its response extensions. Incoming relation
//! maps are merged accept-once per concrete type: the first response to
//! describe a type wins, later contributions for that type are ignored
//! wholesale.

use serde_json::Value as Json;

use crate::link::{Forward, Link, ResponseStream};
use crate::operation::{Operation, QueryResponse};
use crate::relations::TypeRelationTable;

use super::POSSIBLE_TYPES_KEY;

/// Middleware for the extension strategy.
pub struct ExtensionLink {
    relations: TypeRelationTable,
}

impl ExtensionLink {
    pub(crate) fn new(relations: TypeRelationTable) -> Self {
        Self { relations }
    }
}

impl Link for ExtensionLink {
    fn request(&self, mut operation: Operation, forward: Forward<'_>) -> ResponseStream {
        // Enable possible-types fetching on the server side.
        operation
            .extensions
            .insert(POSSIBLE_TYPES_KEY.to_string(), Json::Bool(true));

        let relations = self.relations.clone();
        Box::new(
            forward(operation)
                .map(move |item| item.map(|response| absorb(&relations, response))),
        )
    }
}

/// Merges a response's relation payload into the table, passing the
/// response through unmodified.
///
/// An absent extensions field is a normal case (non-cooperating server,
/// or nothing new to report). Malformed entries are skipped by the
/// per-entry guards.
fn absorb(relations: &TypeRelationTable, response: QueryResponse) -> QueryResponse {
    let types = response
        .extensions
        .as_ref()
        .and_then(|extensions| extensions.get(POSSIBLE_TYPES_KEY))
        .and_then(Json::as_object);

    if let Some(types) = types {
        for (concrete, list) in types {
            let Some(entries) = list.as_array() else {
                continue;
            };
            let abstracts = entries
                .iter()
                .filter_map(|entry| entry.as_str().map(str::to_string));
            relations.record_if_absent(concrete, abstracts);
        }
    }

    response
}
