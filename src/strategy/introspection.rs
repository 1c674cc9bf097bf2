//! Introspection strategy middleware.
//!
//! Outgoing queries are inspected for fragment type conditions the table
//! does not know yet; one synthesized `__type(name: …)` selection per
//! missing name is spliced into the top-level selection set. The
//! implementer lists come back in the ordinary response data under the
//! `__Name__` aliases and are merged additively, pair by pair.
//!
//! Per-request state (the names requested by one rewrite) lives in the
//! closure mapping that request's result stream, so interleaved in-flight
//! operations never observe each other's pending set.

use serde_json::Value as Json;

use crate::ast;
use crate::link::{Forward, Link, ResponseStream};
use crate::operation::{Operation, QueryResponse};
use crate::relations::TypeRelationTable;

use super::POSSIBLE_TYPES_KEY;

/// Middleware for the introspection strategy.
pub struct IntrospectionLink {
    relations: TypeRelationTable,
}

impl IntrospectionLink {
    pub(crate) fn new(relations: TypeRelationTable) -> Self {
        Self { relations }
    }
}

impl Link for IntrospectionLink {
    fn request(&self, operation: Operation, forward: Forward<'_>) -> ResponseStream {
        let pending: Vec<String> = ast::fragment_type_conditions(&operation.query)
            .into_iter()
            .filter(|name| !self.relations.knows_type(name))
            .collect();

        if pending.is_empty() {
            return forward(operation);
        }

        // The rewrite builds a new query value; the caller's document is
        // never edited in place.
        let query = ast::with_introspection_selections(&operation.query, &pending);
        let operation = Operation { query, ..operation };

        let relations = self.relations.clone();
        Box::new(
            forward(operation)
                .map(move |item| item.map(|response| absorb(&relations, &pending, response))),
        )
    }
}

/// Records the implementer lists answered for this request's pending
/// names, passing the response through with its synthetic aliased fields
/// left in place.
fn absorb(
    relations: &TypeRelationTable,
    pending: &[String],
    response: QueryResponse,
) -> QueryResponse {
    for type_name in pending {
        // Mark the type as seen even when the server reports no
        // implementers, so it is never requested again.
        relations.ensure_entry(type_name);

        let entries = response
            .data
            .as_ref()
            .and_then(|data| data.get(&ast::introspection_alias(type_name)))
            .and_then(|lookup| lookup.get(POSSIBLE_TYPES_KEY))
            .and_then(Json::as_array);

        let Some(entries) = entries else {
            continue;
        };
        for entry in entries {
            let Some(implementer) = entry.get("name").and_then(Json::as_str) else {
                continue;
            };
            relations.record_additive(implementer, type_name);
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use serde_json::json;

    use crate::operation::JsonMap;

    fn data(value: serde_json::Value) -> JsonMap {
        value.as_object().cloned().unwrap()
    }

    fn run(
        link: &IntrospectionLink,
        query: &str,
        response: QueryResponse,
    ) -> (String, Vec<QueryResponse>) {
        let forwarded = RefCell::new(String::new());
        let results: Vec<_> = link
            .request(
                Operation::parse(query).unwrap(),
                Box::new(|op| {
                    *forwarded.borrow_mut() = op.query_string();
                    Box::new(std::iter::once(Ok(response)))
                }),
            )
            .map(Result::unwrap)
            .collect();
        (forwarded.into_inner(), results)
    }

    #[test]
    fn unknown_condition_adds_one_selection() {
        let link = IntrospectionLink::new(TypeRelationTable::new());
        let (forwarded, _) = run(
            &link,
            "{ obj { ... on ParentType { field } } }",
            QueryResponse::default(),
        );

        assert_eq!(forwarded.matches("__ParentType__:").count(), 1);
        assert!(forwarded.contains("__type(name: \"ParentType\")"));
    }

    #[test]
    fn known_condition_is_not_requested_again() {
        let relations = TypeRelationTable::new();
        let link = IntrospectionLink::new(relations.clone());
        let query = "{ obj { ... on ParentType { field } } }";

        let response = QueryResponse::of_data(data(json!({
            "__ParentType__": { "possibleTypes": [{ "name": "Obj" }] }
        })));
        let _ = run(&link, query, response);
        assert!(relations.contains("Obj", "ParentType"));

        // Second issue of the same query: nothing left to request, the
        // operation is forwarded untouched.
        let (forwarded, _) = run(&link, query, QueryResponse::default());
        assert!(!forwarded.contains("__type"));
        assert!(!forwarded.contains("__ParentType__"));
    }

    #[test]
    fn implementers_are_recorded_additively() {
        let relations = TypeRelationTable::new();
        let link = IntrospectionLink::new(relations.clone());

        let response = QueryResponse::of_data(data(json!({
            "__Character__": {
                "possibleTypes": [{ "name": "Human" }, { "name": "Droid" }]
            }
        })));
        let _ = run(
            &link,
            "{ characters { ... on Character { name } } }",
            response,
        );

        assert!(relations.contains("Human", "Character"));
        assert!(relations.contains("Droid", "Character"));
        // The abstract type itself is marked as seen.
        assert!(relations.knows_type("Character"));
    }

    #[test]
    fn empty_answer_still_marks_type_as_seen() {
        let relations = TypeRelationTable::new();
        let link = IntrospectionLink::new(relations.clone());

        let (_, results) = run(
            &link,
            "{ obj { ... on Ghost { field } } }",
            QueryResponse::of_data(data(json!({ "obj": null }))),
        );

        assert_eq!(results.len(), 1);
        assert!(relations.knows_type("Ghost"));
        assert_eq!(relations.len(), 1);
    }

    #[test]
    fn synthetic_fields_stay_in_response_data() {
        let link = IntrospectionLink::new(TypeRelationTable::new());
        let response = QueryResponse::of_data(data(json!({
            "obj": { "__typename": "Obj", "field": "bar" },
            "__Parent__": { "possibleTypes": [{ "name": "Obj" }] }
        })));

        let (_, results) = run(&link, "{ obj { ... on Parent { field } } }", response);
        let map = results[0].data.as_ref().unwrap();
        assert!(map.contains_key("__Parent__"));
        assert!(map.contains_key("obj"));
    }

    #[test]
    fn named_fragment_definitions_are_requested() {
        let link = IntrospectionLink::new(TypeRelationTable::new());
        let (forwarded, _) = run(
            &link,
            "fragment f on Character { name } { characters { ...f } }",
            QueryResponse::default(),
        );

        assert!(forwarded.contains("__Character__:"));
    }

    #[test]
    fn plain_query_is_forwarded_untouched() {
        let link = IntrospectionLink::new(TypeRelationTable::new());
        let (forwarded, _) = run(&link, "{ obj { field } }", QueryResponse::default());
        assert!(!forwarded.contains("__type"));
    }
}
