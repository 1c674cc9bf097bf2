//! Response normalization into the store.
//!
//! Walks a query against its response payload and materializes the
//! objects it selected: scalars inline, nested objects as separate store
//! entries pointed at by references. Object identity is `Type:id` when
//! the payload carries both `__typename` and a string `id`, otherwise it
//! is derived from the parent identity and the field path, so embedded
//! objects normalize deterministically.
//!
//! Fragments are included on exact `__typename` match or a currently
//! known table relation; payload objects without `__typename` are
//! written permissively. This write-side heuristic is intentionally
//! looser than the read-side decision function, which owns the fatal
//! missing-`__typename` rule.

use std::collections::HashMap;

use graphql_parser::query::{FragmentDefinition, Selection, SelectionSet, TypeCondition};
use serde_json::Value as Json;

use crate::ast::{self, QueryDocument};
use crate::operation::JsonMap;
use crate::relations::TypeRelationTable;

use super::store::{make_ref, CacheError, InMemoryObjectStore, ROOT_QUERY_ID};

type Fragments<'d> = HashMap<&'d str, &'d FragmentDefinition<'static, String>>;

/// Normalizes `data` (a response payload for `query`) into the store.
///
/// Payload keys the query does not select — including the synthetic
/// `__<TypeName>__` introspection aliases — are ignored; selected fields
/// absent from the payload are skipped.
///
/// # Errors
/// Fails on fragment spreads the document does not define, or when the
/// document has no operation definition.
pub fn write_query(
    query: &QueryDocument,
    data: &JsonMap,
    relations: &TypeRelationTable,
    store: &InMemoryObjectStore,
) -> Result<(), CacheError> {
    let fragments = ast::fragment_definitions(query);
    let selection_set =
        ast::first_operation_selection_set(query).ok_or(CacheError::NoOperation)?;
    write_selection_set(selection_set, data, ROOT_QUERY_ID, &fragments, relations, store)
}

fn write_selection_set(
    set: &SelectionSet<'static, String>,
    data: &JsonMap,
    id: &str,
    fragments: &Fragments<'_>,
    relations: &TypeRelationTable,
    store: &InMemoryObjectStore,
) -> Result<(), CacheError> {
    for selection in &set.items {
        match selection {
            Selection::Field(field) => {
                let response_key = field.alias.as_deref().unwrap_or(&field.name);
                let Some(value) = data.get(response_key) else {
                    continue;
                };
                let stored = store_value(
                    value,
                    id,
                    &field.name,
                    &field.selection_set,
                    fragments,
                    relations,
                    store,
                )?;
                store.set_field(id, &field.name, stored);
            }
            Selection::InlineFragment(inline) => {
                let applies = match &inline.type_condition {
                    None => true,
                    Some(TypeCondition::On(condition)) => {
                        fragment_applies(data, condition, relations)
                    }
                };
                if applies {
                    write_selection_set(&inline.selection_set, data, id, fragments, relations, store)?;
                }
            }
            Selection::FragmentSpread(spread) => {
                let fragment = fragments
                    .get(spread.fragment_name.as_str())
                    .ok_or_else(|| CacheError::UnknownFragment(spread.fragment_name.clone()))?;
                let TypeCondition::On(condition) = &fragment.type_condition;
                if fragment_applies(data, condition, relations) {
                    write_selection_set(
                        &fragment.selection_set,
                        data,
                        id,
                        fragments,
                        relations,
                        store,
                    )?;
                }
            }
        }
    }
    Ok(())
}

fn store_value(
    value: &Json,
    parent_id: &str,
    path: &str,
    set: &SelectionSet<'static, String>,
    fragments: &Fragments<'_>,
    relations: &TypeRelationTable,
    store: &InMemoryObjectStore,
) -> Result<Json, CacheError> {
    if set.items.is_empty() {
        return Ok(value.clone());
    }
    match value {
        Json::Array(items) => {
            let stored: Result<Vec<Json>, CacheError> = items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    store_value(
                        item,
                        parent_id,
                        &format!("{path}.{index}"),
                        set,
                        fragments,
                        relations,
                        store,
                    )
                })
                .collect();
            stored.map(Json::Array)
        }
        Json::Object(object) => {
            let object_id = identify(object, parent_id, path);
            write_selection_set(set, object, &object_id, fragments, relations, store)?;
            // Persist the payload's __typename even when not selected:
            // the decision function requires it on every stored object.
            if let Some(typename) = object.get("__typename") {
                store.set_field(&object_id, "__typename", typename.clone());
            }
            Ok(make_ref(&object_id))
        }
        // Null results and scalars under a composite selection are
        // stored as-is.
        other => Ok(other.clone()),
    }
}

fn identify(object: &JsonMap, parent_id: &str, path: &str) -> String {
    let typename = object.get("__typename").and_then(Json::as_str);
    let key = object.get("id").and_then(Json::as_str);
    match (typename, key) {
        (Some(typename), Some(key)) => format!("{typename}:{key}"),
        _ => format!("{parent_id}.{path}"),
    }
}

fn fragment_applies(data: &JsonMap, condition: &str, relations: &TypeRelationTable) -> bool {
    match data.get("__typename").and_then(Json::as_str) {
        None => true,
        Some(typename) => typename == condition || relations.contains(typename, condition),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::ast::parse_query;
    use crate::cache::store::{as_ref_id, ObjectStore};

    fn data(value: serde_json::Value) -> JsonMap {
        value.as_object().cloned().unwrap()
    }

    fn write(query: &str, payload: serde_json::Value) -> InMemoryObjectStore {
        let store = InMemoryObjectStore::new();
        let relations = TypeRelationTable::new();
        write_query(&parse_query(query).unwrap(), &data(payload), &relations, &store).unwrap();
        store
    }

    #[test]
    fn scalar_fields_land_on_the_root_object() {
        let store = write("{ field }", json!({ "field": "bar" }));
        let root = store.resolve(ROOT_QUERY_ID).unwrap();
        assert_eq!(root["field"], json!("bar"));
    }

    #[test]
    fn nested_objects_are_normalized_behind_references() {
        let store = write(
            "{ obj { field } }",
            json!({ "obj": { "__typename": "Obj", "field": "bar" } }),
        );

        let root = store.resolve(ROOT_QUERY_ID).unwrap();
        let child_id = as_ref_id(&root["obj"]).unwrap().to_string();
        assert_eq!(child_id, "ROOT_QUERY.obj");

        let child = store.resolve(&child_id).unwrap();
        assert_eq!(child["field"], json!("bar"));
        assert_eq!(child["__typename"], json!("Obj"));
    }

    #[test]
    fn id_fields_determine_object_identity() {
        let store = write(
            "{ obj { id field } }",
            json!({ "obj": { "__typename": "Obj", "id": "1", "field": "bar" } }),
        );

        let root = store.resolve(ROOT_QUERY_ID).unwrap();
        assert_eq!(as_ref_id(&root["obj"]), Some("Obj:1"));
        assert!(store.resolve("Obj:1").is_some());
    }

    #[test]
    fn list_elements_get_indexed_identities() {
        let store = write(
            "{ items { field } }",
            json!({ "items": [
                { "__typename": "Item", "field": "a" },
                { "__typename": "Item", "field": "b" }
            ] }),
        );

        let root = store.resolve(ROOT_QUERY_ID).unwrap();
        let refs = root["items"].as_array().unwrap();
        assert_eq!(as_ref_id(&refs[0]), Some("ROOT_QUERY.items.0"));
        assert_eq!(as_ref_id(&refs[1]), Some("ROOT_QUERY.items.1"));
        assert_eq!(
            store.resolve("ROOT_QUERY.items.1").unwrap()["field"],
            json!("b")
        );
    }

    #[test]
    fn aliased_fields_store_under_field_name() {
        let store = write("{ renamed: field }", json!({ "renamed": "bar" }));
        let root = store.resolve(ROOT_QUERY_ID).unwrap();
        assert_eq!(root["field"], json!("bar"));
        assert!(!root.contains_key("renamed"));
    }

    #[test]
    fn unselected_payload_keys_are_ignored() {
        let store = write(
            "{ field }",
            json!({ "field": "bar", "__Character__": { "possibleTypes": [] } }),
        );
        let root = store.resolve(ROOT_QUERY_ID).unwrap();
        assert!(!root.contains_key("__Character__"));
    }

    #[test]
    fn fragments_apply_by_exact_type_or_relation() {
        let query = parse_query(
            "{ obj { ... on Obj { own } ... on Parent { inherited } ... on Other { unrelated } } }",
        )
        .unwrap();
        let relations = TypeRelationTable::new();
        relations.record_additive("Obj", "Parent");
        let store = InMemoryObjectStore::new();

        write_query(
            &query,
            &data(json!({ "obj": {
                "__typename": "Obj",
                "own": 1,
                "inherited": 2,
                "unrelated": 3
            } })),
            &relations,
            &store,
        )
        .unwrap();

        let child = store.resolve("ROOT_QUERY.obj").unwrap();
        assert_eq!(child["own"], json!(1));
        assert_eq!(child["inherited"], json!(2));
        assert!(!child.contains_key("unrelated"));
    }

    #[test]
    fn unknown_spread_is_an_error() {
        let query = parse_query("{ obj { ...ghost } }").unwrap();
        let err = write_query(
            &query,
            &data(json!({ "obj": { "__typename": "Obj" } })),
            &TypeRelationTable::new(),
            &InMemoryObjectStore::new(),
        )
        .unwrap_err();
        assert!(matches!(err, CacheError::UnknownFragment(_)));
    }

    #[test]
    fn null_composite_fields_store_null() {
        let store = write("{ obj { field } }", json!({ "obj": null }));
        let root = store.resolve(ROOT_QUERY_ID).unwrap();
        assert_eq!(root["obj"], Json::Null);
    }
}
