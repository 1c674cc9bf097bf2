//! Cache reads against the normalized store.
//!
//! Walks a query against stored objects, consulting the fragment
//! matcher once per (object, type-condition) pair. This is the read
//! machinery's reference implementation; its only coupling to the
//! matcher is the synchronous [`FragmentMatcher::matches`] call.

use std::collections::HashMap;

use graphql_parser::query::{FragmentDefinition, Selection, SelectionSet, TypeCondition};
use serde_json::Value as Json;

use crate::ast::{self, QueryDocument};
use crate::matcher::{FragmentMatcher, MatchContext, ObjectReference};
use crate::operation::JsonMap;

use super::store::{as_ref_id, CacheError, ObjectStore, ROOT_QUERY_ID};

type Fragments<'d> = HashMap<&'d str, &'d FragmentDefinition<'static, String>>;

/// Reads `query` out of the store, starting from the root-query object.
///
/// Fragment inclusion is decided by `matcher`; field values follow
/// references into other stored objects.
///
/// # Errors
/// Fails on missing objects or fields, unknown fragment spreads, a
/// document without an operation definition, or a fatal decision-function
/// error (which aborts the read).
pub fn read_query(
    query: &QueryDocument,
    store: &dyn ObjectStore,
    matcher: &FragmentMatcher,
) -> Result<JsonMap, CacheError> {
    let fragments = ast::fragment_definitions(query);
    let selection_set =
        ast::first_operation_selection_set(query).ok_or(CacheError::NoOperation)?;
    read_object(selection_set, ROOT_QUERY_ID, &fragments, store, matcher)
}

fn read_object(
    set: &SelectionSet<'static, String>,
    id: &str,
    fragments: &Fragments<'_>,
    store: &dyn ObjectStore,
    matcher: &FragmentMatcher,
) -> Result<JsonMap, CacheError> {
    let object = store
        .resolve(id)
        .ok_or_else(|| CacheError::ObjectNotFound(id.to_string()))?;
    let mut out = JsonMap::new();
    read_into(set, id, &object, &mut out, fragments, store, matcher)?;
    Ok(out)
}

fn read_into(
    set: &SelectionSet<'static, String>,
    id: &str,
    object: &JsonMap,
    out: &mut JsonMap,
    fragments: &Fragments<'_>,
    store: &dyn ObjectStore,
    matcher: &FragmentMatcher,
) -> Result<(), CacheError> {
    for selection in &set.items {
        match selection {
            Selection::Field(field) => {
                let response_key = field.alias.clone().unwrap_or_else(|| field.name.clone());
                let value = object.get(&field.name).ok_or_else(|| CacheError::FieldMissing {
                    id: id.to_string(),
                    field: field.name.clone(),
                })?;
                let completed =
                    complete_value(value, &field.selection_set, fragments, store, matcher)?;
                out.insert(response_key, completed);
            }
            Selection::InlineFragment(inline) => {
                let applies = match &inline.type_condition {
                    None => true,
                    Some(TypeCondition::On(condition)) => matcher.matches(
                        &ObjectReference::new(id),
                        condition,
                        &MatchContext::new(store),
                    )?,
                };
                if applies {
                    read_into(&inline.selection_set, id, object, out, fragments, store, matcher)?;
                }
            }
            Selection::FragmentSpread(spread) => {
                let fragment = fragments
                    .get(spread.fragment_name.as_str())
                    .ok_or_else(|| CacheError::UnknownFragment(spread.fragment_name.clone()))?;
                let TypeCondition::On(condition) = &fragment.type_condition;
                let applies = matcher.matches(
                    &ObjectReference::new(id),
                    condition,
                    &MatchContext::new(store),
                )?;
                if applies {
                    read_into(
                        &fragment.selection_set,
                        id,
                        object,
                        out,
                        fragments,
                        store,
                        matcher,
                    )?;
                }
            }
        }
    }
    Ok(())
}

fn complete_value(
    value: &Json,
    set: &SelectionSet<'static, String>,
    fragments: &Fragments<'_>,
    store: &dyn ObjectStore,
    matcher: &FragmentMatcher,
) -> Result<Json, CacheError> {
    if set.items.is_empty() {
        return Ok(value.clone());
    }
    if let Json::Array(items) = value {
        let completed: Result<Vec<Json>, CacheError> = items
            .iter()
            .map(|item| complete_value(item, set, fragments, store, matcher))
            .collect();
        return completed.map(Json::Array);
    }
    if let Some(child_id) = as_ref_id(value) {
        return read_object(set, child_id, fragments, store, matcher).map(Json::Object);
    }
    Ok(value.clone())
}
