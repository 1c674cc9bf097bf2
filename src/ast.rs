//! Query AST helpers.
//!
//! The crate stores queries as owned `graphql-parser` documents. This
//! module wraps parsing, the traversal that collects fragment type
//! conditions, and the synthesizer that builds the introspection
//! selections the introspection strategy splices into outgoing queries.
//!
//! Rewrites are pure: they clone the input document and return a new
//! tree, leaving the caller's query value untouched.

use std::collections::HashMap;

use graphql_parser::query::{
    Definition, Document, Field, FragmentDefinition, OperationDefinition, ParseError, Selection,
    SelectionSet, TypeCondition, Value,
};
use graphql_parser::Pos;

/// An owned query document.
pub type QueryDocument = Document<'static, String>;

/// An owned selection node, ready to splice into a selection set.
pub type QuerySelection = Selection<'static, String>;

/// Parses a query into an owned document.
///
/// # Errors
/// Returns the parser's error for syntactically invalid queries.
pub fn parse_query(text: &str) -> Result<QueryDocument, ParseError> {
    graphql_parser::parse_query::<String>(text).map(|document| document.into_static())
}

/// The response-field alias used for a synthesized introspection
/// selection: the type name wrapped in double underscores.
///
/// The delimiter keeps synthetic fields from colliding with user-selected
/// fields of the same name.
#[must_use]
pub fn introspection_alias(type_name: &str) -> String {
    format!("__{type_name}__")
}

/// Collects the distinct fragment type-condition names referenced by a
/// query, in first-encounter document order.
///
/// Both inline fragments (at any nesting depth) and named fragment
/// definitions are visited.
#[must_use]
pub fn fragment_type_conditions(document: &QueryDocument) -> Vec<String> {
    let mut names = Vec::new();
    for definition in &document.definitions {
        match definition {
            Definition::Operation(operation) => {
                collect_conditions(operation_selection_set(operation), &mut names);
            }
            Definition::Fragment(fragment) => {
                let TypeCondition::On(name) = &fragment.type_condition;
                push_distinct(&mut names, name);
                collect_conditions(&fragment.selection_set, &mut names);
            }
        }
    }
    names
}

/// Builds the selection requesting the concrete types implementing
/// `type_name`:
///
/// ```graphql
/// __TypeName__: __type(name: "TypeName") { possibleTypes { name } }
/// ```
///
/// Pure; the result is ready to splice into a top-level selection set.
#[must_use]
pub fn possible_types_selection(type_name: &str) -> QuerySelection {
    let name_field = leaf_field(None, "name");
    let possible_types = field(None, "possibleTypes", Vec::new(), vec![name_field]);
    field(
        Some(introspection_alias(type_name)),
        "__type",
        vec![("name".to_string(), Value::String(type_name.to_string()))],
        vec![possible_types],
    )
}

/// Returns a new document with one synthesized introspection selection
/// per entry of `type_names` appended to the top-level selection set of
/// the first operation definition.
///
/// The input document is not modified. Documents without an operation
/// definition (fragment-only documents) are returned as plain clones.
#[must_use]
pub fn with_introspection_selections(
    document: &QueryDocument,
    type_names: &[String],
) -> QueryDocument {
    let mut rewritten = document.clone();
    if type_names.is_empty() {
        return rewritten;
    }

    let operation = rewritten.definitions.iter_mut().find_map(|definition| {
        match definition {
            Definition::Operation(operation) => Some(operation),
            Definition::Fragment(_) => None,
        }
    });

    if let Some(operation) = operation {
        let selection_set = operation_selection_set_mut(operation);
        for type_name in type_names {
            selection_set.items.push(possible_types_selection(type_name));
        }
    }
    rewritten
}

/// The top-level selection set of an operation definition, regardless of
/// operation kind.
pub(crate) fn operation_selection_set<'d>(
    operation: &'d OperationDefinition<'static, String>,
) -> &'d SelectionSet<'static, String> {
    match operation {
        OperationDefinition::SelectionSet(set) => set,
        OperationDefinition::Query(query) => &query.selection_set,
        OperationDefinition::Mutation(mutation) => &mutation.selection_set,
        OperationDefinition::Subscription(subscription) => &subscription.selection_set,
    }
}

/// The top-level selection set of the first operation definition.
pub(crate) fn first_operation_selection_set(
    document: &QueryDocument,
) -> Option<&SelectionSet<'static, String>> {
    document.definitions.iter().find_map(|definition| match definition {
        Definition::Operation(operation) => Some(operation_selection_set(operation)),
        Definition::Fragment(_) => None,
    })
}

/// Named fragment definitions of a document, keyed by fragment name.
pub(crate) fn fragment_definitions(
    document: &QueryDocument,
) -> HashMap<&str, &FragmentDefinition<'static, String>> {
    document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Fragment(fragment) => Some((fragment.name.as_str(), fragment)),
            Definition::Operation(_) => None,
        })
        .collect()
}

fn operation_selection_set_mut<'d>(
    operation: &'d mut OperationDefinition<'static, String>,
) -> &'d mut SelectionSet<'static, String> {
    match operation {
        OperationDefinition::SelectionSet(set) => set,
        OperationDefinition::Query(query) => &mut query.selection_set,
        OperationDefinition::Mutation(mutation) => &mut mutation.selection_set,
        OperationDefinition::Subscription(subscription) => &mut subscription.selection_set,
    }
}

fn collect_conditions(set: &SelectionSet<'static, String>, names: &mut Vec<String>) {
    for selection in &set.items {
        match selection {
            Selection::Field(field) => collect_conditions(&field.selection_set, names),
            Selection::InlineFragment(inline) => {
                if let Some(TypeCondition::On(name)) = &inline.type_condition {
                    push_distinct(names, name);
                }
                collect_conditions(&inline.selection_set, names);
            }
            // Spreads reference a definition visited at the document
            // level; the spread itself carries no type condition.
            Selection::FragmentSpread(_) => {}
        }
    }
}

fn push_distinct(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|existing| existing == name) {
        names.push(name.to_string());
    }
}

fn field(
    alias: Option<String>,
    name: &str,
    arguments: Vec<(String, Value<'static, String>)>,
    items: Vec<QuerySelection>,
) -> QuerySelection {
    let pos = Pos::default();
    Selection::Field(Field {
        position: pos,
        alias,
        name: name.to_string(),
        arguments,
        directives: Vec::new(),
        selection_set: SelectionSet {
            span: (pos, pos),
            items,
        },
    })
}

fn leaf_field(alias: Option<String>, name: &str) -> QuerySelection {
    field(alias, name, Vec::new(), Vec::new())
}
