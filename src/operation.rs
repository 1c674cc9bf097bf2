//! Outgoing operations and incoming results.
//!
//! An [`Operation`] wraps a parsed query together with request metadata
//! and the out-of-band extensions bag middleware may read and write. A
//! [`QueryResponse`] is the transport-shaped result: response data keyed
//! by response-field alias, GraphQL errors, and an optional extensions
//! bag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use uuid::Uuid;

use crate::ast::{self, QueryDocument};
use crate::error::FragqlResult;

/// A JSON object map, the shape of response data and extensions bags.
pub type JsonMap = serde_json::Map<String, Json>;

/// An outgoing request travelling down the pipeline.
#[derive(Debug, Clone)]
pub struct Operation {
    /// Unique identifier for this request (for correlation by callers).
    pub request_id: Uuid,

    /// When this operation was created.
    pub timestamp: DateTime<Utc>,

    /// Optional operation name, for multi-operation documents.
    pub operation_name: Option<String>,

    /// The query in abstract-syntax form.
    pub query: QueryDocument,

    /// Query variables.
    pub variables: JsonMap,

    /// Out-of-band extensions the transport may read and write.
    pub extensions: JsonMap,
}

impl Operation {
    /// Creates a new operation around a parsed query.
    #[must_use]
    pub fn new(query: QueryDocument) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            operation_name: None,
            query,
            variables: JsonMap::new(),
            extensions: JsonMap::new(),
        }
    }

    /// Parses `text` and wraps it as an operation.
    ///
    /// # Errors
    /// Fails on syntactically invalid queries.
    pub fn parse(text: &str) -> FragqlResult<Self> {
        Ok(Self::new(ast::parse_query(text)?))
    }

    /// Sets the operation name.
    #[must_use]
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Adds a variable.
    #[must_use]
    pub fn with_variable(mut self, key: impl Into<String>, value: Json) -> Self {
        self.variables.insert(key.into(), value);
        self
    }

    /// The query printed back to its textual form.
    #[must_use]
    pub fn query_string(&self) -> String {
        self.query.to_string()
    }
}

/// An incoming result travelling back up the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Response data, keyed by response-field alias.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonMap>,

    /// GraphQL errors reported by the server.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ResponseError>,

    /// Optional extensions bag attached by a cooperating server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<JsonMap>,
}

impl QueryResponse {
    /// Creates a response carrying only data.
    #[must_use]
    pub fn of_data(data: JsonMap) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    /// Attaches an extensions bag.
    #[must_use]
    pub fn with_extensions(mut self, extensions: JsonMap) -> Self {
        self.extensions = Some(extensions);
        self
    }
}

/// A GraphQL error entry in a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    /// Human-readable description.
    pub message: String,

    /// Path to the response field the error applies to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Json>,

    /// Server-defined error extensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<JsonMap>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Json) -> JsonMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn parse_wraps_a_query() {
        let op = Operation::parse("{ obj { field } }").unwrap();
        assert!(op.operation_name.is_none());
        assert!(op.extensions.is_empty());
        assert!(op.query_string().contains("obj"));
    }

    #[test]
    fn parse_rejects_invalid_queries() {
        let err = Operation::parse("{ obj { ").unwrap_err();
        assert!(format!("{err}").contains("parse"));
    }

    #[test]
    fn operations_get_distinct_request_ids() {
        let a = Operation::parse("{ f }").unwrap();
        let b = Operation::parse("{ f }").unwrap();
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn builder_style_setters() {
        let op = Operation::parse("query Q($id: ID!) { node(id: $id) { id } }")
            .unwrap()
            .with_operation_name("Q")
            .with_variable("id", json!("42"));
        assert_eq!(op.operation_name.as_deref(), Some("Q"));
        assert_eq!(op.variables.get("id"), Some(&json!("42")));
    }

    #[test]
    fn response_json_roundtrip() {
        let response = QueryResponse::of_data(object(json!({ "field": "bar" })))
            .with_extensions(object(json!({ "possibleTypes": { "Obj": ["Node"] } })));

        let encoded = serde_json::to_string(&response).unwrap();
        let decoded: QueryResponse = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn response_deserializes_with_missing_fields() {
        let decoded: QueryResponse = serde_json::from_str("{}").unwrap();
        assert!(decoded.data.is_none());
        assert!(decoded.errors.is_empty());
        assert!(decoded.extensions.is_none());
    }

    #[test]
    fn error_entries_roundtrip() {
        let response = QueryResponse {
            data: None,
            errors: vec![ResponseError {
                message: "boom".to_string(),
                path: vec![json!("obj"), json!(0)],
                extensions: None,
            }],
            extensions: None,
        };

        let encoded = serde_json::to_string(&response).unwrap();
        let decoded: QueryResponse = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.errors.len(), 1);
        assert_eq!(decoded.errors[0].message, "boom");
    }
}
