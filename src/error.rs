//! Error types for fragql.
//!
//! All errors are strongly typed using thiserror. The core performs no
//! internal retry and no logging; every error propagates synchronously to
//! the construction or cache-read call site that triggered it.

use thiserror::Error;

/// Configuration errors raised at matcher construction.
///
/// These never reach request time: an invalid configuration fails before
/// any middleware is built.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown strategy \"{name}\" (must be one of {expected})")]
    UnknownStrategy {
        name: String,
        expected: String,
    },
}

/// Data-integrity errors raised by the fragment decision function.
#[derive(Debug, Error)]
pub enum MatchError {
    /// A stored object resolved during a cache read carries no
    /// `__typename`. The object graph is malformed; the read is aborted
    /// rather than silently excluding the fragment.
    #[error("cannot match fragment because __typename property is missing: {object}")]
    MissingTypename {
        id: String,
        object: String,
    },
}

/// Transport errors flowing through the request pipeline.
///
/// The core never interprets or suppresses these; middleware passes them
/// through as stream items untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
    },

    #[error("failed to serialize request: {message}")]
    SerializationFailed {
        message: String,
    },

    #[error("failed to deserialize response: {message}")]
    DeserializationFailed {
        message: String,
    },

    #[error("server error (code {code}): {message}")]
    ServerError {
        code: u32,
        message: String,
    },
}

/// Top-level error type for fragql.
///
/// This enum encompasses all possible errors that can occur when using
/// the crate.
#[derive(Debug, Error)]
pub enum FragqlError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("match error: {0}")]
    Match(#[from] MatchError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("cache error: {0}")]
    Cache(#[from] crate::cache::CacheError),

    #[error("query parse error: {0}")]
    Parse(#[from] graphql_parser::query::ParseError),

    #[error("internal error: {message}")]
    Internal {
        message: String,
    },
}

impl FragqlError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is a match (data-integrity) error.
    #[must_use]
    pub const fn is_match(&self) -> bool {
        matches!(self, Self::Match(_))
    }

    /// Returns true if this is a transport error.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if this is a cache error.
    #[must_use]
    pub const fn is_cache(&self) -> bool {
        matches!(self, Self::Cache(_))
    }
}

/// Result type alias for fragql operations.
pub type FragqlResult<T> = Result<T, FragqlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_strategy_lists_valid_names() {
        let err = ConfigError::UnknownStrategy {
            name: "psychic".to_string(),
            expected: "\"extension\", \"introspection\"".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("psychic"));
        assert!(msg.contains("\"extension\""));
        assert!(msg.contains("\"introspection\""));
    }

    #[test]
    fn missing_typename_includes_object() {
        let err = MatchError::MissingTypename {
            id: "obj:1".to_string(),
            object: "{\"field\":\"bar\"}".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("__typename"));
        assert!(msg.contains("field"));
    }

    #[test]
    fn transport_error_display() {
        let err = TransportError::ServerError {
            code: 502,
            message: "bad gateway".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("502"));
        assert!(msg.contains("bad gateway"));
    }

    #[test]
    fn fragql_error_from_config() {
        let err: FragqlError = ConfigError::UnknownStrategy {
            name: "x".to_string(),
            expected: "\"extension\"".to_string(),
        }
        .into();
        assert!(err.is_config());
        assert!(!err.is_transport());
    }

    #[test]
    fn fragql_error_from_match() {
        let err: FragqlError = MatchError::MissingTypename {
            id: "a".to_string(),
            object: "{}".to_string(),
        }
        .into();
        assert!(err.is_match());
    }

    #[test]
    fn fragql_error_internal() {
        let err = FragqlError::internal("unexpected state");
        let msg = format!("{err}");
        assert!(msg.contains("unexpected state"));
    }
}
