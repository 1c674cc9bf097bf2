//! Population strategies for the type relation table.
//!
//! Exactly one strategy is active per matcher instance, chosen at
//! construction and never switched at runtime. Each strategy contributes
//! one middleware [`Link`] that shares the matcher's relation table.

mod extension;
mod introspection;

pub use extension::ExtensionLink;
pub use introspection::IntrospectionLink;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::link::Link;
use crate::relations::TypeRelationTable;

/// Key of the relation payload in extensions bags and of the implementer
/// list inside a synthesized introspection field.
pub(crate) const POSSIBLE_TYPES_KEY: &str = "possibleTypes";

/// The closed set of population strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// A cooperating server attaches relation data to response
    /// extensions. Fast, but requires server control.
    #[default]
    Extension,

    /// Outgoing queries are rewritten to request missing relations
    /// inline. Needs no server cooperation; costs one extra selection
    /// per newly-referenced abstract type.
    Introspection,
}

impl Strategy {
    /// Every recognized strategy.
    pub const ALL: [Self; 2] = [Self::Extension, Self::Introspection];

    /// The configuration name of this strategy.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Extension => "extension",
            Self::Introspection => "introspection",
        }
    }

    /// Resolves a configuration name.
    ///
    /// # Errors
    /// Unknown names fail immediately, listing the valid names; this is
    /// never deferred to request time.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .iter()
            .copied()
            .find(|strategy| strategy.name() == name)
            .ok_or_else(|| ConfigError::UnknownStrategy {
                name: name.to_string(),
                expected: Self::expected_names(),
            })
    }

    /// Builds this strategy's middleware over a shared relation table.
    pub(crate) fn link(self, relations: TypeRelationTable) -> Arc<dyn Link> {
        match self {
            Self::Extension => Arc::new(ExtensionLink::new(relations)),
            Self::Introspection => Arc::new(IntrospectionLink::new(relations)),
        }
    }

    fn expected_names() -> String {
        let quoted: Vec<String> = Self::ALL
            .iter()
            .map(|strategy| format!("\"{}\"", strategy.name()))
            .collect();
        quoted.join(", ")
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_extension() {
        assert_eq!(Strategy::default(), Strategy::Extension);
    }

    #[test]
    fn names_round_trip() {
        for strategy in Strategy::ALL {
            assert_eq!(Strategy::from_name(strategy.name()).unwrap(), strategy);
            assert_eq!(strategy.name().parse::<Strategy>().unwrap(), strategy);
        }
    }

    #[test]
    fn unknown_name_fails_listing_valid_names() {
        let err = Strategy::from_name("schema").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("\"schema\""));
        assert!(msg.contains("\"extension\""));
        assert!(msg.contains("\"introspection\""));
    }

    #[test]
    fn serde_uses_wire_spellings() {
        assert_eq!(
            serde_json::to_string(&Strategy::Introspection).unwrap(),
            "\"introspection\""
        );
        let decoded: Strategy = serde_json::from_str("\"extension\"").unwrap();
        assert_eq!(decoded, Strategy::Extension);
    }
}
