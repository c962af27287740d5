// analysis options, loadable from TOON
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::EdgeKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid reflexion config: {0}")]
    Decode(String),

    #[error("could not encode reflexion config: {0}")]
    Encode(String),
}

/// How the type of a specified edge has to relate to the type of a
/// propagated edge for lifting to match them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeTypeMatching {
    /// Types must be equal.
    #[default]
    Exact,
    /// Any specified edge allows any dependency type.
    Any,
}

impl EdgeTypeMatching {
    pub fn matches(self, specified: &EdgeKind, actual: &EdgeKind) -> bool {
        match self {
            EdgeTypeMatching::Exact => specified == actual,
            EdgeTypeMatching::Any => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflexionConfig {
    /// A dependency from an architecture entity to one of its ancestors is
    /// implicitly allowed.
    pub allow_dependencies_to_parents: bool,
    pub edge_type_matching: EdgeTypeMatching,
}

impl Default for ReflexionConfig {
    fn default() -> Self {
        ReflexionConfig {
            allow_dependencies_to_parents: true,
            edge_type_matching: EdgeTypeMatching::Exact,
        }
    }
}

impl ReflexionConfig {
    /// Parses a TOON document; missing keys keep their defaults.
    pub fn from_toon(input: &str) -> Result<Self, ConfigError> {
        toon_format::decode_default(input).map_err(|e| ConfigError::Decode(e.to_string()))
    }

    pub fn to_toon(&self) -> Result<String, ConfigError> {
        toon_format::encode_default(self).map_err(|e| ConfigError::Encode(e.to_string()))
    }
}
