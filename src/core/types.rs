// ids, sub-graph tags and edge kinds shared by every graph
use std::fmt;

use serde::{Deserialize, Serialize};

pub type NodeId = u32;
pub type EdgeId = u32;

/// Which of the analysed graphs a node or edge belongs to.
///
/// Nodes only ever live in `Implementation` or `Architecture`. Edges may also be
/// `Propagated` (created by the analysis, stored next to the specified
/// architecture edges) or `Mapping` (Maps_To edges from implementation to
/// architecture).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubgraphKind {
    Implementation,
    Architecture,
    Propagated,
    Mapping,
}

impl SubgraphKind {
    pub fn holds_nodes(self) -> bool {
        matches!(self, SubgraphKind::Implementation | SubgraphKind::Architecture)
    }
}

impl fmt::Display for SubgraphKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubgraphKind::Implementation => "implementation",
            SubgraphKind::Architecture => "architecture",
            SubgraphKind::Propagated => "propagated",
            SubgraphKind::Mapping => "mapping",
        };
        f.write_str(s)
    }
}

/// Edge type tag, e.g. `Call` or `Maps_To`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeKind(String);

impl EdgeKind {
    pub fn new(kind: impl Into<String>) -> Self {
        EdgeKind(kind.into())
    }

    pub fn calls() -> Self {
        EdgeKind::new("Call")
    }

    pub fn depends_on() -> Self {
        EdgeKind::new("Depends_On")
    }

    pub fn maps_to() -> Self {
        EdgeKind::new("Maps_To")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EdgeKind {
    fn from(s: &str) -> Self {
        EdgeKind::new(s)
    }
}
