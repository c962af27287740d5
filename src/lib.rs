//! Incremental reflexion analysis.
//!
//! An implementation graph is compared against a hierarchical architecture
//! through a mapping from implementation to architecture nodes. Every
//! implementation dependency is propagated onto the architecture and lifted to
//! the nearest specified dependency that allows it; specified dependencies end
//! up convergent or absent, propagated ones allowed or divergent.
//!
//! ```
//! use reflexion_core::{Edge, EdgeKind, EdgeState, Node, ReflexionGraph, SubgraphKind};
//!
//! let mut g = ReflexionGraph::new();
//! let ui = g.add_node(Node::new("UI", SubgraphKind::Architecture, None))?;
//! let db = g.add_node(Node::new("Db", SubgraphKind::Architecture, None))?;
//! let spec = g.add_edge(Edge::new(ui, db, EdgeKind::calls(), SubgraphKind::Architecture))?;
//!
//! let page = g.add_node(Node::new("Page", SubgraphKind::Implementation, None))?;
//! let table = g.add_node(Node::new("Table", SubgraphKind::Implementation, None))?;
//! g.add_edge(Edge::new(page, table, EdgeKind::calls(), SubgraphKind::Implementation))?;
//! g.set_mapping(page, ui)?;
//!
//! g.run()?;
//! assert_eq!(g.get_state(spec)?, EdgeState::Absent);
//!
//! g.add_to_mapping(table, db)?;
//! assert_eq!(g.get_state(spec)?, EdgeState::Convergent);
//! # Ok::<(), reflexion_core::GraphError>(())
//! ```

pub mod config;
pub mod core;
pub mod report;

pub use crate::config::{ConfigError, EdgeTypeMatching, ReflexionConfig};
pub use crate::core::attributes::{Attributes, OPTIONAL_TOGGLE, WEIGHT_ATTRIBUTE};
pub use crate::core::events::{ChangeEvent, EdgeRef, Observer};
pub use crate::core::graph::{Edge, ErrorKind, GraphError, Node, ReflexionGraph};
pub use crate::core::state::EdgeState;
pub use crate::core::types::{EdgeId, EdgeKind, NodeId, SubgraphKind};
pub use crate::report::{ReflexionReport, Violation};
