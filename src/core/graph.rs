// node/edge arena shared by the implementation, architecture and mapping graphs
use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::config::ReflexionConfig;
use crate::core::attributes::{Attributes, OPTIONAL_TOGGLE, WEIGHT_ATTRIBUTE};
use crate::core::events::{ChangeEvent, Observer};
use crate::core::state::EdgeState;
use crate::core::types::{EdgeId, EdgeKind, NodeId, SubgraphKind};

/// Coarse classification of [`GraphError`]s so callers can tell API misuse
/// from missing features and from broken graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    Unsupported,
    Corruption,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("nodes cannot live in the {0} graph")]
    NodeSubgraph(SubgraphKind),

    #[error("a {subgraph} node named {name:?} already exists")]
    DuplicateNode { subgraph: SubgraphKind, name: String },

    #[error("node {node} belongs to the {found} graph, expected {expected}")]
    WrongSubgraph {
        node: NodeId,
        expected: SubgraphKind,
        found: SubgraphKind,
    },

    #[error("edge {edge} belongs to the {found} graph, expected {expected}")]
    WrongEdgeSubgraph {
        edge: EdgeId,
        expected: SubgraphKind,
        found: SubgraphKind,
    },

    #[error("edges of the {0} graph are created by the analysis only")]
    ReservedSubgraph(SubgraphKind),

    #[error("specified edge {from} -> {to} of type {kind} already exists")]
    DuplicateSpecifiedEdge {
        from: NodeId,
        to: NodeId,
        kind: EdgeKind,
    },

    #[error("invalid weight {weight} on dependency {from} -> {to}; weights must be at least 1")]
    InvalidWeight { from: NodeId, to: NodeId, weight: i64 },

    #[error("implementation node {impl_node} is already mapped onto {old_arch}, cannot map onto {new_arch}")]
    MappingAlreadyExists {
        impl_node: NodeId,
        old_arch: NodeId,
        new_arch: NodeId,
    },

    #[error("there is no mapping from {impl_node} onto {arch_node}")]
    NoSuchMapping { impl_node: NodeId, arch_node: NodeId },

    #[error("the reflexion analysis has not been run yet")]
    NotAnalysed,

    #[error("{0} is a construction operation and the analysis is live; call reset_analysis first")]
    AnalysisActive(&'static str),

    #[error("{0} is not supported incrementally; use reset_analysis and run instead")]
    Unsupported(&'static str),

    #[error("containment hierarchy is not a tree at node {0}")]
    HierarchyNotATree(NodeId),

    #[error("corrupt reflexion state: {0}")]
    CorruptState(String),
}

impl GraphError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GraphError::Unsupported(_) | GraphError::AnalysisActive(_) => ErrorKind::Unsupported,
            GraphError::HierarchyNotATree(_) | GraphError::CorruptState(_) => ErrorKind::Corruption,
            _ => ErrorKind::InvalidArgument,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    /// Stable linkage id: the same name denotes the same entity in every graph.
    pub name: String,
    pub node_type: String,
    pub subgraph: SubgraphKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub attributes: Attributes,
}

impl Node {
    pub fn new(name: impl Into<String>, subgraph: SubgraphKind, parent: Option<NodeId>) -> Self {
        Node {
            id: 0, // overwritten by add_node
            name: name.into(),
            node_type: String::new(),
            subgraph,
            parent,
            children: Vec::new(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = node_type.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
    pub subgraph: SubgraphKind,
    pub state: EdgeState,
    pub counter: i64,
    pub attributes: Attributes,
}

impl Edge {
    pub fn new(from: NodeId, to: NodeId, kind: EdgeKind, subgraph: SubgraphKind) -> Self {
        Edge {
            id: 0, // overwritten by add_edge
            from,
            to,
            kind,
            subgraph,
            state: EdgeState::Undefined,
            counter: 0,
            attributes: Attributes::new(),
        }
    }

    /// Marks a specified architecture edge as optional.
    pub fn optional(mut self) -> Self {
        self.attributes.set_toggle(OPTIONAL_TOGGLE);
        self
    }

    pub fn with_weight(mut self, weight: i64) -> Self {
        self.attributes.set_int(WEIGHT_ATTRIBUTE, weight);
        self
    }

    pub fn is_optional(&self) -> bool {
        self.attributes.has_toggle(OPTIONAL_TOGGLE)
    }

    /// How many dependencies this implementation edge stands for.
    pub fn weight(&self) -> i64 {
        self.attributes.get_int(WEIGHT_ATTRIBUTE).unwrap_or(1)
    }
}

/// The three graphs of a reflexion analysis plus the analysis state.
///
/// Nodes of the implementation and architecture graphs share one arena; the
/// mapping graph is the set of `Maps_To` edges. Propagated edges are stored in
/// the architecture adjacency next to the specified ones and are told apart by
/// `SubgraphKind::Propagated`.
pub struct ReflexionGraph {
    pub(crate) config: ReflexionConfig,

    pub(crate) nodes: HashMap<NodeId, Node>,
    pub(crate) edges: HashMap<EdgeId, Edge>,
    pub(crate) names: HashMap<(SubgraphKind, String), NodeId>,

    pub(crate) impl_out: HashMap<NodeId, Vec<EdgeId>>,
    pub(crate) impl_in: HashMap<NodeId, Vec<EdgeId>>,
    pub(crate) arch_out: HashMap<NodeId, Vec<EdgeId>>,
    pub(crate) arch_in: HashMap<NodeId, Vec<EdgeId>>,

    /// implementation node -> its Maps_To edge
    pub(crate) maps_to_edges: HashMap<NodeId, EdgeId>,
    /// explicit mapping: implementation node -> architecture node
    pub(crate) maps_to: HashMap<NodeId, NodeId>,
    /// implicit mapping, derived from `maps_to` and the implementation tree
    pub(crate) implicit_maps_to: HashMap<NodeId, NodeId>,
    /// propagated edge -> implementation edges it currently stands for
    pub(crate) propagation_table: HashMap<EdgeId, HashSet<EdgeId>>,

    pub(crate) analysed: bool,
    pub(crate) pending_events: Vec<ChangeEvent>,
    pub(crate) observers: Vec<Box<dyn Observer>>,

    next_node_id: NodeId,
    next_edge_id: EdgeId,
}

impl fmt::Debug for ReflexionGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflexionGraph")
            .field("config", &self.config)
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("explicit_mappings", &self.maps_to.len())
            .field("analysed", &self.analysed)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for ReflexionGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ReflexionGraph {
    pub fn new() -> Self {
        Self::with_config(ReflexionConfig::default())
    }

    pub fn with_config(config: ReflexionConfig) -> Self {
        ReflexionGraph {
            config,
            nodes: HashMap::new(),
            edges: HashMap::new(),
            names: HashMap::new(),
            impl_out: HashMap::new(),
            impl_in: HashMap::new(),
            arch_out: HashMap::new(),
            arch_in: HashMap::new(),
            maps_to_edges: HashMap::new(),
            maps_to: HashMap::new(),
            implicit_maps_to: HashMap::new(),
            propagation_table: HashMap::new(),
            analysed: false,
            pending_events: Vec::new(),
            observers: Vec::new(),
            next_node_id: 1,
            next_edge_id: 1,
        }
    }

    pub fn config(&self) -> &ReflexionConfig {
        &self.config
    }

    pub fn is_analysed(&self) -> bool {
        self.analysed
    }

    pub(crate) fn ensure_constructing(&self, op: &'static str) -> Result<(), GraphError> {
        if self.analysed {
            return Err(GraphError::AnalysisActive(op));
        }
        Ok(())
    }

    pub(crate) fn ensure_analysed(&self) -> Result<(), GraphError> {
        if !self.analysed {
            return Err(GraphError::NotAnalysed);
        }
        Ok(())
    }

    // ----------------------------------------------------------------------
    // construction
    // ----------------------------------------------------------------------

    /// Adds a node below its (optional) parent. The parent must already exist
    /// in the same graph.
    pub fn add_node(&mut self, mut node: Node) -> Result<NodeId, GraphError> {
        self.ensure_constructing("add_node")?;

        if !node.subgraph.holds_nodes() {
            return Err(GraphError::NodeSubgraph(node.subgraph));
        }
        let key = (node.subgraph, node.name.clone());
        if self.names.contains_key(&key) {
            return Err(GraphError::DuplicateNode {
                subgraph: node.subgraph,
                name: node.name,
            });
        }
        if let Some(parent) = node.parent {
            self.expect_node_in(parent, node.subgraph)?;
        }

        let id = self.next_node_id;
        self.next_node_id += 1;
        node.id = id;
        node.children.clear();

        if let Some(parent) = node.parent {
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children.push(id);
            }
        }
        self.names.insert(key, id);
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Adds an implementation dependency, a specified architecture dependency
    /// or a Maps_To edge. Propagated edges are reserved for the analysis.
    pub fn add_edge(&mut self, edge: Edge) -> Result<EdgeId, GraphError> {
        self.ensure_constructing("add_edge")?;
        match edge.subgraph {
            SubgraphKind::Implementation => {
                self.validate_dependency(&edge)?;
                Ok(self.insert_edge(edge))
            }
            SubgraphKind::Architecture => {
                self.validate_specified(&edge)?;
                Ok(self.insert_edge(edge))
            }
            SubgraphKind::Mapping => self.set_mapping(edge.from, edge.to),
            SubgraphKind::Propagated => Err(GraphError::ReservedSubgraph(SubgraphKind::Propagated)),
        }
    }

    /// Removes a dependency or Maps_To edge before the analysis runs.
    pub fn remove_edge(&mut self, edge_id: EdgeId) -> Result<Edge, GraphError> {
        self.ensure_constructing("remove_edge")?;
        let subgraph = self.edge(edge_id)?.subgraph;
        if subgraph == SubgraphKind::Mapping {
            let from = self.edge(edge_id)?.from;
            self.maps_to.remove(&from);
        }
        self.detach_edge(edge_id)
    }

    /// Removes a node together with its incident edges and its mapping. Its
    /// children move up to the node's parent.
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<Node, GraphError> {
        self.ensure_constructing("remove_node")?;
        let (subgraph, parent, children, name) = {
            let n = self.node(node_id)?;
            (n.subgraph, n.parent, n.children.clone(), n.name.clone())
        };

        let mut incident: Vec<EdgeId> = Vec::new();
        let (out, inc) = match subgraph {
            SubgraphKind::Implementation => (&self.impl_out, &self.impl_in),
            _ => (&self.arch_out, &self.arch_in),
        };
        for list in [out.get(&node_id), inc.get(&node_id)].into_iter().flatten() {
            incident.extend(list.iter().copied());
        }
        incident.extend(
            self.edges
                .values()
                .filter(|e| e.subgraph == SubgraphKind::Mapping && (e.from == node_id || e.to == node_id))
                .map(|e| e.id),
        );
        incident.sort_unstable();
        incident.dedup();

        for eid in incident {
            let from = self.edge(eid)?.from;
            if self.edge(eid)?.subgraph == SubgraphKind::Mapping {
                self.maps_to.remove(&from);
            }
            self.detach_edge(eid)?;
        }

        for &child in &children {
            if let Some(c) = self.nodes.get_mut(&child) {
                c.parent = parent;
            }
        }
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            p.children.retain(|&c| c != node_id);
            p.children.extend(children.iter().copied());
        }

        self.names.remove(&(subgraph, name));
        self.impl_out.remove(&node_id);
        self.impl_in.remove(&node_id);
        self.arch_out.remove(&node_id);
        self.arch_in.remove(&node_id);
        self.implicit_maps_to.remove(&node_id);
        self.nodes.remove(&node_id).ok_or(GraphError::NodeNotFound(node_id))
    }

    pub(crate) fn validate_dependency(&self, edge: &Edge) -> Result<(), GraphError> {
        self.expect_node_in(edge.from, SubgraphKind::Implementation)?;
        self.expect_node_in(edge.to, SubgraphKind::Implementation)?;
        let weight = edge.attributes.get_int(WEIGHT_ATTRIBUTE).unwrap_or(1);
        if weight < 1 || weight > i64::from(i32::MAX) {
            return Err(GraphError::InvalidWeight {
                from: edge.from,
                to: edge.to,
                weight,
            });
        }
        Ok(())
    }

    pub(crate) fn validate_specified(&self, edge: &Edge) -> Result<(), GraphError> {
        self.expect_node_in(edge.from, SubgraphKind::Architecture)?;
        self.expect_node_in(edge.to, SubgraphKind::Architecture)?;
        if self.specified_edge(edge.from, edge.to, &edge.kind).is_some() {
            return Err(GraphError::DuplicateSpecifiedEdge {
                from: edge.from,
                to: edge.to,
                kind: edge.kind.clone(),
            });
        }
        Ok(())
    }

    /// Stores an already validated edge and indexes it.
    pub(crate) fn insert_edge(&mut self, mut edge: Edge) -> EdgeId {
        let id = self.next_edge_id;
        self.next_edge_id += 1;
        edge.id = id;

        match edge.subgraph {
            SubgraphKind::Implementation => {
                self.impl_out.entry(edge.from).or_default().push(id);
                self.impl_in.entry(edge.to).or_default().push(id);
            }
            SubgraphKind::Architecture | SubgraphKind::Propagated => {
                self.arch_out.entry(edge.from).or_default().push(id);
                self.arch_in.entry(edge.to).or_default().push(id);
            }
            SubgraphKind::Mapping => {
                self.maps_to_edges.insert(edge.from, id);
            }
        }
        self.edges.insert(id, edge);
        id
    }

    /// Drops an edge from the arena and every index.
    pub(crate) fn detach_edge(&mut self, edge_id: EdgeId) -> Result<Edge, GraphError> {
        let edge = self.edges.remove(&edge_id).ok_or(GraphError::EdgeNotFound(edge_id))?;
        let (out, inc) = match edge.subgraph {
            SubgraphKind::Implementation => (&mut self.impl_out, &mut self.impl_in),
            SubgraphKind::Architecture | SubgraphKind::Propagated => {
                (&mut self.arch_out, &mut self.arch_in)
            }
            SubgraphKind::Mapping => {
                if self.maps_to_edges.get(&edge.from) == Some(&edge_id) {
                    self.maps_to_edges.remove(&edge.from);
                }
                return Ok(edge);
            }
        };
        if let Some(v) = out.get_mut(&edge.from) {
            v.retain(|&x| x != edge_id);
        }
        if let Some(v) = inc.get_mut(&edge.to) {
            v.retain(|&x| x != edge_id);
        }
        self.propagation_table.remove(&edge_id);
        Ok(edge)
    }

    // ----------------------------------------------------------------------
    // lookup
    // ----------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub fn edge(&self, id: EdgeId) -> Result<&Edge, GraphError> {
        self.edges.get(&id).ok_or(GraphError::EdgeNotFound(id))
    }

    pub fn node_by_name(&self, subgraph: SubgraphKind, name: &str) -> Option<NodeId> {
        self.names.get(&(subgraph, name.to_string())).copied()
    }

    pub fn node_subgraph(&self, id: NodeId) -> Result<SubgraphKind, GraphError> {
        Ok(self.node(id)?.subgraph)
    }

    pub(crate) fn expect_node_in(&self, id: NodeId, expected: SubgraphKind) -> Result<(), GraphError> {
        let found = self.node_subgraph(id)?;
        if found != expected {
            return Err(GraphError::WrongSubgraph {
                node: id,
                expected,
                found,
            });
        }
        Ok(())
    }

    pub(crate) fn expect_edge_in(&self, id: EdgeId, expected: SubgraphKind) -> Result<&Edge, GraphError> {
        let e = self.edge(id)?;
        if e.subgraph != expected {
            return Err(GraphError::WrongEdgeSubgraph {
                edge: id,
                expected,
                found: e.subgraph,
            });
        }
        Ok(e)
    }

    /// Node ids of one graph in ascending order. For `Mapping` these are the
    /// endpoints of Maps_To edges.
    pub fn node_ids(&self, subgraph: SubgraphKind) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = if subgraph == SubgraphKind::Mapping {
            let set: HashSet<NodeId> = self
                .edges
                .values()
                .filter(|e| e.subgraph == SubgraphKind::Mapping)
                .flat_map(|e| [e.from, e.to])
                .collect();
            set.into_iter().collect()
        } else {
            self.nodes
                .values()
                .filter(|n| n.subgraph == subgraph)
                .map(|n| n.id)
                .collect()
        };
        ids.sort_unstable();
        ids
    }

    pub fn edge_ids(&self, subgraph: SubgraphKind) -> Vec<EdgeId> {
        let mut ids: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|e| e.subgraph == subgraph)
            .map(|e| e.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn roots(&self, subgraph: SubgraphKind) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.subgraph == subgraph && n.parent.is_none())
            .map(|n| n.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Outgoing edges of a node within its own graph; for architecture nodes
    /// this includes propagated edges.
    pub fn outgoing(&self, id: NodeId) -> &[EdgeId] {
        let map = match self.nodes.get(&id).map(|n| n.subgraph) {
            Some(SubgraphKind::Implementation) => &self.impl_out,
            _ => &self.arch_out,
        };
        map.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn incoming(&self, id: NodeId) -> &[EdgeId] {
        let map = match self.nodes.get(&id).map(|n| n.subgraph) {
            Some(SubgraphKind::Implementation) => &self.impl_in,
            _ => &self.arch_in,
        };
        map.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, GraphError> {
        Ok(self.node(id)?.parent)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId], GraphError> {
        Ok(&self.node(id)?.children)
    }

    /// `id`, its parent, its grandparent, ... up to the root.
    pub fn ancestors_or_self(&self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let mut result = vec![id];
        let mut cursor = self.node(id)?.parent;
        while let Some(n) = cursor {
            if result.len() > self.nodes.len() {
                return Err(GraphError::HierarchyNotATree(id));
            }
            result.push(n);
            cursor = self.node(n)?.parent;
        }
        Ok(result)
    }

    /// True if `ancestor` is a proper ancestor of `descendant`.
    pub fn is_descendant_of(&self, descendant: NodeId, ancestor: NodeId) -> Result<bool, GraphError> {
        Ok(self.ancestors_or_self(descendant)?[1..].contains(&ancestor))
    }

    /// `id` and every node below it, pre-order.
    pub fn descendants_or_self(&self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if result.len() > self.nodes.len() {
                return Err(GraphError::HierarchyNotATree(id));
            }
            result.push(n);
            stack.extend(self.node(n)?.children.iter().rev().copied());
        }
        Ok(result)
    }

    /// Checks that parent and child links agree and that no node is its own
    /// ancestor.
    pub fn validate_hierarchy(&self) -> Result<(), GraphError> {
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            let node = self.node(id)?;
            if let Some(p) = node.parent {
                let parent = self.nodes.get(&p).ok_or(GraphError::HierarchyNotATree(id))?;
                if parent.subgraph != node.subgraph || !parent.children.contains(&id) {
                    return Err(GraphError::HierarchyNotATree(id));
                }
            }
            for &c in &node.children {
                if self.nodes.get(&c).and_then(|child| child.parent) != Some(id) {
                    return Err(GraphError::HierarchyNotATree(c));
                }
            }
            self.ancestors_or_self(id)?;
        }
        Ok(())
    }

    // ----------------------------------------------------------------------
    // architecture edge lookup
    // ----------------------------------------------------------------------

    fn arch_edge_of(&self, from: NodeId, to: NodeId, kind: &EdgeKind, subgraph: SubgraphKind) -> Option<EdgeId> {
        self.arch_out.get(&from)?.iter().copied().find(|eid| {
            self.edges
                .get(eid)
                .is_some_and(|e| e.subgraph == subgraph && e.to == to && &e.kind == kind)
        })
    }

    /// The specified edge `from -> to` of the given type, if the architect declared one.
    pub fn specified_edge(&self, from: NodeId, to: NodeId, kind: &EdgeKind) -> Option<EdgeId> {
        self.arch_edge_of(from, to, kind, SubgraphKind::Architecture)
    }

    /// The propagated edge `from -> to` of the given type, if implementation
    /// traffic currently produces one.
    pub fn propagated_edge(&self, from: NodeId, to: NodeId, kind: &EdgeKind) -> Option<EdgeId> {
        self.arch_edge_of(from, to, kind, SubgraphKind::Propagated)
    }

    /// The Maps_To edge `from -> to`, failing if it does not exist.
    pub fn maps_to_edge(&self, from: NodeId, to: NodeId) -> Result<EdgeId, GraphError> {
        self.maps_to_edges
            .get(&from)
            .copied()
            .filter(|eid| self.edges.get(eid).is_some_and(|e| e.to == to))
            .ok_or(GraphError::NoSuchMapping {
                impl_node: from,
                arch_node: to,
            })
    }
}
