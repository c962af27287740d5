// explicit Maps_To table + implicit (inherited) mapping
use crate::core::graph::{Edge, GraphError, ReflexionGraph};
use crate::core::types::{EdgeId, EdgeKind, NodeId, SubgraphKind};

impl ReflexionGraph {
    //rules the mapping must obey:
    //1. source is an implementation node, target an architecture node.
    //2. each impl node has at most one explicit target.
    //3. many impl nodes may map onto the same arch node.
    //4. every unmapped descendant inherits the target of its nearest mapped ancestor.

    pub(crate) fn expect_impl_node(&self, impl_node: NodeId) -> Result<(), GraphError> {
        self.expect_node_in(impl_node, SubgraphKind::Implementation)
    }

    pub(crate) fn expect_arch_node(&self, arch_node: NodeId) -> Result<(), GraphError> {
        self.expect_node_in(arch_node, SubgraphKind::Architecture)
    }

    /// Declares an initial Maps_To edge while the graphs are being built.
    /// Identical re-declarations are accepted; remapping is an error.
    /// Once the analysis is live use `add_to_mapping` instead.
    pub fn set_mapping(&mut self, impl_node: NodeId, arch_node: NodeId) -> Result<EdgeId, GraphError> {
        self.ensure_constructing("set_mapping")?;
        self.expect_impl_node(impl_node)?;
        self.expect_arch_node(arch_node)?;

        match self.maps_to.get(&impl_node).copied() {
            None => Ok(self.insert_maps_to(impl_node, arch_node)),
            Some(old_arch) if old_arch == arch_node => self.maps_to_edge(impl_node, arch_node),
            Some(old_arch) => Err(GraphError::MappingAlreadyExists {
                impl_node,
                old_arch,
                new_arch: arch_node,
            }),
        }
    }

    pub(crate) fn insert_maps_to(&mut self, impl_node: NodeId, arch_node: NodeId) -> EdgeId {
        self.maps_to.insert(impl_node, arch_node);
        self.insert_edge(Edge::new(
            impl_node,
            arch_node,
            EdgeKind::maps_to(),
            SubgraphKind::Mapping,
        ))
    }

    /// The architecture node `impl_node` is explicitly mapped onto, if any.
    pub fn explicit_target(&self, impl_node: NodeId) -> Result<Option<NodeId>, GraphError> {
        self.expect_impl_node(impl_node)?;
        Ok(self.maps_to.get(&impl_node).copied())
    }

    pub fn is_explicitly_mapped(&self, impl_node: NodeId) -> Result<bool, GraphError> {
        self.expect_impl_node(impl_node)?;
        Ok(self.maps_to.contains_key(&impl_node))
    }

    /// The architecture node `impl_node` is mapped onto, explicitly or through
    /// its nearest explicitly mapped ancestor. Only meaningful once the
    /// transitive mapping has been built by a run.
    pub fn implicit_target(&self, impl_node: NodeId) -> Result<Option<NodeId>, GraphError> {
        self.expect_impl_node(impl_node)?;
        Ok(self.implicit_maps_to.get(&impl_node).copied())
    }

    pub fn mapping_len(&self) -> usize {
        self.maps_to.len()
    }

    /// `node` plus every descendant reached without passing another explicitly
    /// mapped node: exactly the nodes whose implicit target is decided by
    /// `node`'s mapping.
    pub fn mapped_subtree(&self, node: NodeId) -> Result<Vec<NodeId>, GraphError> {
        self.expect_impl_node(node)?;
        let mut result = Vec::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            if result.len() > self.nodes.len() {
                return Err(GraphError::HierarchyNotATree(node));
            }
            result.push(n);
            for &child in self.node(n)?.children.iter().rev() {
                if !self.maps_to.contains_key(&child) {
                    stack.push(child);
                }
            }
        }
        Ok(result)
    }

    /// Rebuilds the explicit table from the Maps_To edges and derives the
    /// implicit mapping from it.
    pub fn rebuild_transitive_mapping(&mut self) -> Result<(), GraphError> {
        // explicit first: subtree assignment stops at explicitly mapped nodes
        self.maps_to.clear();
        let mut explicit: Vec<(NodeId, NodeId)> = Vec::with_capacity(self.maps_to_edges.len());
        for &eid in self.maps_to_edges.values() {
            let e = self.edge(eid)?;
            self.expect_impl_node(e.from)?;
            self.expect_arch_node(e.to)?;
            explicit.push((e.from, e.to));
        }
        explicit.sort_unstable();
        self.maps_to.extend(explicit.iter().copied());

        self.implicit_maps_to.clear();
        for (impl_node, arch_node) in explicit {
            for n in self.mapped_subtree(impl_node)? {
                self.implicit_maps_to.insert(n, arch_node);
            }
        }
        tracing::debug!(
            explicit = self.maps_to.len(),
            implicit = self.implicit_maps_to.len(),
            "rebuilt transitive mapping"
        );
        Ok(())
    }

    /// Points every node in `subtree` at `target`, or unmaps them for `None`.
    pub(crate) fn change_map(&mut self, subtree: &[NodeId], target: Option<NodeId>) {
        for &n in subtree {
            match target {
                Some(t) => {
                    self.implicit_maps_to.insert(n, t);
                }
                None => {
                    self.implicit_maps_to.remove(&n);
                }
            }
        }
    }
}
