// incremental diffs
//
// Every edit follows the same shape: collect what is affected while the old
// mapping is still in place, unlift it, mutate, then lift it again against the
// new state. Events of the whole edit are returned together.
use std::collections::HashSet;

use crate::core::events::{ChangeEvent, EdgeRef};
use crate::core::graph::{Edge, GraphError, Node, ReflexionGraph};
use crate::core::state::EdgeState;
use crate::core::types::{EdgeId, NodeId, SubgraphKind};

impl ReflexionGraph {
    fn finish<T>(&mut self, result: Result<T, GraphError>) -> Result<(T, Vec<ChangeEvent>), GraphError> {
        // events raised before a failure still reach the observers
        let events = self.flush_events();
        result.map(|value| (value, events))
    }

    // ----------------------------------------------------------------------
    // mapping
    // ----------------------------------------------------------------------

    /// Maps `from` (not yet explicitly mapped) onto `to` and re-lifts every
    /// dependency whose endpoints move with it.
    pub fn add_to_mapping(&mut self, from: NodeId, to: NodeId) -> Result<Vec<ChangeEvent>, GraphError> {
        let result = self.add_to_mapping_inner(from, to);
        self.finish(result).map(|(_, events)| events)
    }

    fn add_to_mapping_inner(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        self.ensure_analysed()?;
        self.expect_impl_node(from)?;
        self.expect_arch_node(to)?;
        if let Some(&old_arch) = self.maps_to.get(&from) {
            return Err(GraphError::MappingAlreadyExists {
                impl_node: from,
                old_arch,
                new_arch: to,
            });
        }

        let subtree = self.mapped_subtree(from)?;
        let dependencies = self.subtree_dependencies(&subtree);
        let old_target = self.implicit_maps_to.get(&from).copied();
        tracing::debug!(
            from,
            to,
            ?old_target,
            subtree = subtree.len(),
            dependencies = dependencies.len(),
            "adding to mapping"
        );

        if old_target.is_some() {
            self.unmap(&dependencies)?;
        }

        let maps_to = self.insert_maps_to(from, to);
        let added = EdgeRef::from(self.edge(maps_to)?);
        self.notify(ChangeEvent::MapsToEdgeAdded { edge: added });

        self.change_map(&subtree, Some(to));
        self.map(&dependencies)
    }

    /// Removes the explicit mapping `from -> to`. The subtree falls back to
    /// the mapping of `from`'s parent, if it has one.
    pub fn delete_from_mapping(&mut self, from: NodeId, to: NodeId) -> Result<Vec<ChangeEvent>, GraphError> {
        let result = self.delete_from_mapping_inner(from, to);
        self.finish(result).map(|(_, events)| events)
    }

    fn delete_from_mapping_inner(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        self.ensure_analysed()?;
        self.expect_impl_node(from)?;
        self.expect_arch_node(to)?;
        let maps_to = self.maps_to_edge(from, to)?;

        let subtree = self.mapped_subtree(from)?;
        let dependencies = self.subtree_dependencies(&subtree);
        let parent_target = self
            .parent(from)?
            .and_then(|p| self.implicit_maps_to.get(&p).copied());
        tracing::debug!(
            from,
            to,
            ?parent_target,
            subtree = subtree.len(),
            dependencies = dependencies.len(),
            "deleting from mapping"
        );

        self.unmap(&dependencies)?;
        self.maps_to.remove(&from);
        self.change_map(&subtree, parent_target);
        if parent_target.is_some() {
            self.map(&dependencies)?;
        }

        let removed = self.detach_edge(maps_to)?;
        self.notify(ChangeEvent::MapsToEdgeRemoved {
            edge: EdgeRef::from(&removed),
        });
        Ok(())
    }

    /// Implementation dependencies with at least one endpoint in `subtree`,
    /// each once, ascending.
    fn subtree_dependencies(&self, subtree: &[NodeId]) -> Vec<EdgeId> {
        let mut seen: HashSet<EdgeId> = HashSet::new();
        for n in subtree {
            for list in [self.impl_out.get(n), self.impl_in.get(n)].into_iter().flatten() {
                seen.extend(list.iter().copied());
            }
        }
        let mut result: Vec<EdgeId> = seen.into_iter().collect();
        result.sort_unstable();
        result
    }

    fn unmap(&mut self, dependencies: &[EdgeId]) -> Result<(), GraphError> {
        for &eid in dependencies {
            self.decrease_and_lift(eid)?;
        }
        Ok(())
    }

    fn map(&mut self, dependencies: &[EdgeId]) -> Result<(), GraphError> {
        for &eid in dependencies {
            self.propagate_and_lift(eid)?;
        }
        Ok(())
    }

    // ----------------------------------------------------------------------
    // dependencies
    // ----------------------------------------------------------------------

    /// Adds an implementation dependency to a live analysis.
    pub fn add_dependency(&mut self, edge: Edge) -> Result<(EdgeId, Vec<ChangeEvent>), GraphError> {
        let result = self.add_dependency_inner(edge);
        self.finish(result)
    }

    fn add_dependency_inner(&mut self, edge: Edge) -> Result<EdgeId, GraphError> {
        self.ensure_analysed()?;
        expect_new_edge_in(&edge, SubgraphKind::Implementation)?;
        self.validate_dependency(&edge)?;

        let eid = self.insert_edge(edge);
        let added = EdgeRef::from(self.edge(eid)?);
        tracing::debug!(edge = eid, from = added.from, to = added.to, "dependency added");
        self.notify(ChangeEvent::DependencyAdded {
            edge: added,
            subgraph: SubgraphKind::Implementation,
        });
        self.propagate_and_lift(eid)?;
        Ok(eid)
    }

    /// Removes an implementation dependency from a live analysis.
    pub fn remove_dependency(&mut self, eid: EdgeId) -> Result<Vec<ChangeEvent>, GraphError> {
        let result = self.remove_dependency_inner(eid);
        self.finish(result).map(|(_, events)| events)
    }

    fn remove_dependency_inner(&mut self, eid: EdgeId) -> Result<(), GraphError> {
        self.ensure_analysed()?;
        self.expect_edge_in(eid, SubgraphKind::Implementation)?;

        self.decrease_and_lift(eid)?;
        let removed = self.detach_edge(eid)?;
        tracing::debug!(edge = eid, from = removed.from, to = removed.to, "dependency removed");
        self.notify(ChangeEvent::DependencyRemoved {
            edge: EdgeRef::from(&removed),
            subgraph: SubgraphKind::Implementation,
        });
        Ok(())
    }

    /// Adds a specified architecture dependency to a live analysis. Propagated
    /// edges for which it becomes the nearest allowing edge move over to it.
    pub fn add_specified_dependency(&mut self, edge: Edge) -> Result<(EdgeId, Vec<ChangeEvent>), GraphError> {
        let result = self.add_specified_dependency_inner(edge);
        self.finish(result)
    }

    fn add_specified_dependency_inner(&mut self, mut edge: Edge) -> Result<EdgeId, GraphError> {
        self.ensure_analysed()?;
        expect_new_edge_in(&edge, SubgraphKind::Architecture)?;
        self.validate_specified(&edge)?;

        // allowing edge of every propagated edge, before the new edge exists
        let mut previous: Vec<(EdgeId, Option<EdgeId>)> = Vec::new();
        for prop_id in self.edge_ids(SubgraphKind::Propagated) {
            let p = self.edge(prop_id)?;
            let allowing = if p.state == EdgeState::Allowed {
                self.find_allowing_edge(p.from, p.to, &p.kind)?
            } else {
                None
            };
            previous.push((prop_id, allowing));
        }

        edge.state = EdgeState::Specified;
        edge.counter = 0;
        let optional = edge.is_optional();
        let spec_id = self.insert_edge(edge);
        let added = EdgeRef::from(self.edge(spec_id)?);
        tracing::debug!(edge = spec_id, from = added.from, to = added.to, "specified dependency added");
        self.notify(ChangeEvent::DependencyAdded {
            edge: added,
            subgraph: SubgraphKind::Architecture,
        });

        for (prop_id, old_allowing) in previous {
            let (from, to, kind, counter) = {
                let p = self.edge(prop_id)?;
                (p.from, p.to, p.kind.clone(), p.counter)
            };
            if self.find_allowing_edge(from, to, &kind)? != Some(spec_id) {
                continue;
            }
            if let Some(old) = old_allowing {
                self.change_architecture_dependency(old, -counter)?;
            }
            self.classify_propagated(prop_id, counter)?;
        }

        if self.edge(spec_id)?.counter == 0 {
            let absent = if optional {
                EdgeState::AllowedAbsent
            } else {
                EdgeState::Absent
            };
            self.transition(spec_id, absent)?;
        }
        Ok(spec_id)
    }

    /// Removes a specified architecture dependency from a live analysis. The
    /// propagated edges it allowed are classified again without it.
    pub fn remove_specified_dependency(&mut self, eid: EdgeId) -> Result<Vec<ChangeEvent>, GraphError> {
        let result = self.remove_specified_dependency_inner(eid);
        self.finish(result).map(|(_, events)| events)
    }

    fn remove_specified_dependency_inner(&mut self, eid: EdgeId) -> Result<(), GraphError> {
        self.ensure_analysed()?;
        self.expect_edge_in(eid, SubgraphKind::Architecture)?;

        let mut allowed: Vec<(EdgeId, i64)> = Vec::new();
        for prop_id in self.edge_ids(SubgraphKind::Propagated) {
            if self.allowing_edge(prop_id)? == Some(eid) {
                allowed.push((prop_id, self.edge(prop_id)?.counter));
            }
        }

        let removed = self.detach_edge(eid)?;
        tracing::debug!(
            edge = eid,
            from = removed.from,
            to = removed.to,
            reclassified = allowed.len(),
            "specified dependency removed"
        );
        self.notify(ChangeEvent::DependencyRemoved {
            edge: EdgeRef::from(&removed),
            subgraph: SubgraphKind::Architecture,
        });

        for (prop_id, counter) in allowed {
            self.classify_propagated(prop_id, counter)?;
        }
        Ok(())
    }

    // ----------------------------------------------------------------------
    // structure
    // ----------------------------------------------------------------------

    /// Adds a node. Only possible while the graphs are being constructed.
    pub fn insert_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        if self.analysed {
            return Err(GraphError::Unsupported("insert_node"));
        }
        self.add_node(node)
    }

    /// Removes a node. Only possible while the graphs are being constructed.
    pub fn delete_node(&mut self, node: NodeId) -> Result<Node, GraphError> {
        if self.analysed {
            return Err(GraphError::Unsupported("delete_node"));
        }
        self.remove_node(node)
    }

    /// Moves `node` below `new_parent`, or makes it a root. On a live analysis
    /// only implementation nodes can move: a node without an explicit mapping
    /// takes its subtree over to the mapping of its new parent.
    pub fn reparent_node(
        &mut self,
        node: NodeId,
        new_parent: Option<NodeId>,
    ) -> Result<Vec<ChangeEvent>, GraphError> {
        let result = self.reparent_node_inner(node, new_parent);
        self.finish(result).map(|(_, events)| events)
    }

    fn reparent_node_inner(&mut self, node: NodeId, new_parent: Option<NodeId>) -> Result<(), GraphError> {
        let subgraph = self.node_subgraph(node)?;
        if self.analysed && subgraph != SubgraphKind::Implementation {
            return Err(GraphError::Unsupported("reparent_node"));
        }
        if let Some(p) = new_parent {
            self.expect_node_in(p, subgraph)?;
            if p == node || self.is_descendant_of(p, node)? {
                return Err(GraphError::HierarchyNotATree(node));
            }
        }
        if !self.analysed || self.maps_to.contains_key(&node) {
            self.relink(node, new_parent)?;
            return Ok(());
        }

        let subtree = self.mapped_subtree(node)?;
        let old_target = self.implicit_maps_to.get(&node).copied();
        let new_target = new_parent.and_then(|p| self.implicit_maps_to.get(&p).copied());
        if old_target == new_target {
            self.relink(node, new_parent)?;
            return Ok(());
        }

        let dependencies = self.subtree_dependencies(&subtree);
        tracing::debug!(
            node,
            ?new_parent,
            ?old_target,
            ?new_target,
            subtree = subtree.len(),
            dependencies = dependencies.len(),
            "reparenting implementation node"
        );
        self.unmap(&dependencies)?;
        self.relink(node, new_parent)?;
        self.change_map(&subtree, new_target);
        self.map(&dependencies)
    }

    fn relink(&mut self, node: NodeId, new_parent: Option<NodeId>) -> Result<(), GraphError> {
        let old_parent = self.parent(node)?;
        if let Some(op) = old_parent.and_then(|op| self.nodes.get_mut(&op)) {
            op.children.retain(|&c| c != node);
        }
        if let Some(np) = new_parent.and_then(|np| self.nodes.get_mut(&np)) {
            np.children.push(node);
        }
        if let Some(n) = self.nodes.get_mut(&node) {
            n.parent = new_parent;
        }
        Ok(())
    }
}

fn expect_new_edge_in(edge: &Edge, expected: SubgraphKind) -> Result<(), GraphError> {
    if edge.subgraph != expected {
        return Err(GraphError::WrongEdgeSubgraph {
            edge: edge.id,
            expected,
            found: edge.subgraph,
        });
    }
    Ok(())
}
