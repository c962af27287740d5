use std::collections::HashSet;

use crate::core::events::{ChangeEvent, EdgeRef};
use crate::core::graph::{Edge, GraphError, ReflexionGraph};
use crate::core::state::EdgeState;
use crate::core::types::{EdgeId, EdgeKind, NodeId, SubgraphKind};

impl ReflexionGraph {
    /// Maps both endpoints of an implementation dependency into architecture
    /// space. `None` means the dependency is dangling.
    pub(crate) fn propagated_endpoints(&self, impl_edge_id: EdgeId) -> Result<Option<(NodeId, NodeId)>, GraphError> {
        let e = self.expect_edge_in(impl_edge_id, SubgraphKind::Implementation)?;
        let from_arch = self.implicit_maps_to.get(&e.from).copied();
        let to_arch = self.implicit_maps_to.get(&e.to).copied();
        Ok(from_arch.zip(to_arch))
    }

    /// Propagate a single implementation edge into architecture space and lift it.
    ///
    /// Steps:
    /// 1) map endpoints through the implicit mapping; dangling edges are ignored
    /// 2) reuse the propagated edge (src -> tgt, same kind): lift + counter += weight
    /// 3) or create it with counter = weight and classify it
    /// 4) record: propagation_table[prop_edge] includes impl_edge
    pub(crate) fn propagate_and_lift(&mut self, impl_edge_id: EdgeId) -> Result<(), GraphError> {
        let (kind, weight) = {
            let e = self.expect_edge_in(impl_edge_id, SubgraphKind::Implementation)?;
            (e.kind.clone(), e.weight())
        };
        let Some((from_arch, to_arch)) = self.propagated_endpoints(impl_edge_id)? else {
            tracing::trace!(edge = impl_edge_id, "dangling dependency ignored");
            return Ok(());
        };

        let prop_id = match self.propagated_edge(from_arch, to_arch, &kind) {
            Some(prop_id) => {
                self.lift(from_arch, to_arch, &kind, weight)?;
                self.change_impl_ref(prop_id, weight)?;
                prop_id
            }
            None => self.new_propagated_edge(from_arch, to_arch, kind, weight)?,
        };

        self.propagation_table
            .entry(prop_id)
            .or_insert_with(HashSet::new)
            .insert(impl_edge_id);
        Ok(())
    }

    /// Reverts `propagate_and_lift` for one implementation edge, using the
    /// mapping as it is right now.
    pub(crate) fn decrease_and_lift(&mut self, impl_edge_id: EdgeId) -> Result<(), GraphError> {
        let (kind, weight) = {
            let e = self.expect_edge_in(impl_edge_id, SubgraphKind::Implementation)?;
            (e.kind.clone(), e.weight())
        };
        let Some((from_arch, to_arch)) = self.propagated_endpoints(impl_edge_id)? else {
            return Ok(());
        };

        let prop_id = self.propagated_edge(from_arch, to_arch, &kind).ok_or_else(|| {
            GraphError::CorruptState(format!(
                "no propagated edge {from_arch} -> {to_arch} ({kind}) for dependency {impl_edge_id}"
            ))
        })?;

        if let Some(impls) = self.propagation_table.get_mut(&prop_id) {
            impls.remove(&impl_edge_id);
        }
        self.lift(from_arch, to_arch, &kind, -weight)?;
        self.change_impl_ref(prop_id, -weight)
    }

    /// Creates a propagated edge for a dependency that has none yet and
    /// classifies it.
    fn new_propagated_edge(
        &mut self,
        from_arch: NodeId,
        to_arch: NodeId,
        kind: EdgeKind,
        weight: i64,
    ) -> Result<EdgeId, GraphError> {
        let mut edge = Edge::new(from_arch, to_arch, kind, SubgraphKind::Propagated);
        edge.counter = weight;
        let prop_id = self.insert_edge(edge);

        let created = EdgeRef::from(self.edge(prop_id)?);
        tracing::debug!(edge = prop_id, from = from_arch, to = to_arch, "propagated edge added");
        self.notify(ChangeEvent::PropagatedEdgeAdded { edge: created });

        self.classify_propagated(prop_id, weight)?;
        Ok(prop_id)
    }

    /// Lifts a propagated edge with `weight` and decides its state:
    /// allowed by a specified edge, implicitly allowed, or divergent.
    pub(crate) fn classify_propagated(&mut self, prop_id: EdgeId, weight: i64) -> Result<(), GraphError> {
        let (from_arch, to_arch, kind) = {
            let e = self.expect_edge_in(prop_id, SubgraphKind::Propagated)?;
            (e.from, e.to, e.kind.clone())
        };

        let state = if self.lift(from_arch, to_arch, &kind, weight)?.is_some() {
            EdgeState::Allowed
        } else if from_arch == to_arch {
            // every entity may use itself
            EdgeState::ImplicitlyAllowed
        } else if self.config.allow_dependencies_to_parents
            && self.is_descendant_of(from_arch, to_arch)?
        {
            EdgeState::ImplicitlyAllowed
        } else {
            EdgeState::Divergent
        };
        self.transition(prop_id, state)
    }

    /// Adds `delta` to a propagated edge's counter; at zero the edge is dropped.
    pub(crate) fn change_impl_ref(&mut self, prop_id: EdgeId, delta: i64) -> Result<(), GraphError> {
        let new_value = {
            let e = self.expect_edge_in(prop_id, SubgraphKind::Propagated)?;
            e.counter.checked_add(delta).ok_or_else(|| {
                GraphError::CorruptState(format!(
                    "counter of propagated edge {prop_id} overflows adding {delta}"
                ))
            })?
        };

        if new_value <= 0 {
            // removal is reported instead of a state change to undefined
            let removed = self.detach_edge(prop_id)?;
            tracing::debug!(edge = prop_id, from = removed.from, to = removed.to, "propagated edge removed");
            self.notify(ChangeEvent::PropagatedEdgeRemoved {
                edge: EdgeRef::from(&removed),
            });
        } else if let Some(e) = self.edges.get_mut(&prop_id) {
            e.counter = new_value;
        }
        Ok(())
    }

    /// Implementation dependencies currently represented by a propagated
    /// edge, ascending.
    pub fn causing_dependencies(&self, prop_id: EdgeId) -> Result<Vec<EdgeId>, GraphError> {
        self.expect_edge_in(prop_id, SubgraphKind::Propagated)?;
        let mut result: Vec<EdgeId> = self
            .propagation_table
            .get(&prop_id)
            .map(|impls| impls.iter().copied().collect())
            .unwrap_or_default();
        result.sort_unstable();
        Ok(result)
    }
}

/*
What do these unit tests do:

    1. Build two architecture nodes (UI, Service) and implementation nodes mapped
       onto them.

    2. Run propagate_and_lift on single implementation edges directly, after the
       transitive mapping is built.

    3. Expect:
        A propagated edge UI -> Service exists with counter == number of impl edges
        propagation_table[prop_edge] lists the impl edges
        decrease_and_lift undoes exactly one contribution
*/
