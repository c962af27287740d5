// lifting/hierarchy logic
//does this propagated relationship correspond to something the architecture allows?
/*

Specified:  architecture edge declared by the architect, not yet evaluated

Convergent: specified ∧ implemented (counter > 0)

Absent:     specified ∧ not implemented (counter == 0, decided after propagation)

A propagated edge src -> tgt is allowed by a specified edge S -> T if S is src or
one of its ancestors and T is tgt or one of its ancestors. Walking outward from
src, the first such edge wins.

*/
use std::collections::HashSet;

use crate::core::graph::{GraphError, ReflexionGraph};
use crate::core::state::EdgeState;
use crate::core::types::{EdgeId, EdgeKind, NodeId, SubgraphKind};

impl ReflexionGraph {
    /// Finds the specified edge that allows a dependency `from -> to` of the
    /// given type, without touching any counter.
    pub fn find_allowing_edge(
        &self,
        from_arch: NodeId,
        to_arch: NodeId,
        kind: &EdgeKind,
    ) -> Result<Option<EdgeId>, GraphError> {
        let targets: HashSet<NodeId> = self.ancestors_or_self(to_arch)?.into_iter().collect();

        for cursor in self.ancestors_or_self(from_arch)? {
            let Some(out) = self.arch_out.get(&cursor) else {
                continue;
            };
            for &eid in out {
                let e = self.edges.get(&eid).ok_or(GraphError::EdgeNotFound(eid))?;
                if e.subgraph == SubgraphKind::Architecture
                    && targets.contains(&e.to)
                    && self.config.edge_type_matching.matches(&e.kind, kind)
                {
                    return Ok(Some(eid));
                }
            }
        }
        Ok(None)
    }

    /// Lifts a dependency onto the nearest allowing specified edge and adds
    /// `delta` to that edge's counter. Returns the allowing edge, if any.
    pub(crate) fn lift(
        &mut self,
        from_arch: NodeId,
        to_arch: NodeId,
        kind: &EdgeKind,
        delta: i64,
    ) -> Result<Option<EdgeId>, GraphError> {
        let allowing = self.find_allowing_edge(from_arch, to_arch, kind)?;
        if let Some(arch_eid) = allowing {
            self.change_architecture_dependency(arch_eid, delta)?;
        }
        Ok(allowing)
    }

    /// Adds `delta` to the counter of a specified edge: 0 -> n makes it
    /// convergent, n -> 0 absent (or allowed-absent when optional).
    pub(crate) fn change_architecture_dependency(
        &mut self,
        arch_eid: EdgeId,
        delta: i64,
    ) -> Result<(), GraphError> {
        let (old_value, optional) = {
            let e = self.expect_edge_in(arch_eid, SubgraphKind::Architecture)?;
            (e.counter, e.is_optional())
        };
        let new_value = old_value.checked_add(delta).ok_or_else(|| {
            GraphError::CorruptState(format!(
                "counter of specified edge {arch_eid} overflows adding {delta}"
            ))
        })?;
        if new_value < 0 {
            return Err(GraphError::CorruptState(format!(
                "counter of specified edge {arch_eid} would drop to {new_value}"
            )));
        }

        if old_value == 0 && new_value > 0 {
            self.transition(arch_eid, EdgeState::Convergent)?;
        } else if old_value > 0 && new_value == 0 {
            let absent = if optional {
                EdgeState::AllowedAbsent
            } else {
                EdgeState::Absent
            };
            self.transition(arch_eid, absent)?;
        }
        if let Some(e) = self.edges.get_mut(&arch_eid) {
            e.counter = new_value;
        }
        Ok(())
    }

    /// Moves an edge into `new_state`, reporting the change if there is one.
    pub(crate) fn transition(&mut self, eid: EdgeId, new_state: EdgeState) -> Result<(), GraphError> {
        let e = self.edges.get_mut(&eid).ok_or(GraphError::EdgeNotFound(eid))?;
        let old_state = e.state;
        if old_state == new_state {
            return Ok(());
        }
        e.state = new_state;
        let snapshot = e.clone();
        self.notify_state_change(&snapshot, old_state, new_state);
        Ok(())
    }

    /// The specified edge currently allowing a propagated edge, if any.
    pub fn allowing_edge(&self, propagated: EdgeId) -> Result<Option<EdgeId>, GraphError> {
        let e = self.expect_edge_in(propagated, SubgraphKind::Propagated)?;
        if e.state != EdgeState::Allowed {
            return Ok(None);
        }
        self.find_allowing_edge(e.from, e.to, &e.kind)
    }
}
