// full runs, state queries and summaries
use std::collections::BTreeMap;

use crate::core::events::{ChangeEvent, EdgeRef};
use crate::core::graph::{Edge, GraphError, ReflexionGraph};
use crate::core::state::EdgeState;
use crate::core::types::{EdgeId, SubgraphKind};

impl ReflexionGraph {
    /// Runs the reflexion analysis from scratch and returns every change it
    /// caused. Afterwards only the incremental API may edit the graphs.
    pub fn run(&mut self) -> Result<Vec<ChangeEvent>, GraphError> {
        let result = self.run_from_scratch();
        let events = self.flush_events();
        result.map(|_| events)
    }

    //Run a full reflexion analysis from scratch:
    // - Validates the containment trees
    // - Clears old propagated edges
    // - Resets states/counters
    // - Rebuilds the transitive mapping
    // - Propagates + lifts every dependency leaving a mapped impl node
    // - Finalizes arch edge states (Absent/AllowedAbsent for counter 0)
    fn run_from_scratch(&mut self) -> Result<(), GraphError> {
        self.validate_hierarchy()?;
        tracing::debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "reflexion run started"
        );

        //if we ran before, we must drop old propagated edges, otherwise stale edges can survive
        self.clear_propagated_edges()?;
        self.init_states()?;
        self.rebuild_transitive_mapping()?;

        let mut mapped: Vec<_> = self.implicit_maps_to.keys().copied().collect();
        mapped.sort_unstable();
        for impl_node in mapped {
            let mut outgoing: Vec<EdgeId> = self.outgoing(impl_node).to_vec();
            outgoing.sort_unstable();
            for eid in outgoing {
                self.propagate_and_lift(eid)?;
            }
        }

        self.finalize_architecture_states()?;
        self.analysed = true;

        let summary = self.summary();
        tracing::info!(
            convergent = summary.get(&EdgeState::Convergent).copied().unwrap_or(0),
            divergent = summary.get(&EdgeState::Divergent).copied().unwrap_or(0),
            absent = self.edge_counts().get(&EdgeState::Absent).copied().unwrap_or(0),
            "reflexion run finished"
        );
        Ok(())
    }

    /// Drops the analysis results: propagated edges disappear, specified
    /// edges fall back to `Undefined` and the construction API is usable again.
    pub fn reset_analysis(&mut self) -> Result<Vec<ChangeEvent>, GraphError> {
        let result = self.reset_analysis_inner();
        let events = self.flush_events();
        result.map(|_| events)
    }

    fn reset_analysis_inner(&mut self) -> Result<(), GraphError> {
        self.clear_propagated_edges()?;
        for eid in self.edge_ids(SubgraphKind::Architecture) {
            self.transition(eid, EdgeState::Undefined)?;
            let e = self.edges.get_mut(&eid).ok_or(GraphError::EdgeNotFound(eid))?;
            e.counter = 0;
        }
        self.implicit_maps_to.clear();
        self.propagation_table.clear();
        self.analysed = false;
        tracing::debug!("reflexion analysis reset");
        Ok(())
    }

    fn clear_propagated_edges(&mut self) -> Result<(), GraphError> {
        for eid in self.edge_ids(SubgraphKind::Propagated) {
            let removed = self.detach_edge(eid)?;
            self.notify(ChangeEvent::PropagatedEdgeRemoved {
                edge: EdgeRef::from(&removed),
            });
        }
        self.propagation_table.clear();
        Ok(())
    }

    // specified/0 for every architecture edge; the first run does so silently
    fn init_states(&mut self) -> Result<(), GraphError> {
        for eid in self.edge_ids(SubgraphKind::Architecture) {
            let e = self.edges.get_mut(&eid).ok_or(GraphError::EdgeNotFound(eid))?;
            e.counter = 0;
            if e.state == EdgeState::Undefined {
                e.state = EdgeState::Specified;
            } else {
                self.transition(eid, EdgeState::Specified)?;
            }
        }
        Ok(())
    }

    // Specified + counter==0 -> Absent (AllowedAbsent when optional)
    fn finalize_architecture_states(&mut self) -> Result<(), GraphError> {
        for eid in self.edge_ids(SubgraphKind::Architecture) {
            let e = self.edge(eid)?;
            if e.counter != 0 {
                continue;
            }
            let absent = if e.is_optional() {
                EdgeState::AllowedAbsent
            } else {
                EdgeState::Absent
            };
            self.transition(eid, absent)?;
        }
        Ok(())
    }

    fn expect_architecture_edge(&self, eid: EdgeId) -> Result<&Edge, GraphError> {
        let e = self.edge(eid)?;
        match e.subgraph {
            SubgraphKind::Architecture | SubgraphKind::Propagated => Ok(e),
            found => Err(GraphError::WrongEdgeSubgraph {
                edge: eid,
                expected: SubgraphKind::Architecture,
                found,
            }),
        }
    }

    /// State of a specified or propagated edge.
    pub fn get_state(&self, eid: EdgeId) -> Result<EdgeState, GraphError> {
        Ok(self.expect_architecture_edge(eid)?.state)
    }

    /// Number of implementation dependencies a specified or propagated edge
    /// currently stands for.
    pub fn get_counter(&self, eid: EdgeId) -> Result<i64, GraphError> {
        Ok(self.expect_architecture_edge(eid)?.counter)
    }

    /// Sum of counters per state over all specified and propagated edges.
    pub fn summary(&self) -> BTreeMap<EdgeState, i64> {
        let mut summary: BTreeMap<EdgeState, i64> =
            EdgeState::ALL.into_iter().map(|s| (s, 0)).collect();
        for e in self.architecture_edges() {
            *summary.entry(e.state).or_insert(0) += e.counter;
        }
        summary
    }

    /// Number of specified and propagated edges per state.
    pub fn edge_counts(&self) -> BTreeMap<EdgeState, usize> {
        let mut counts: BTreeMap<EdgeState, usize> =
            EdgeState::ALL.into_iter().map(|s| (s, 0)).collect();
        for e in self.architecture_edges() {
            *counts.entry(e.state).or_insert(0) += 1;
        }
        counts
    }

    pub fn count_violations(&self) -> usize {
        self.architecture_edges()
            .filter(|e| e.state.is_violation())
            .count()
    }

    fn architecture_edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.values().filter(|e| {
            matches!(e.subgraph, SubgraphKind::Architecture | SubgraphKind::Propagated)
        })
    }
}
