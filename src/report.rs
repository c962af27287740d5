// serializable result of an analysis
use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::ConfigError;
use crate::core::graph::{GraphError, ReflexionGraph};
use crate::core::state::EdgeState;
use crate::core::types::{EdgeId, SubgraphKind};

/// A divergent or absent architecture edge, described by node names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub edge: EdgeId,
    pub state: EdgeState,
    pub kind: String,
    pub from: String,
    pub to: String,
    pub counter: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReflexionReport {
    /// state -> sum of counters
    pub summary: BTreeMap<String, i64>,
    /// state -> number of edges
    pub edge_counts: BTreeMap<String, usize>,
    pub violations: Vec<Violation>,
}

impl ReflexionReport {
    pub fn to_toon(&self) -> Result<String, ConfigError> {
        toon_format::encode_default(self).map_err(|e| ConfigError::Encode(e.to_string()))
    }
}

impl ReflexionGraph {
    pub fn report(&self) -> Result<ReflexionReport, GraphError> {
        self.ensure_analysed()?;

        let mut violations = Vec::new();
        let mut ids = self.edge_ids(SubgraphKind::Architecture);
        ids.extend(self.edge_ids(SubgraphKind::Propagated));
        ids.sort_unstable();
        for eid in ids {
            let e = self.edge(eid)?;
            if !e.state.is_violation() {
                continue;
            }
            violations.push(Violation {
                edge: eid,
                state: e.state,
                kind: e.kind.to_string(),
                from: self.node(e.from)?.name.clone(),
                to: self.node(e.to)?.name.clone(),
                counter: e.counter,
            });
        }

        Ok(ReflexionReport {
            summary: self
                .summary()
                .into_iter()
                .map(|(s, v)| (s.as_str().to_string(), v))
                .collect(),
            edge_counts: self
                .edge_counts()
                .into_iter()
                .map(|(s, v)| (s.as_str().to_string(), v))
                .collect(),
            violations,
        })
    }
}
