// change notifications for consumers that mirror the reflexion results
use std::sync::mpsc::Sender;

use serde::Serialize;

use crate::core::graph::{Edge, ReflexionGraph};
use crate::core::state::EdgeState;
use crate::core::types::{EdgeId, EdgeKind, NodeId, SubgraphKind};

/// Snapshot of an edge at the time of the event. Removed edges stay
/// describable after they are gone from the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeRef {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
}

impl From<&Edge> for EdgeRef {
    fn from(e: &Edge) -> Self {
        EdgeRef {
            id: e.id,
            from: e.from,
            to: e.to,
            kind: e.kind.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChangeEvent {
    StateChanged {
        edge: EdgeRef,
        old: EdgeState,
        new: EdgeState,
    },
    PropagatedEdgeAdded {
        edge: EdgeRef,
    },
    PropagatedEdgeRemoved {
        edge: EdgeRef,
    },
    MapsToEdgeAdded {
        edge: EdgeRef,
    },
    MapsToEdgeRemoved {
        edge: EdgeRef,
    },
    /// An implementation or specified dependency added through the
    /// incremental API.
    DependencyAdded {
        edge: EdgeRef,
        subgraph: SubgraphKind,
    },
    DependencyRemoved {
        edge: EdgeRef,
        subgraph: SubgraphKind,
    },
}

impl ChangeEvent {
    pub fn edge(&self) -> &EdgeRef {
        match self {
            ChangeEvent::StateChanged { edge, .. }
            | ChangeEvent::PropagatedEdgeAdded { edge }
            | ChangeEvent::PropagatedEdgeRemoved { edge }
            | ChangeEvent::MapsToEdgeAdded { edge }
            | ChangeEvent::MapsToEdgeRemoved { edge }
            | ChangeEvent::DependencyAdded { edge, .. }
            | ChangeEvent::DependencyRemoved { edge, .. } => edge,
        }
    }
}

/// Receives every change once the engine call that produced it has finished.
pub trait Observer {
    fn on_change(&mut self, event: &ChangeEvent);
}

impl Observer for Sender<ChangeEvent> {
    fn on_change(&mut self, event: &ChangeEvent) {
        // a dropped receiver just means nobody listens any more
        let _ = self.send(event.clone());
    }
}

impl ReflexionGraph {
    pub fn register_observer(&mut self, observer: impl Observer + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub(crate) fn notify(&mut self, event: ChangeEvent) {
        tracing::trace!(?event, "reflexion change");
        self.pending_events.push(event);
    }

    pub(crate) fn notify_state_change(&mut self, edge: &Edge, old: EdgeState, new: EdgeState) {
        self.notify(ChangeEvent::StateChanged {
            edge: EdgeRef::from(edge),
            old,
            new,
        });
    }

    /// Hands the events of the finished operation to every observer and
    /// returns them to the caller.
    pub(crate) fn flush_events(&mut self) -> Vec<ChangeEvent> {
        let events = std::mem::take(&mut self.pending_events);
        for observer in self.observers.iter_mut() {
            for event in &events {
                observer.on_change(event);
            }
        }
        events
    }
}
