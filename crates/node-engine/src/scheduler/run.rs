//! Per-run bookkeeping: node statuses, fired edges and eligibility

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::directive::Next;
use crate::graph::Graph;
use crate::types::{JoinPolicy, NodeId, NodeStatus};

/// What an incoming edge or required predecessor has delivered so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arrival {
    /// Delivered a result
    Arrived,
    /// Settled without delivering, and never will
    Dead,
    /// Not settled yet
    Open,
}

/// Eligibility of a pending node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Eligibility {
    Waiting,
    Runnable,
    Skip,
}

/// Outgoing edges fired by a completion
#[derive(Debug, Default)]
pub(crate) struct Routing {
    pub fired: Vec<NodeId>,
    /// Explicit targets with no matching edge
    pub ignored: Vec<NodeId>,
}

/// Result of one settle pass
#[derive(Debug, Default)]
pub(crate) struct Settled {
    pub runnable: Vec<NodeId>,
    pub skipped: Vec<NodeId>,
}

/// Mutable state of one run
///
/// Owned by the scheduler loop; never shared with units.
#[derive(Debug)]
pub(crate) struct RunState {
    statuses: HashMap<NodeId, NodeStatus>,
    fired: HashSet<(NodeId, NodeId)>,
}

impl RunState {
    /// Entry node runnable, everything else pending
    pub fn new(graph: &Graph) -> Self {
        let statuses = graph
            .nodes()
            .iter()
            .map(|node| {
                let status = if node == graph.entry_node() {
                    NodeStatus::Runnable
                } else {
                    NodeStatus::Pending
                };
                (node.clone(), status)
            })
            .collect();

        Self {
            statuses,
            fired: HashSet::new(),
        }
    }

    pub fn status(&self, node: &str) -> NodeStatus {
        self.statuses
            .get(node)
            .copied()
            .unwrap_or(NodeStatus::Pending)
    }

    pub fn set(&mut self, node: &str, status: NodeStatus) {
        if let Some(current) = self.statuses.get_mut(node) {
            *current = status;
        }
    }

    /// Mark a node done and fire the edges its directive enables
    pub fn complete(&mut self, graph: &Graph, node: &str, next: &Next) -> Routing {
        self.set(node, NodeStatus::Done);

        let mut routing = Routing::default();
        for edge in graph.outgoing_edges(node) {
            let enabled = match next {
                Next::NoFurtherNodes => false,
                Next::UseDefaultEdges => edge.is_unconditional(),
                Next::ExplicitTargets(targets) => {
                    edge.is_unconditional() || targets.contains(&edge.target)
                }
            };
            if enabled {
                self.fired.insert((edge.source.clone(), edge.target.clone()));
                routing.fired.push(edge.target.clone());
            }
        }

        if let Next::ExplicitTargets(targets) = next {
            let declared: BTreeSet<&str> = graph
                .outgoing_edges(node)
                .map(|e| e.target.as_str())
                .collect();
            routing.ignored = targets
                .iter()
                .filter(|t| !declared.contains(t.as_str()))
                .cloned()
                .collect();
        }

        routing
    }

    /// Walk pending nodes in topological order and resolve the ones whose
    /// fate is decided. A single pass is enough because skips only flow
    /// forward along edges.
    pub fn settle(&mut self, graph: &Graph) -> Settled {
        let mut settled = Settled::default();

        for node in graph.topological_order() {
            if self.status(node) != NodeStatus::Pending {
                continue;
            }
            match self.eligibility(graph, node) {
                Eligibility::Waiting => {}
                Eligibility::Runnable => {
                    self.set(node, NodeStatus::Runnable);
                    settled.runnable.push(node.clone());
                }
                Eligibility::Skip => {
                    self.set(node, NodeStatus::Skipped);
                    settled.skipped.push(node.clone());
                }
            }
        }

        settled
    }

    /// Decide whether a pending node can run, must wait, or never will
    pub fn eligibility(&self, graph: &Graph, node: &str) -> Eligibility {
        let Some(policy) = graph.join_policy(node) else {
            // only the entry node lacks incoming edges, and it never waits
            return Eligibility::Skip;
        };

        let incoming: Vec<Arrival> = graph
            .incoming_edges(node)
            .map(|edge| self.edge_arrival(&edge.source, node))
            .collect();
        let any_arrived = incoming.contains(&Arrival::Arrived);
        let all_dead = incoming.iter().all(|a| *a == Arrival::Dead);

        let by_edges = if any_arrived {
            Eligibility::Runnable
        } else if all_dead {
            Eligibility::Skip
        } else {
            Eligibility::Waiting
        };

        let required: Vec<Arrival> = graph
            .required_predecessors(node)
            .iter()
            .map(|pred| self.predecessor_arrival(graph, pred, node))
            .collect();

        match policy {
            JoinPolicy::First => by_edges,
            JoinPolicy::All => {
                if required.contains(&Arrival::Dead) {
                    Eligibility::Skip
                } else if required.contains(&Arrival::Open) {
                    Eligibility::Waiting
                } else {
                    by_edges
                }
            }
            JoinPolicy::Settled => {
                if required.contains(&Arrival::Open) {
                    Eligibility::Waiting
                } else if !required.contains(&Arrival::Arrived) {
                    Eligibility::Skip
                } else {
                    by_edges
                }
            }
        }
    }

    /// Final status of every node, leftovers resolved
    ///
    /// Called once nothing is in flight. Any node still pending has no
    /// live path left and is reported as skipped.
    pub fn finish(&mut self) -> (BTreeMap<NodeId, NodeStatus>, Vec<NodeId>) {
        let mut leftovers: Vec<NodeId> = self
            .statuses
            .iter()
            .filter(|(_, s)| !s.is_terminal())
            .map(|(n, _)| n.clone())
            .collect();
        leftovers.sort();

        for node in &leftovers {
            self.set(node, NodeStatus::Skipped);
        }

        let statuses = self
            .statuses
            .iter()
            .map(|(n, s)| (n.clone(), *s))
            .collect();
        (statuses, leftovers)
    }

    fn edge_arrival(&self, source: &str, target: &str) -> Arrival {
        match self.status(source) {
            NodeStatus::Done => {
                if self.fired.contains(&(source.to_string(), target.to_string())) {
                    Arrival::Arrived
                } else {
                    Arrival::Dead
                }
            }
            NodeStatus::Failed | NodeStatus::Skipped => Arrival::Dead,
            _ => Arrival::Open,
        }
    }

    fn predecessor_arrival(&self, graph: &Graph, predecessor: &str, node: &str) -> Arrival {
        let direct = graph
            .incoming_edges(node)
            .any(|edge| edge.source == predecessor);
        if direct {
            return self.edge_arrival(predecessor, node);
        }
        match self.status(predecessor) {
            NodeStatus::Done => Arrival::Arrived,
            NodeStatus::Failed | NodeStatus::Skipped => Arrival::Dead,
            _ => Arrival::Open,
        }
    }
}
