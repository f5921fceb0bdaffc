//! Run results

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{NodeId, NodeStatus};

/// A unit failure captured during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFailure {
    /// Node whose unit failed
    pub node_id: NodeId,
    /// Reported error
    pub error: String,
}

/// Outcome of one run
///
/// A run always completes at the engine level. Whether it produced what
/// the caller wanted is read from the final state and the failure list.
#[derive(Debug, Clone)]
pub struct RunReport<S> {
    /// Identifier of this run
    pub run_id: String,
    /// Identifier of the graph that was run
    pub workflow_id: String,
    /// Final merged record
    pub state: S,
    /// Final status of every node
    pub statuses: BTreeMap<NodeId, NodeStatus>,
    /// Failures in completion order
    pub failures: Vec<NodeFailure>,
    /// Number of units dispatched
    pub nodes_executed: u32,
    /// Wall-clock duration
    pub elapsed_ms: u64,
}

impl<S> RunReport<S> {
    /// Whether no unit failed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Final status of a node
    pub fn status(&self, node: &str) -> Option<NodeStatus> {
        self.statuses.get(node).copied()
    }

    /// Failure recorded for a node, if any
    pub fn failure(&self, node: &str) -> Option<&NodeFailure> {
        self.failures.iter().find(|f| f.node_id == node)
    }

    /// Nodes that ended with the given status
    pub fn nodes_with_status(&self, status: NodeStatus) -> Vec<&str> {
        self.statuses
            .iter()
            .filter(|(_, s)| **s == status)
            .map(|(n, _)| n.as_str())
            .collect()
    }
}
