//! Core types for agent graphs
//!
//! These types describe the static topology (nodes, edges, join rules)
//! and the per-run lifecycle of each node.

use serde::{Deserialize, Serialize};

/// Unique name of a node within a graph
pub type NodeId = String;

/// How an edge is enabled when its source node completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Fires whenever the source completes and does not end its branch
    Unconditional,
    /// Fires only if the source's directive names the target explicitly
    Conditional,
}

/// A directed edge between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    /// Source node
    pub source: NodeId,
    /// Target node
    pub target: NodeId,
    /// Enabling condition
    pub kind: EdgeKind,
}

impl GraphEdge {
    /// Create an unconditional edge
    pub fn unconditional(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: EdgeKind::Unconditional,
        }
    }

    /// Create a conditional edge
    pub fn conditional(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: EdgeKind::Conditional,
        }
    }

    /// Whether this edge is enabled without an explicit target
    pub fn is_unconditional(&self) -> bool {
        matches!(self.kind, EdgeKind::Unconditional)
    }
}

/// When a node with incoming edges becomes eligible to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
    /// Run on the first enabling edge (non-fan-in)
    First,
    /// Run only once every required predecessor has arrived
    All,
    /// Wait for every required predecessor to settle, then run if at
    /// least one of them arrived
    Settled,
}

impl JoinPolicy {
    /// Whether this policy makes the node a synchronization point
    pub fn is_fan_in(&self) -> bool {
        !matches!(self, JoinPolicy::First)
    }
}

/// Lifecycle status of a node within a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Waiting on predecessors
    Pending,
    /// Eligible, waiting for a dispatch slot
    Runnable,
    /// Dispatched and not yet reported back
    Running,
    /// Completed with a successful directive
    Done,
    /// Completed with a failed directive
    Failed,
    /// Can never become runnable in this run
    Skipped,
}

impl NodeStatus {
    /// Whether the node has reached a final status for this run
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeStatus::Done | NodeStatus::Failed | NodeStatus::Skipped)
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            NodeStatus::Pending => "pending",
            NodeStatus::Runnable => "runnable",
            NodeStatus::Running => "running",
            NodeStatus::Done => "done",
            NodeStatus::Failed => "failed",
            NodeStatus::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(NodeStatus::Done.is_terminal());
        assert!(NodeStatus::Failed.is_terminal());
        assert!(NodeStatus::Skipped.is_terminal());
        assert!(!NodeStatus::Pending.is_terminal());
        assert!(!NodeStatus::Runnable.is_terminal());
        assert!(!NodeStatus::Running.is_terminal());
    }

    #[test]
    fn test_edge_constructors() {
        let edge = GraphEdge::unconditional("a", "b");
        assert!(edge.is_unconditional());

        let edge = GraphEdge::conditional("a", "c");
        assert!(!edge.is_unconditional());
        assert_eq!(edge.target, "c");
    }

    #[test]
    fn test_join_policy_serde() {
        let json = serde_json::to_string(&JoinPolicy::Settled).unwrap();
        assert_eq!(json, "\"settled\"");
        assert!(!JoinPolicy::First.is_fan_in());
        assert!(JoinPolicy::All.is_fan_in());
    }
}
