//! Fluent builders for graphs and workflows
//!
//! Provides a fluent API for declaring topology programmatically. Nodes
//! are declared implicitly by the edges that mention them.

use std::collections::HashMap;
use std::sync::Arc;

use crate::agent::AgentUnit;
use crate::error::Result;
use crate::graph::{Graph, GraphDefinition, JoinDeclaration};
use crate::state::WorkflowState;
use crate::types::{GraphEdge, JoinPolicy, NodeId};
use crate::workflow::Workflow;

/// Fluent builder for graph topology
///
/// # Example
///
/// ```ignore
/// let graph = GraphBuilder::new("analytics")
///     .entry("orchestrator")
///     .route("orchestrator", "sqlRetriever")
///     .route("orchestrator", "kbRetriever")
///     .edge("sqlRetriever", "analyzer")
///     .edge("kbRetriever", "analyzer")
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    definition: GraphDefinition,
}

impl GraphBuilder {
    /// Create a new graph builder
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            definition: GraphDefinition {
                id: id.into(),
                ..GraphDefinition::default()
            },
        }
    }

    /// Declare the entry node
    pub fn entry(mut self, node: impl Into<String>) -> Self {
        let node = node.into();
        self.declare(&node);
        self.definition.entry = Some(node);
        self
    }

    /// Declare a node without edges
    pub fn node(mut self, node: impl Into<String>) -> Self {
        self.declare(&node.into());
        self
    }

    /// Add an unconditional edge
    pub fn edge(self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.push_edge(GraphEdge::unconditional(source, target))
    }

    /// Add a conditional edge, enabled only when the source names the target
    pub fn route(self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.push_edge(GraphEdge::conditional(source, target))
    }

    /// Set the join policy of a node
    pub fn join(mut self, node: impl Into<String>, policy: JoinPolicy) -> Self {
        self.declaration(node.into()).policy = Some(policy);
        self
    }

    /// Set the required predecessors of a fan-in node
    pub fn require<I, T>(mut self, node: impl Into<String>, predecessors: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeId>,
    {
        let required = predecessors.into_iter().map(Into::into).collect();
        self.declaration(node.into()).required = Some(required);
        self
    }

    /// Return the raw definition without validation
    pub fn into_definition(self) -> GraphDefinition {
        self.definition
    }

    /// Validate and build the graph
    pub fn build(self) -> Result<Graph> {
        Graph::from_definition(self.definition)
    }

    fn push_edge(mut self, edge: GraphEdge) -> Self {
        self.declare(&edge.source);
        self.declare(&edge.target);
        self.definition.edges.push(edge);
        self
    }

    fn declare(&mut self, node: &str) {
        if !self.definition.nodes.iter().any(|n| n == node) {
            self.definition.nodes.push(node.to_string());
        }
    }

    fn declaration(&mut self, node: NodeId) -> &mut JoinDeclaration {
        let joins = &mut self.definition.joins;
        match joins.iter().position(|j| j.node == node) {
            Some(index) => &mut joins[index],
            None => {
                joins.push(JoinDeclaration {
                    node,
                    policy: None,
                    required: None,
                });
                let last = joins.len() - 1;
                &mut joins[last]
            }
        }
    }
}

/// Fluent builder binding agent units to a topology
///
/// # Example
///
/// ```ignore
/// let workflow = WorkflowBuilder::new("fan-out")
///     .agent("start", FnAgent::new(|_: &MyState| RoutingDirective::goto(patch, ["a", "b"])))
///     .agent("a", unit_a)
///     .agent("b", unit_b)
///     .agent("sink", sink)
///     .entry("start")
///     .edge("start", "a")
///     .edge("start", "b")
///     .edge("a", "sink")
///     .edge("b", "sink")
///     .build()?;
/// ```
pub struct WorkflowBuilder<S: WorkflowState> {
    graph: GraphBuilder,
    units: HashMap<NodeId, Arc<dyn AgentUnit<S>>>,
}

impl<S: WorkflowState> WorkflowBuilder<S> {
    /// Create a new workflow builder
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            graph: GraphBuilder::new(id),
            units: HashMap::new(),
        }
    }

    /// Declare a node and bind its unit
    pub fn agent(self, node: impl Into<String>, unit: impl AgentUnit<S> + 'static) -> Self {
        self.shared_agent(node, Arc::new(unit))
    }

    /// Declare a node and bind an already shared unit
    pub fn shared_agent(mut self, node: impl Into<String>, unit: Arc<dyn AgentUnit<S>>) -> Self {
        let node = node.into();
        self.graph = self.graph.node(node.clone());
        self.units.insert(node, unit);
        self
    }

    /// Declare the entry node
    pub fn entry(mut self, node: impl Into<String>) -> Self {
        self.graph = self.graph.entry(node);
        self
    }

    /// Add an unconditional edge
    pub fn edge(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.graph = self.graph.edge(source, target);
        self
    }

    /// Add a conditional edge
    pub fn route(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.graph = self.graph.route(source, target);
        self
    }

    /// Set the join policy of a node
    pub fn join(mut self, node: impl Into<String>, policy: JoinPolicy) -> Self {
        self.graph = self.graph.join(node, policy);
        self
    }

    /// Set the required predecessors of a fan-in node
    pub fn require<I, T>(mut self, node: impl Into<String>, predecessors: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeId>,
    {
        self.graph = self.graph.require(node, predecessors);
        self
    }

    /// Validate the topology and the unit bindings
    pub fn build(self) -> Result<Workflow<S>> {
        let graph = self.graph.build()?;
        Workflow::new(graph, self.units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EdgeKind;

    #[test]
    fn test_edges_declare_nodes_once() {
        let definition = GraphBuilder::new("g")
            .entry("a")
            .edge("a", "b")
            .route("a", "c")
            .edge("b", "c")
            .into_definition();

        assert_eq!(definition.nodes, vec!["a", "b", "c"]);
        assert_eq!(definition.entry.as_deref(), Some("a"));
        assert_eq!(definition.edges[1].kind, EdgeKind::Conditional);
    }

    #[test]
    fn test_join_and_require_merge() {
        let definition = GraphBuilder::new("g")
            .entry("a")
            .edge("a", "b")
            .edge("a", "c")
            .edge("b", "d")
            .edge("c", "d")
            .join("d", JoinPolicy::Settled)
            .require("d", ["b"])
            .into_definition();

        assert_eq!(definition.joins.len(), 1);
        assert_eq!(definition.joins[0].policy, Some(JoinPolicy::Settled));
        assert_eq!(definition.joins[0].required, Some(vec!["b".to_string()]));
    }

    #[test]
    fn test_build_rejects_invalid_graph() {
        let result = GraphBuilder::new("g").node("a").build();
        assert!(result.is_err());
    }
}
