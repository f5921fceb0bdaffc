//! A graph with an agent unit bound to every node

use std::collections::HashMap;
use std::sync::Arc;

use crate::agent::AgentUnit;
use crate::error::{NodeEngineError, Result};
use crate::graph::Graph;
use crate::state::WorkflowState;
use crate::types::NodeId;
use crate::validation::ValidationError;

/// Validated topology plus the units that run at each node
pub struct Workflow<S: WorkflowState> {
    graph: Arc<Graph>,
    units: HashMap<NodeId, Arc<dyn AgentUnit<S>>>,
}

impl<S: WorkflowState> Clone for Workflow<S> {
    fn clone(&self) -> Self {
        Self {
            graph: Arc::clone(&self.graph),
            units: self.units.clone(),
        }
    }
}

impl<S: WorkflowState> Workflow<S> {
    /// Bind units to a graph
    ///
    /// Every node needs exactly one unit, and every unit must belong to a
    /// declared node.
    pub fn new(graph: Graph, units: HashMap<NodeId, Arc<dyn AgentUnit<S>>>) -> Result<Self> {
        let mut errors = Vec::new();

        for node in graph.nodes() {
            if !units.contains_key(node) {
                errors.push(ValidationError::MissingAgent {
                    node_id: node.clone(),
                });
            }
        }

        let mut unbound: Vec<&NodeId> = units.keys().filter(|n| !graph.contains(n)).collect();
        unbound.sort();
        for node in unbound {
            errors.push(ValidationError::UnboundAgent {
                node_id: node.clone(),
            });
        }

        if !errors.is_empty() {
            return Err(NodeEngineError::Configuration(errors));
        }

        Ok(Self {
            graph: Arc::new(graph),
            units,
        })
    }

    /// The workflow topology
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Unit bound to a node
    pub fn unit(&self, node: &str) -> Result<Arc<dyn AgentUnit<S>>> {
        self.units
            .get(node)
            .cloned()
            .ok_or_else(|| NodeEngineError::UnknownNode(node.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::FnAgent;
    use crate::builder::{GraphBuilder, WorkflowBuilder};
    use crate::directive::RoutingDirective;
    use crate::testing::{patch, TestState};

    fn noop() -> Arc<dyn AgentUnit<TestState>> {
        Arc::new(FnAgent::new(|_: &TestState| RoutingDirective::proceed(patch())))
    }

    #[test]
    fn test_missing_and_unbound_agents() {
        let graph = GraphBuilder::new("g").entry("a").edge("a", "b").build().unwrap();
        let mut units = HashMap::new();
        units.insert("a".to_string(), noop());
        units.insert("ghost".to_string(), noop());

        let err = Workflow::new(graph, units).err().unwrap();
        assert_eq!(
            err.validation_errors(),
            &[
                ValidationError::MissingAgent {
                    node_id: "b".to_string()
                },
                ValidationError::UnboundAgent {
                    node_id: "ghost".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_builder_binds_units() {
        let workflow = WorkflowBuilder::<TestState>::new("g")
            .shared_agent("a", noop())
            .shared_agent("b", noop())
            .entry("a")
            .edge("a", "b")
            .build()
            .unwrap();

        assert!(workflow.unit("b").is_ok());
        assert!(matches!(
            workflow.unit("c").err(),
            Some(NodeEngineError::UnknownNode(node)) if node == "c"
        ));
    }
}
