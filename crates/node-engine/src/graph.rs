//! Static graph topology
//!
//! A [`Graph`] is built once from a declarative [`GraphDefinition`],
//! validated, and never mutated afterwards. Every node with incoming
//! edges gets a resolved [`JoinSpec`] describing when it may run.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{NodeEngineError, Result};
use crate::types::{GraphEdge, JoinPolicy, NodeId};
use crate::validation::{validate_graph, ValidationError};

/// Explicit join rule for a node, overriding the implicit one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinDeclaration {
    /// Node the rule applies to
    pub node: NodeId,
    /// Join policy; defaults to `All` with several incoming edges, else `First`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<JoinPolicy>,
    /// Required predecessors; defaults to every direct predecessor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<NodeId>>,
}

/// Declarative node/edge list a graph is built from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDefinition {
    /// Identifier used in events and logs
    pub id: String,
    /// Node that starts every run
    pub entry: Option<NodeId>,
    /// Node names, in declaration order
    pub nodes: Vec<NodeId>,
    /// Directed edges
    pub edges: Vec<GraphEdge>,
    /// Explicit join rules
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<JoinDeclaration>,
}

/// Resolved eligibility rule for a node with incoming edges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    pub policy: JoinPolicy,
    pub required: BTreeSet<NodeId>,
}

/// Validated, immutable topology
#[derive(Debug, Clone)]
pub struct Graph {
    id: String,
    entry: NodeId,
    nodes: Vec<NodeId>,
    edges: Vec<GraphEdge>,
    joins: HashMap<NodeId, JoinSpec>,
    topo_order: Vec<NodeId>,
}

impl Graph {
    /// Validate a definition and build the graph
    ///
    /// Fails fast with every validation error found.
    pub fn from_definition(definition: GraphDefinition) -> Result<Self> {
        let errors = validate_graph(&definition);
        if !errors.is_empty() {
            return Err(NodeEngineError::Configuration(errors));
        }

        let GraphDefinition {
            id,
            entry,
            nodes,
            edges,
            joins: declarations,
        } = definition;
        let entry = entry
            .ok_or_else(|| NodeEngineError::configuration(ValidationError::MissingEntryNode))?;
        let topo_order = topological_order(&nodes, &edges);
        if topo_order.len() != nodes.len() {
            return Err(NodeEngineError::configuration(ValidationError::CycleDetected {
                nodes: Vec::new(),
            }));
        }

        let mut joins = HashMap::new();
        for node in &nodes {
            let predecessors = direct_predecessors(&edges, node);
            if predecessors.is_empty() {
                continue;
            }
            let declaration = declarations.iter().find(|d| &d.node == node);
            joins.insert(node.clone(), resolve_join(declaration, predecessors));
        }

        Ok(Self {
            id,
            entry,
            nodes,
            edges,
            joins,
            topo_order,
        })
    }

    /// Graph identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Node every run starts from
    pub fn entry_node(&self) -> &str {
        &self.entry
    }

    /// All nodes in declaration order
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Check whether a node exists
    pub fn contains(&self, node: &str) -> bool {
        self.nodes.iter().any(|n| n == node)
    }

    /// Edges leaving a node
    pub fn outgoing_edges<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == node)
    }

    /// Edges entering a node
    pub fn incoming_edges<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.target == node)
    }

    /// Join policy of a node; `None` for nodes without incoming edges
    pub fn join_policy(&self, node: &str) -> Option<JoinPolicy> {
        self.joins.get(node).map(|j| j.policy)
    }

    /// Predecessors that must arrive before a fan-in node runs
    ///
    /// Empty for non-fan-in nodes.
    pub fn required_predecessors(&self, node: &str) -> BTreeSet<NodeId> {
        match self.joins.get(node) {
            Some(join) if join.policy.is_fan_in() => join.required.clone(),
            _ => BTreeSet::new(),
        }
    }

    /// Whether the node is a synchronization point
    pub fn is_fan_in(&self, node: &str) -> bool {
        self.join_policy(node).is_some_and(|p| p.is_fan_in())
    }

    /// Nodes ordered so that every edge points forward
    pub fn topological_order(&self) -> &[NodeId] {
        &self.topo_order
    }

    /// Every node that can reach `node`
    pub fn ancestors(&self, node: &str) -> HashSet<NodeId> {
        ancestors(&self.edges, node)
    }
}

/// Policy used when a node has no explicit one: several incoming edges or
/// an explicit required set make it a strict fan-in
pub(crate) fn implicit_policy(predecessor_count: usize, has_required: bool) -> JoinPolicy {
    if predecessor_count > 1 || has_required {
        JoinPolicy::All
    } else {
        JoinPolicy::First
    }
}

fn resolve_join(declaration: Option<&JoinDeclaration>, predecessors: BTreeSet<NodeId>) -> JoinSpec {
    let has_required = declaration.is_some_and(|d| d.required.is_some());
    let policy = declaration
        .and_then(|d| d.policy)
        .unwrap_or_else(|| implicit_policy(predecessors.len(), has_required));
    let required = declaration
        .and_then(|d| d.required.clone())
        .map(|r| r.into_iter().collect())
        .unwrap_or(predecessors);
    JoinSpec { policy, required }
}

pub(crate) fn direct_predecessors(edges: &[GraphEdge], node: &str) -> BTreeSet<NodeId> {
    edges
        .iter()
        .filter(|e| e.target == node)
        .map(|e| e.source.clone())
        .collect()
}

pub(crate) fn ancestors(edges: &[GraphEdge], node: &str) -> HashSet<NodeId> {
    let mut seen = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::from([node]);
    while let Some(current) = queue.pop_front() {
        for edge in edges.iter().filter(|e| e.target == current) {
            if seen.insert(edge.source.clone()) {
                queue.push_back(&edge.source);
            }
        }
    }
    seen
}

/// Kahn's algorithm
///
/// Nodes caught in (or behind) a cycle are left out, so a result shorter
/// than `nodes` means the edges are cyclic.
pub(crate) fn topological_order(nodes: &[NodeId], edges: &[GraphEdge]) -> Vec<NodeId> {
    let mut in_degree: HashMap<&str, usize> = nodes.iter().map(|n| (n.as_str(), 0)).collect();
    for edge in edges {
        if let Some(deg) = in_degree.get_mut(edge.target.as_str()) {
            *deg += 1;
        }
    }

    // Seed in declaration order so the result is deterministic
    let mut queue: VecDeque<&str> = nodes
        .iter()
        .map(|n| n.as_str())
        .filter(|n| in_degree.get(n) == Some(&0))
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(node) = queue.pop_front() {
        order.push(node.to_string());
        for edge in edges.iter().filter(|e| e.source == node) {
            if let Some(deg) = in_degree.get_mut(edge.target.as_str()) {
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(&edge.target);
                }
            }
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;

    fn diamond() -> Graph {
        GraphBuilder::new("diamond")
            .entry("start")
            .edge("start", "a")
            .edge("start", "b")
            .edge("a", "sink")
            .edge("b", "sink")
            .build()
            .unwrap()
    }

    #[test]
    fn test_implicit_fan_in() {
        let graph = diamond();
        assert!(graph.is_fan_in("sink"));
        assert!(!graph.is_fan_in("a"));
        assert_eq!(graph.join_policy("sink"), Some(JoinPolicy::All));
        assert_eq!(graph.join_policy("start"), None);

        let required: Vec<_> = graph.required_predecessors("sink").into_iter().collect();
        assert_eq!(required, vec!["a", "b"]);
        assert!(graph.required_predecessors("a").is_empty());
    }

    #[test]
    fn test_topological_order_is_forward() {
        let graph = diamond();
        let order = graph.topological_order();
        let position = |n: &str| order.iter().position(|o| o == n).unwrap();

        assert_eq!(order.len(), 4);
        assert_eq!(order[0], "start");
        assert!(position("a") < position("sink"));
        assert!(position("b") < position("sink"));
    }

    #[test]
    fn test_ancestors() {
        let graph = diamond();
        let ancestors = graph.ancestors("sink");
        assert_eq!(ancestors.len(), 3);
        assert!(ancestors.contains("start"));
        assert!(graph.ancestors("start").is_empty());
    }

    #[test]
    fn test_explicit_join_overrides_implicit() {
        let graph = GraphBuilder::new("partial")
            .entry("start")
            .edge("start", "a")
            .edge("start", "b")
            .edge("a", "sink")
            .edge("b", "sink")
            .join("sink", JoinPolicy::Settled)
            .build()
            .unwrap();

        assert_eq!(graph.join_policy("sink"), Some(JoinPolicy::Settled));
        assert_eq!(graph.required_predecessors("sink").len(), 2);
    }

    #[test]
    fn test_edges_by_direction() {
        let graph = diamond();
        let outgoing: Vec<_> = graph.outgoing_edges("start").map(|e| e.target.as_str()).collect();
        assert_eq!(outgoing, vec!["a", "b"]);
        assert_eq!(graph.incoming_edges("sink").count(), 2);
        assert_eq!(graph.entry_node(), "start");
    }

    #[test]
    fn test_definition_from_json() {
        let json = serde_json::json!({
            "id": "from-json",
            "entry": "start",
            "nodes": ["start", "end"],
            "edges": [{"source": "start", "target": "end", "kind": "conditional"}]
        });
        let definition: GraphDefinition = serde_json::from_value(json).unwrap();
        let graph = Graph::from_definition(definition).unwrap();

        assert_eq!(graph.id(), "from-json");
        assert!(graph.contains("end"));
        assert!(!graph.outgoing_edges("start").next().unwrap().is_unconditional());
    }
}
