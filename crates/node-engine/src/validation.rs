//! Graph validation
//!
//! Validates graph structure at construction time: node and edge
//! references, acyclicity, reachability from the entry node and join
//! declarations. All errors are collected, not just the first.

use std::collections::{HashSet, VecDeque};

use crate::graph::{
    ancestors, direct_predecessors, implicit_policy, topological_order, GraphDefinition,
};

/// Validation error with location context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No entry node was declared
    MissingEntryNode,
    /// The entry node is not one of the graph's nodes
    UnknownEntryNode { node_id: String },
    /// A node name appears more than once
    DuplicateNode { node_id: String },
    /// An edge references a non-existent node
    UnknownNode { source: String, target: String, node_id: String },
    /// The same source/target pair is declared twice
    DuplicateEdge { source: String, target: String },
    /// Cycle detected among these nodes
    CycleDetected { nodes: Vec<String> },
    /// A node cannot be reached from the entry node
    UnreachableNode { node_id: String },
    /// A join rule names a node that does not exist
    UnknownJoinNode { node_id: String },
    /// More than one join rule for the same node
    DuplicateJoin { node_id: String },
    /// A required predecessor cannot reach the joining node
    UnreachablePredecessor { node_id: String, predecessor: String },
    /// A fan-in node resolves to an empty required-predecessor set
    EmptyJoin { node_id: String },
    /// A node has no agent unit bound to it
    MissingAgent { node_id: String },
    /// An agent unit is bound to a node the graph does not declare
    UnboundAgent { node_id: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEntryNode => write!(f, "Graph has no entry node"),
            Self::UnknownEntryNode { node_id } => {
                write!(f, "Entry node '{}' is not declared", node_id)
            }
            Self::DuplicateNode { node_id } => write!(f, "Node '{}' is declared twice", node_id),
            Self::UnknownNode {
                source,
                target,
                node_id,
            } => {
                write!(
                    f,
                    "Edge '{}' -> '{}' references unknown node '{}'",
                    source, target, node_id
                )
            }
            Self::DuplicateEdge { source, target } => {
                write!(f, "Edge '{}' -> '{}' is declared twice", source, target)
            }
            Self::CycleDetected { nodes } => {
                write!(f, "Cycle detected in graph among [{}]", nodes.join(", "))
            }
            Self::UnreachableNode { node_id } => {
                write!(f, "Node '{}' is not reachable from the entry node", node_id)
            }
            Self::UnknownJoinNode { node_id } => {
                write!(f, "Join rule targets unknown node '{}'", node_id)
            }
            Self::DuplicateJoin { node_id } => {
                write!(f, "Node '{}' has more than one join rule", node_id)
            }
            Self::UnreachablePredecessor {
                node_id,
                predecessor,
            } => {
                write!(
                    f,
                    "Required predecessor '{}' can never reach node '{}'",
                    predecessor, node_id
                )
            }
            Self::EmptyJoin { node_id } => {
                write!(f, "Fan-in node '{}' has no required predecessors", node_id)
            }
            Self::MissingAgent { node_id } => {
                write!(f, "Node '{}' has no agent unit", node_id)
            }
            Self::UnboundAgent { node_id } => {
                write!(f, "Agent unit bound to undeclared node '{}'", node_id)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a graph definition
///
/// Returns all validation errors found.
pub fn validate_graph(definition: &GraphDefinition) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let node_ids = validate_nodes(definition, &mut errors);
    let nodes_ok = errors.is_empty();
    validate_entry(definition, &node_ids, &mut errors);
    let edges_ok = validate_edges(definition, &node_ids, &mut errors);

    // Structural checks need well-formed nodes and edges to mean anything
    if nodes_ok && edges_ok {
        let acyclic = detect_cycles(definition, &mut errors);
        validate_reachability(definition, &mut errors);
        if acyclic {
            validate_joins(definition, &node_ids, &mut errors);
        }
    }

    errors
}

fn validate_nodes<'a>(
    definition: &'a GraphDefinition,
    errors: &mut Vec<ValidationError>,
) -> HashSet<&'a str> {
    let mut node_ids = HashSet::new();
    for node in &definition.nodes {
        if !node_ids.insert(node.as_str()) {
            errors.push(ValidationError::DuplicateNode {
                node_id: node.clone(),
            });
        }
    }
    node_ids
}

fn validate_entry(
    definition: &GraphDefinition,
    node_ids: &HashSet<&str>,
    errors: &mut Vec<ValidationError>,
) {
    match &definition.entry {
        None => errors.push(ValidationError::MissingEntryNode),
        Some(entry) if !node_ids.contains(entry.as_str()) => {
            errors.push(ValidationError::UnknownEntryNode {
                node_id: entry.clone(),
            });
        }
        Some(_) => {}
    }
}

/// Check that all edge endpoints exist and no edge is declared twice
fn validate_edges(
    definition: &GraphDefinition,
    node_ids: &HashSet<&str>,
    errors: &mut Vec<ValidationError>,
) -> bool {
    let before = errors.len();
    let mut seen: HashSet<(&str, &str)> = HashSet::new();

    for edge in &definition.edges {
        for endpoint in [&edge.source, &edge.target] {
            if !node_ids.contains(endpoint.as_str()) {
                errors.push(ValidationError::UnknownNode {
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    node_id: endpoint.clone(),
                });
            }
        }
        if !seen.insert((edge.source.as_str(), edge.target.as_str())) {
            errors.push(ValidationError::DuplicateEdge {
                source: edge.source.clone(),
                target: edge.target.clone(),
            });
        }
    }

    errors.len() == before
}

/// Detect cycles using Kahn's algorithm (topological sort)
fn detect_cycles(definition: &GraphDefinition, errors: &mut Vec<ValidationError>) -> bool {
    let order = topological_order(&definition.nodes, &definition.edges);
    if order.len() == definition.nodes.len() {
        return true;
    }

    let sorted: HashSet<&str> = order.iter().map(|n| n.as_str()).collect();
    let mut nodes: Vec<String> = definition
        .nodes
        .iter()
        .filter(|n| !sorted.contains(n.as_str()))
        .cloned()
        .collect();
    nodes.sort();
    errors.push(ValidationError::CycleDetected { nodes });
    false
}

/// Every node must be reachable from the entry node
fn validate_reachability(definition: &GraphDefinition, errors: &mut Vec<ValidationError>) {
    let Some(entry) = &definition.entry else {
        return;
    };

    let mut reached: HashSet<&str> = HashSet::from([entry.as_str()]);
    let mut queue: VecDeque<&str> = VecDeque::from([entry.as_str()]);
    while let Some(node) = queue.pop_front() {
        for edge in definition.edges.iter().filter(|e| e.source == node) {
            if reached.insert(&edge.target) {
                queue.push_back(&edge.target);
            }
        }
    }

    let mut reported = HashSet::new();
    for node in &definition.nodes {
        if !reached.contains(node.as_str()) && reported.insert(node.as_str()) {
            errors.push(ValidationError::UnreachableNode {
                node_id: node.clone(),
            });
        }
    }
}

/// Join rules must name real nodes, and required predecessors must be
/// able to reach the node they gate
fn validate_joins(
    definition: &GraphDefinition,
    node_ids: &HashSet<&str>,
    errors: &mut Vec<ValidationError>,
) {
    let mut declared = HashSet::new();

    for join in &definition.joins {
        if !node_ids.contains(join.node.as_str()) {
            errors.push(ValidationError::UnknownJoinNode {
                node_id: join.node.clone(),
            });
            continue;
        }
        if !declared.insert(join.node.as_str()) {
            errors.push(ValidationError::DuplicateJoin {
                node_id: join.node.clone(),
            });
            continue;
        }

        let predecessors = direct_predecessors(&definition.edges, &join.node);
        let policy = join
            .policy
            .unwrap_or_else(|| implicit_policy(predecessors.len(), join.required.is_some()));

        let required: Vec<&String> = match &join.required {
            Some(required) => required.iter().collect(),
            None => predecessors.iter().collect(),
        };

        if policy.is_fan_in() && required.is_empty() {
            errors.push(ValidationError::EmptyJoin {
                node_id: join.node.clone(),
            });
            continue;
        }

        let reachable_from = ancestors(&definition.edges, &join.node);
        for predecessor in required {
            if !reachable_from.contains(predecessor) {
                errors.push(ValidationError::UnreachablePredecessor {
                    node_id: join.node.clone(),
                    predecessor: predecessor.clone(),
                });
            }
        }
    }
}
