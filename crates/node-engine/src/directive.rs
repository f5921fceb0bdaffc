//! Routing directives returned by agent units

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::NodeId;

/// Where the scheduler should go after a unit completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "targets", rename_all = "snake_case")]
pub enum Next {
    /// End this branch; no outgoing edge fires
    NoFurtherNodes,
    /// Fire the unconditional outgoing edges
    UseDefaultEdges,
    /// Fire the unconditional outgoing edges plus the conditional edges
    /// leading to these targets
    ExplicitTargets(BTreeSet<NodeId>),
}

impl Next {
    /// Build an explicit target set
    pub fn targets<I, T>(targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeId>,
    {
        Self::ExplicitTargets(targets.into_iter().map(Into::into).collect())
    }
}

/// Error payload reported by a unit that could not do its work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    /// Human-readable reason
    pub message: String,
}

impl UnitFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// The value a unit hands back to the scheduler after one invocation
///
/// Created fresh per invocation and consumed immediately; never persisted.
#[derive(Debug, Clone)]
pub struct RoutingDirective<P> {
    /// Fields changed by the unit
    pub patch: P,
    /// Routing decision
    pub next: Next,
    /// Set when the unit failed; the patch is then discarded
    pub failed: Option<UnitFailure>,
}

impl<P> RoutingDirective<P> {
    /// Succeed and let the default edges decide
    pub fn proceed(patch: P) -> Self {
        Self {
            patch,
            next: Next::UseDefaultEdges,
            failed: None,
        }
    }

    /// Succeed and route to the named targets
    pub fn goto<I, T>(patch: P, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeId>,
    {
        Self {
            patch,
            next: Next::targets(targets),
            failed: None,
        }
    }

    /// Succeed and end this branch
    pub fn finish(patch: P) -> Self {
        Self {
            patch,
            next: Next::NoFurtherNodes,
            failed: None,
        }
    }

    /// Whether the unit reported a failure
    pub fn is_failed(&self) -> bool {
        self.failed.is_some()
    }
}

impl<P: Default> RoutingDirective<P> {
    /// Report a failure; the unit's own branch ends here
    pub fn fail(error: impl Into<UnitFailure>) -> Self {
        Self {
            patch: P::default(),
            next: Next::NoFurtherNodes,
            failed: Some(error.into()),
        }
    }
}

impl From<&str> for UnitFailure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for UnitFailure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_ends_branch() {
        let directive: RoutingDirective<()> = RoutingDirective::fail("E1");
        assert!(directive.is_failed());
        assert_eq!(directive.next, Next::NoFurtherNodes);
        assert_eq!(directive.failed.unwrap().message, "E1");
    }

    #[test]
    fn test_goto_collects_targets() {
        let directive = RoutingDirective::goto((), ["b", "a", "b"]);
        match directive.next {
            Next::ExplicitTargets(targets) => {
                assert_eq!(targets.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
            }
            other => panic!("Expected explicit targets, got {:?}", other),
        }
    }

    #[test]
    fn test_next_serde_shape() {
        let json = serde_json::to_value(Next::targets(["x"])).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "explicit_targets", "targets": ["x"]}));
    }
}
