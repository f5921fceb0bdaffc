//! The contract every graph node implements

use async_trait::async_trait;

use crate::directive::RoutingDirective;
use crate::state::WorkflowState;

/// A single processing stage in an agent graph
///
/// A unit receives an immutable snapshot of every field written so far
/// and returns only what it changed plus a routing decision. Fields that
/// are absent are "not yet available", never an error.
///
/// Units must not panic or return early with an error: internal failures
/// are reported through [`RoutingDirective::fail`]. The scheduler still
/// captures panics, but treats them as a bug in the unit.
#[async_trait]
pub trait AgentUnit<S: WorkflowState>: Send + Sync {
    /// Run once against a snapshot of the shared record
    async fn run(&self, state: &S) -> RoutingDirective<S::Patch>;
}

/// Adapter turning a synchronous closure into an [`AgentUnit`]
///
/// Handy for glue nodes and tests.
pub struct FnAgent<F> {
    f: F,
}

impl<F> FnAgent<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<S, F> AgentUnit<S> for FnAgent<F>
where
    S: WorkflowState,
    F: Fn(&S) -> RoutingDirective<S::Patch> + Send + Sync,
{
    async fn run(&self, state: &S) -> RoutingDirective<S::Patch> {
        (self.f)(state)
    }
}
