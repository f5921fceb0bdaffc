//! Node Engine - concurrent execution of agent graphs
//!
//! This crate runs a directed acyclic graph of agent units over one shared,
//! progressively extended state record. It supports:
//!
//! - Conditional fan-out: a unit names which downstream branches to enable
//! - Barrier fan-in: a node waits for all (or all surviving) predecessors
//! - Partial failure: a failed branch is skipped, its siblings keep going
//! - Parallel dispatch with an optional concurrency cap
//!
//! # Architecture
//!
//! - [`Graph`]: validated, immutable topology built from a [`GraphDefinition`]
//! - [`AgentUnit`]: async contract every node implements
//! - [`RoutingDirective`]: patch plus routing decision returned by a unit
//! - [`Scheduler`]: owns the record during a run and applies patches serially
//! - [`EventSink`]: generic progress streaming (log, vector, channel)
//!
//! # Example
//!
//! ```ignore
//! use node_engine::{NullEventSink, RoutingDirective, Scheduler, WorkflowBuilder};
//!
//! let workflow = WorkflowBuilder::new("pipeline")
//!     .agent("plan", planner)
//!     .agent("fetch_a", fetch_a)
//!     .agent("fetch_b", fetch_b)
//!     .agent("merge", merger)
//!     .entry("plan")
//!     .route("plan", "fetch_a")
//!     .route("plan", "fetch_b")
//!     .edge("fetch_a", "merge")
//!     .edge("fetch_b", "merge")
//!     .build()?;
//!
//! let report = Scheduler::new(workflow).run(initial, &NullEventSink).await;
//! ```

pub mod agent;
pub mod builder;
pub mod directive;
pub mod error;
pub mod events;
pub mod graph;
pub mod scheduler;
pub mod state;
pub mod types;
pub mod validation;
pub mod workflow;

#[cfg(test)]
mod testing;

// Re-export key types
pub use agent::{AgentUnit, FnAgent};
pub use builder::{GraphBuilder, WorkflowBuilder};
pub use directive::{Next, RoutingDirective, UnitFailure};
pub use error::{NodeEngineError, Result};
pub use events::{EventError, EventSink, LogEventSink, NullEventSink, VecEventSink, WorkflowEvent};
pub use graph::{Graph, GraphDefinition, JoinDeclaration, JoinSpec};
pub use scheduler::{NodeFailure, RunReport, Scheduler};
pub use state::WorkflowState;
pub use types::{EdgeKind, GraphEdge, JoinPolicy, NodeId, NodeStatus};
pub use validation::ValidationError;
pub use workflow::Workflow;
