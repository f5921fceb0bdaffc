//! Run scheduler for agent workflows.
//!
//! The scheduler drives one run of a [`Workflow`](crate::Workflow) from its
//! entry node to completion:
//!
//! - **Dispatch**: runnable nodes are spawned as independent tasks, each
//!   against its own snapshot of the shared record
//! - **Apply**: completions are folded into the record one at a time, in a
//!   single critical section that also recomputes eligibility
//! - **Fan-out**: a directive can enable several downstream nodes at once
//! - **Fan-in**: a node with required predecessors waits until all of them
//!   have arrived (or, with [`JoinPolicy::Settled`](crate::JoinPolicy),
//!   until all of them have settled)
//! - **Partial failure**: a failed unit ends only its own branch; sibling
//!   branches already in flight keep running and their results are kept
//!
//! # Example
//!
//! ```ignore
//! let scheduler = Scheduler::new(workflow).with_max_parallel(4);
//! let report = scheduler.run(initial_state, &NullEventSink).await;
//!
//! for failure in &report.failures {
//!     eprintln!("{} failed: {}", failure.node_id, failure.error);
//! }
//! ```

mod executor;
mod run;
mod types;

pub use executor::Scheduler;
pub use types::{NodeFailure, RunReport};
