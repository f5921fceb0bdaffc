//! Async scheduler driving a workflow run

use std::any::Any;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use super::run::RunState;
use super::types::{NodeFailure, RunReport};
use crate::directive::RoutingDirective;
use crate::error::{NodeEngineError, Result};
use crate::events::{EventSink, WorkflowEvent};
use crate::state::WorkflowState;
use crate::types::{NodeId, NodeStatus};
use crate::workflow::Workflow;

type Completion<P> = (NodeId, RoutingDirective<P>);

/// Runs a [`Workflow`] against an initial record
///
/// The scheduler owns the authoritative record for the duration of a run.
/// Units see cloned snapshots and hand back patches, which are applied one
/// at a time in completion order.
pub struct Scheduler<S: WorkflowState> {
    workflow: Workflow<S>,
    /// Maximum units in flight; 0 means unbounded
    max_parallel: usize,
}

impl<S: WorkflowState> Scheduler<S> {
    /// Create a scheduler with unbounded parallelism
    pub fn new(workflow: Workflow<S>) -> Self {
        Self {
            workflow,
            max_parallel: 0,
        }
    }

    /// Cap the number of units in flight (0 = unbounded)
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    /// The workflow this scheduler runs
    pub fn workflow(&self) -> &Workflow<S> {
        &self.workflow
    }

    /// Run to completion
    ///
    /// A run always terminates: once nothing is runnable or running, every
    /// remaining node is skipped and the report is returned. Unit failures
    /// are part of the report, not an error.
    pub async fn run(&self, initial: S, event_sink: &dyn EventSink) -> RunReport<S> {
        self.execute(new_run_id(), initial, event_sink).await
    }

    /// Run to completion or give up after `timeout`
    ///
    /// On timeout the partial result is discarded. Units already in flight
    /// are not interrupted; their results are simply never applied.
    pub async fn run_with_timeout(
        &self,
        initial: S,
        timeout: Duration,
        event_sink: &dyn EventSink,
    ) -> Result<RunReport<S>> {
        let run_id = new_run_id();
        match tokio::time::timeout(timeout, self.execute(run_id.clone(), initial, event_sink)).await
        {
            Ok(report) => Ok(report),
            Err(_) => {
                log::warn!("Run '{}' abandoned after {:?}", run_id, timeout);
                Err(NodeEngineError::Timeout {
                    run_id,
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    async fn execute(&self, run_id: String, initial: S, event_sink: &dyn EventSink) -> RunReport<S> {
        let started = Instant::now();
        let graph = self.workflow.graph();
        let workflow_id = graph.id().to_string();

        log::info!("Starting run '{}' of workflow '{}'", run_id, workflow_id);
        self.emit(
            event_sink,
            WorkflowEvent::RunStarted {
                workflow_id: workflow_id.clone(),
                run_id: run_id.clone(),
            },
        );

        let mut run = RunState::new(graph);
        let mut state = initial;
        let mut failures = Vec::new();
        let mut nodes_executed: u32 = 0;

        let mut ready: VecDeque<NodeId> = VecDeque::from([graph.entry_node().to_string()]);
        let (tx, mut rx) = mpsc::unbounded_channel::<Completion<S::Patch>>();
        let mut in_flight = 0usize;

        loop {
            while self.has_capacity(in_flight) {
                let Some(node) = ready.pop_front() else {
                    break;
                };
                let unit = match self.workflow.unit(&node) {
                    Ok(unit) => unit,
                    Err(e) => {
                        // bindings are checked at build time
                        log::error!("No unit bound to '{}': {}", node, e);
                        run.set(&node, NodeStatus::Failed);
                        self.record_failure(event_sink, &run_id, &mut failures, node, e.to_string());
                        continue;
                    }
                };

                run.set(&node, NodeStatus::Running);
                nodes_executed += 1;
                log::debug!("Dispatching node '{}'", node);
                self.emit(
                    event_sink,
                    WorkflowEvent::NodeStarted {
                        node_id: node.clone(),
                        run_id: run_id.clone(),
                    },
                );

                let snapshot = state.clone();
                let handle = tokio::spawn(async move { unit.run(&snapshot).await });
                let tx = tx.clone();
                tokio::spawn(async move {
                    let directive = match handle.await {
                        Ok(directive) => directive,
                        Err(e) if e.is_panic() => RoutingDirective::fail(format!(
                            "unit panicked: {}",
                            panic_message(e.into_panic().as_ref())
                        )),
                        Err(e) => RoutingDirective::fail(format!("unit task failed: {}", e)),
                    };
                    // receiver is gone only if the run was abandoned
                    let _ = tx.send((node, directive));
                });
                in_flight += 1;
            }

            if in_flight == 0 {
                break;
            }
            let Some((node, directive)) = rx.recv().await else {
                break;
            };
            in_flight -= 1;

            let RoutingDirective {
                patch,
                next,
                failed,
            } = directive;

            match failed {
                Some(failure) => {
                    log::warn!("Node '{}' failed: {}", node, failure);
                    run.set(&node, NodeStatus::Failed);
                    self.record_failure(event_sink, &run_id, &mut failures, node, failure.message);
                }
                None => {
                    let fields = S::written_fields(&patch);
                    state.apply(patch);
                    let routing = run.complete(graph, &node, &next);
                    for target in &routing.ignored {
                        log::warn!(
                            "Node '{}' routed to '{}', which is not one of its edges; ignoring",
                            node,
                            target
                        );
                    }
                    log::debug!("Node '{}' done, enabled {:?}", node, routing.fired);
                    self.emit(
                        event_sink,
                        WorkflowEvent::NodeCompleted {
                            node_id: node,
                            run_id: run_id.clone(),
                            fields: fields.into_iter().map(String::from).collect(),
                        },
                    );
                }
            }

            let settled = run.settle(graph);
            for node in settled.skipped {
                log::debug!("Node '{}' can no longer run; skipping", node);
                self.emit_skipped(event_sink, &run_id, node);
            }
            ready.extend(settled.runnable);
        }

        let (statuses, leftovers) = run.finish();
        for node in leftovers {
            log::warn!("Node '{}' was never resolved; skipping", node);
            self.emit_skipped(event_sink, &run_id, node);
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        log::info!(
            "Run '{}' finished in {}ms: {} node(s) executed, {} failure(s)",
            run_id,
            elapsed_ms,
            nodes_executed,
            failures.len()
        );
        self.emit(
            event_sink,
            WorkflowEvent::RunCompleted {
                workflow_id: workflow_id.clone(),
                run_id: run_id.clone(),
                nodes_executed,
                failures: failures.len(),
            },
        );

        RunReport {
            run_id,
            workflow_id,
            state,
            statuses,
            failures,
            nodes_executed,
            elapsed_ms,
        }
    }

    fn has_capacity(&self, in_flight: usize) -> bool {
        self.max_parallel == 0 || in_flight < self.max_parallel
    }

    fn record_failure(
        &self,
        event_sink: &dyn EventSink,
        run_id: &str,
        failures: &mut Vec<NodeFailure>,
        node: NodeId,
        error: String,
    ) {
        self.emit(
            event_sink,
            WorkflowEvent::NodeFailed {
                node_id: node.clone(),
                run_id: run_id.to_string(),
                error: error.clone(),
            },
        );
        failures.push(NodeFailure {
            node_id: node,
            error,
        });
    }

    fn emit_skipped(&self, event_sink: &dyn EventSink, run_id: &str, node: NodeId) {
        self.emit(
            event_sink,
            WorkflowEvent::NodeSkipped {
                node_id: node,
                run_id: run_id.to_string(),
            },
        );
    }

    fn emit(&self, event_sink: &dyn EventSink, event: WorkflowEvent) {
        if let Err(e) = event_sink.send(event) {
            log::warn!("Failed to send workflow event: {}", e);
        }
    }
}

fn new_run_id() -> String {
    format!("run-{}", uuid::Uuid::new_v4())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
