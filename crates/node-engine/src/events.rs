//! Event types for streaming run progress
//!
//! Events are sent from the scheduler to any consumer (console, test
//! harness, log) to report node transitions as they happen.

use serde::{Deserialize, Serialize};

/// Trait for sending workflow events
///
/// This abstracts over the transport mechanism (channel, log, vector)
/// allowing the engine to be used in different contexts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be sent (e.g., channel closed)
    fn send(&self, event: WorkflowEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

/// Events emitted during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkflowEvent {
    /// Run started at the entry node
    #[serde(rename_all = "camelCase")]
    RunStarted { workflow_id: String, run_id: String },

    /// A node was dispatched
    #[serde(rename_all = "camelCase")]
    NodeStarted { node_id: String, run_id: String },

    /// A node completed and its patch was applied
    #[serde(rename_all = "camelCase")]
    NodeCompleted {
        node_id: String,
        run_id: String,
        fields: Vec<String>,
    },

    /// A node reported a failure
    #[serde(rename_all = "camelCase")]
    NodeFailed {
        node_id: String,
        run_id: String,
        error: String,
    },

    /// A node can never run in this run
    #[serde(rename_all = "camelCase")]
    NodeSkipped { node_id: String, run_id: String },

    /// No node is runnable or running any more
    #[serde(rename_all = "camelCase")]
    RunCompleted {
        workflow_id: String,
        run_id: String,
        nodes_executed: u32,
        failures: usize,
    },
}

impl WorkflowEvent {
    /// Node the event refers to, if any
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Self::NodeStarted { node_id, .. }
            | Self::NodeCompleted { node_id, .. }
            | Self::NodeFailed { node_id, .. }
            | Self::NodeSkipped { node_id, .. } => Some(node_id),
            Self::RunStarted { .. } | Self::RunCompleted { .. } => None,
        }
    }
}

/// A no-op event sink that discards all events
///
/// Useful for testing or when events aren't needed.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: WorkflowEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted in order.
pub struct VecEventSink {
    events: std::sync::Mutex<Vec<WorkflowEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: WorkflowEvent) -> Result<(), EventError> {
        self.events
            .lock()
            .map_err(|_| EventError {
                message: "Event buffer poisoned".to_string(),
            })?
            .push(event);
        Ok(())
    }
}

/// An event sink that writes every event to the `log` facade
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn send(&self, event: WorkflowEvent) -> Result<(), EventError> {
        match &event {
            WorkflowEvent::NodeFailed {
                node_id, error, ..
            } => log::warn!("node '{}' failed: {}", node_id, error),
            WorkflowEvent::NodeCompleted {
                node_id, fields, ..
            } => log::info!("node '{}' done, wrote [{}]", node_id, fields.join(", ")),
            WorkflowEvent::NodeSkipped { node_id, .. } => {
                log::info!("node '{}' skipped", node_id)
            }
            other => log::debug!("{:?}", other),
        }
        Ok(())
    }
}
