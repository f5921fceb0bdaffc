//! Error types for the node engine

use thiserror::Error;

use crate::validation::ValidationError;

/// Result type alias using NodeEngineError
pub type Result<T> = std::result::Result<T, NodeEngineError>;

/// Errors that can occur in the node engine
///
/// Unit-level failures are not errors at this level: they are recorded on
/// the run report. Only construction problems and caller-level timeouts
/// surface here.
#[derive(Debug, Error)]
pub enum NodeEngineError {
    /// The graph or workflow definition is malformed
    #[error("Invalid workflow configuration: {}", format_validation(.0))]
    Configuration(Vec<ValidationError>),

    /// A node name was not found in the graph
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// The whole run exceeded its caller-imposed deadline
    #[error("Run '{run_id}' timed out after {timeout_ms}ms")]
    Timeout { run_id: String, timeout_ms: u64 },
}

impl NodeEngineError {
    /// Create a configuration error from a single validation failure
    pub fn configuration(error: ValidationError) -> Self {
        Self::Configuration(vec![error])
    }

    /// Validation errors carried by a configuration error, if any
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            Self::Configuration(errors) => errors,
            _ => &[],
        }
    }
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_message_lists_all_errors() {
        let err = NodeEngineError::Configuration(vec![
            ValidationError::CycleDetected {
                nodes: vec!["a".to_string(), "b".to_string()],
            },
            ValidationError::MissingEntryNode,
        ]);

        let message = err.to_string();
        assert!(message.contains("Cycle detected"));
        assert!(message.contains("no entry node"));
        assert_eq!(err.validation_errors().len(), 2);
    }

    #[test]
    fn test_timeout_has_no_validation_errors() {
        let err = NodeEngineError::Timeout {
            run_id: "run-1".to_string(),
            timeout_ms: 50,
        };
        assert!(err.validation_errors().is_empty());
        assert_eq!(err.to_string(), "Run 'run-1' timed out after 50ms");
    }
}
