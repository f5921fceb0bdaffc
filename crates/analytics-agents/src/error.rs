//! Error types for the analytics agents

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for analytics operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors raised while preparing resources or inside an agent body
///
/// Agent bodies never return these to the scheduler; they are turned into
/// a failed directive at the unit boundary.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Rejected SQL: {0}")]
    InvalidSql(String),

    #[error("Knowledge base is empty: {0}")]
    EmptyKnowledgeBase(String),

    #[error("Missing input: {0}")]
    MissingInput(&'static str),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] node_engine::NodeEngineError),
}

impl From<tokio::task::JoinError> for AgentError {
    fn from(e: tokio::task::JoinError) -> Self {
        AgentError::Task(e.to_string())
    }
}
