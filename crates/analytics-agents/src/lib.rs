//! Analytics Agents - answering marketing analytics questions on node-engine
//!
//! Four agents cooperate over one [`AnalyticsState`]:
//!
//! - `orchestrator` ([`QueryInterpreter`]): classifies the query and enables
//!   both retrievers
//! - `sqlRetriever` ([`StructuredRetriever`]): plans a SELECT and runs it
//!   against the campaign table
//! - `kbRetriever` ([`SemanticRetriever`]): finds the closest knowledge base
//!   document
//! - `analyzer` ([`Synthesizer`]): writes the answer from whatever arrived
//!
//! [`AnalyticsPipeline`] wires them into a workflow and runs one query at a
//! time. Planning and synthesis each have a deterministic local backend and
//! an Ollama-backed one, chosen in [`PipelineConfig`].

pub mod config;
pub mod constants;
pub mod error;
pub mod interpreter;
pub mod llm;
pub mod pipeline;
pub mod report;
pub mod samples;
pub mod semantic;
pub mod state;
pub mod structured;
pub mod synthesis;

pub use config::{BackendKind, ConfigError, OllamaConfig, PipelineConfig};
pub use error::{AgentError, Result};
pub use interpreter::{classify, QueryInterpreter};
pub use llm::OllamaClient;
pub use pipeline::{AnalyticsPipeline, PipelineOutcome};
pub use report::append_to_report;
pub use samples::{load_samples, parse_samples};
pub use semantic::{KnowledgeBase, ScoredDocument, SemanticRetriever};
pub use state::{AnalyticsPatch, AnalyticsState, KnowledgeDocument, Table, TaskType};
pub use structured::{
    CampaignStore, KeywordSqlPlanner, OllamaSqlPlanner, SqlPlanner, StoreHandle,
    StructuredRetriever, TableSchema,
};
pub use synthesis::{OllamaBackend, SummaryBackend, SummaryInput, Synthesizer, TemplateBackend};
