//! The assembled four-node analytics workflow
//!
//! ```text
//!                 ┌─> sqlRetriever ─┐
//! orchestrator ───┤                 ├──> analyzer
//!                 └─> kbRetriever ──┘
//! ```
//!
//! The orchestrator enables both retrievers through conditional edges; the
//! analyzer joins them with the configured policy.

use std::sync::Arc;
use std::time::Duration;

use node_engine::{EventSink, NodeFailure, RunReport, Scheduler, Workflow, WorkflowBuilder};

use crate::config::{BackendKind, PipelineConfig};
use crate::constants::{defaults, nodes};
use crate::error::Result;
use crate::interpreter::QueryInterpreter;
use crate::llm::OllamaClient;
use crate::semantic::{KnowledgeBase, SemanticRetriever};
use crate::state::AnalyticsState;
use crate::structured::{
    CampaignStore, KeywordSqlPlanner, OllamaSqlPlanner, SqlPlanner, StoreHandle,
    StructuredRetriever,
};
use crate::synthesis::{OllamaBackend, SummaryBackend, Synthesizer, TemplateBackend};

/// Result of answering one query
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Final answer; `None` when the analyzer did not run or failed
    pub analysis: Option<String>,
    /// Per-agent failures in completion order
    pub failures: Vec<NodeFailure>,
    /// Full engine report, including the final record
    pub report: RunReport<AnalyticsState>,
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        self.analysis.is_some()
    }
}

/// Long-lived resources shared by every run
pub struct AnalyticsPipeline {
    config: PipelineConfig,
    store: CampaignStore,
    knowledge: Arc<KnowledgeBase>,
    planner: Arc<dyn SqlPlanner>,
    backend: Arc<dyn SummaryBackend>,
}

impl AnalyticsPipeline {
    /// Assemble a pipeline from explicit parts
    pub fn new(
        config: PipelineConfig,
        knowledge: Arc<KnowledgeBase>,
        planner: Arc<dyn SqlPlanner>,
        backend: Arc<dyn SummaryBackend>,
    ) -> Self {
        let store = CampaignStore::new(&config.campaigns_csv, &config.table_name);
        Self {
            config,
            store,
            knowledge,
            planner,
            backend,
        }
    }

    /// Load the knowledge base and pick backends as configured
    pub async fn from_config(config: PipelineConfig) -> Result<Self> {
        let knowledge = Arc::new(KnowledgeBase::load(&config.knowledge_base).await?);

        let planner: Arc<dyn SqlPlanner> = match config.planner {
            BackendKind::Local => Arc::new(KeywordSqlPlanner::new(config.max_rows)),
            BackendKind::Ollama => Arc::new(OllamaSqlPlanner::new(OllamaClient::from_config(
                &config.ollama,
            ))),
        };
        let backend: Arc<dyn SummaryBackend> = match config.synthesizer {
            BackendKind::Local => Arc::new(TemplateBackend),
            BackendKind::Ollama => Arc::new(OllamaBackend::new(OllamaClient::from_config(
                &config.ollama,
            ))),
        };

        log::info!(
            "Pipeline ready: planner '{}', synthesizer '{}', analyzer join {:?}",
            planner.name(),
            backend.name(),
            config.analyzer_join
        );
        Ok(Self::new(config, knowledge, planner, backend))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Replace the SQL planner
    pub fn with_planner(mut self, planner: Arc<dyn SqlPlanner>) -> Self {
        self.planner = planner;
        self
    }

    /// Replace the summary backend
    pub fn with_backend(mut self, backend: Arc<dyn SummaryBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Bind the four agents to a run-scoped store handle
    pub fn build_workflow(&self, store: StoreHandle) -> Result<Workflow<AnalyticsState>> {
        let workflow = WorkflowBuilder::new(defaults::WORKFLOW_ID)
            .agent(nodes::ORCHESTRATOR, QueryInterpreter::new())
            .agent(
                nodes::SQL_RETRIEVER,
                StructuredRetriever::new(store, Arc::clone(&self.planner))
                    .with_fallback(self.config.sql_fallback),
            )
            .agent(
                nodes::KB_RETRIEVER,
                SemanticRetriever::new(Arc::clone(&self.knowledge)),
            )
            .agent(nodes::ANALYZER, Synthesizer::new(Arc::clone(&self.backend)))
            .entry(nodes::ORCHESTRATOR)
            .route(nodes::ORCHESTRATOR, nodes::SQL_RETRIEVER)
            .route(nodes::ORCHESTRATOR, nodes::KB_RETRIEVER)
            .edge(nodes::SQL_RETRIEVER, nodes::ANALYZER)
            .edge(nodes::KB_RETRIEVER, nodes::ANALYZER)
            .join(nodes::ANALYZER, self.config.analyzer_join)
            .build()?;
        Ok(workflow)
    }

    /// Answer one query
    ///
    /// The campaign store is opened for this run only and released when
    /// the run's workflow is dropped. Agent failures are reported in the
    /// outcome; only setup problems and a timeout are errors.
    pub async fn run(&self, query: &str, event_sink: &dyn EventSink) -> Result<PipelineOutcome> {
        let store = self.store.open().await?;
        let scheduler = Scheduler::new(self.build_workflow(store)?)
            .with_max_parallel(self.config.max_parallel);

        let report = scheduler
            .run_with_timeout(
                AnalyticsState::new(query),
                Duration::from_secs(self.config.timeout_secs),
                event_sink,
            )
            .await?;
        drop(scheduler);

        for failure in &report.failures {
            log::warn!("Agent '{}' failed: {}", failure.node_id, failure.error);
        }

        Ok(PipelineOutcome {
            analysis: report.state.analysis.clone(),
            failures: report.failures.clone(),
            report,
        })
    }
}
