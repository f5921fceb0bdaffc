//! Synthesizer agent (`analyzer`)

use std::sync::Arc;

use async_trait::async_trait;
use node_engine::{AgentUnit, RoutingDirective};

use super::backend::{SummaryBackend, SummaryInput};
use crate::error::AgentError;
use crate::state::{AnalyticsPatch, AnalyticsState};

/// Turns the merged retriever outputs into the final answer
///
/// Runs with whatever the retrievers produced; missing records or a
/// missing document are reported in the answer rather than as a failure.
pub struct Synthesizer {
    backend: Arc<dyn SummaryBackend>,
}

impl Synthesizer {
    pub fn new(backend: Arc<dyn SummaryBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl AgentUnit<AnalyticsState> for Synthesizer {
    async fn run(&self, state: &AnalyticsState) -> RoutingDirective<AnalyticsPatch> {
        let Some(query) = state.query.as_deref() else {
            return RoutingDirective::fail(AgentError::MissingInput("query").to_string());
        };

        let input = SummaryInput::from_state(query, state);
        log::info!(
            "Synthesizing with '{}' from {} record(s), document: {}",
            self.backend.name(),
            input.records.map(|t| t.len()).unwrap_or(0),
            input.document.map(|d| d.doc_id.as_str()).unwrap_or("none")
        );

        match self.backend.summarize(&input).await {
            Ok(analysis) => RoutingDirective::finish(AnalyticsPatch {
                analysis: Some(analysis),
                ..AnalyticsPatch::default()
            }),
            Err(e) => {
                log::warn!("Synthesis failed: {}", e);
                RoutingDirective::fail(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::synthesis::backend::TemplateBackend;

    struct Unavailable;

    #[async_trait]
    impl SummaryBackend for Unavailable {
        fn name(&self) -> &'static str {
            "unavailable"
        }

        async fn summarize(&self, _input: &SummaryInput<'_>) -> Result<String> {
            Err(AgentError::Llm("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_writes_analysis() {
        let directive = Synthesizer::new(Arc::new(TemplateBackend))
            .run(&AnalyticsState::new("email spend"))
            .await;

        assert!(!directive.is_failed());
        assert!(directive
            .patch
            .analysis
            .unwrap()
            .contains("**Query:** email spend"));
    }

    #[tokio::test]
    async fn test_backend_error_is_failure() {
        let directive = Synthesizer::new(Arc::new(Unavailable))
            .run(&AnalyticsState::new("q"))
            .await;

        assert_eq!(
            directive.failed.map(|f| f.message),
            Some("LLM error: connection refused".to_string())
        );
        assert!(directive.patch.analysis.is_none());
    }
}
