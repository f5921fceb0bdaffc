//! Semantic retriever agent (`kbRetriever`)

use std::sync::Arc;

use async_trait::async_trait;
use node_engine::{AgentUnit, RoutingDirective};

use super::knowledge::KnowledgeBase;
use crate::error::AgentError;
use crate::state::{AnalyticsPatch, AnalyticsState};

/// Looks up the knowledge base document closest to the query
pub struct SemanticRetriever {
    knowledge: Arc<KnowledgeBase>,
}

impl SemanticRetriever {
    pub fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        Self { knowledge }
    }
}

#[async_trait]
impl AgentUnit<AnalyticsState> for SemanticRetriever {
    async fn run(&self, state: &AnalyticsState) -> RoutingDirective<AnalyticsPatch> {
        let Some(query) = state.query.as_deref() else {
            return RoutingDirective::fail(AgentError::MissingInput("query").to_string());
        };

        let Some(best) = self.knowledge.best_match(query) else {
            return RoutingDirective::fail("knowledge base has no documents");
        };

        log::info!(
            "Best knowledge base match '{}' with score {:.4}",
            best.document.doc_id,
            best.score
        );

        RoutingDirective::proceed(AnalyticsPatch {
            best_score: Some(best.score),
            document: Some(best.document),
            ..AnalyticsPatch::default()
        })
    }
}
