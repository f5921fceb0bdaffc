//! Query interpreter: the entry node
//!
//! Classifies the query and fans out to both retrievers.

use async_trait::async_trait;
use node_engine::{AgentUnit, RoutingDirective};

use crate::constants::nodes;
use crate::state::{AnalyticsPatch, AnalyticsState, TaskType};

const PERFORMANCE_TERMS: &[&str] = &[
    "roi",
    "ctr",
    "conversion",
    "spend",
    "revenue",
    "click",
    "impression",
    "performance",
    "performing",
    "cost",
    "budget",
    "quarter",
    "tactic",
    "campaign",
];

const REFERENCE_TERMS: &[&str] = &[
    "what is",
    "define",
    "definition",
    "guideline",
    "policy",
    "explain",
    "how to",
    "how do",
    "best practice",
    "recommend",
];

/// Classify a query by keyword counts
pub fn classify(query: &str) -> TaskType {
    let query = query.to_lowercase();
    let hits = |terms: &[&str]| terms.iter().filter(|t| query.contains(*t)).count();

    let performance = hits(PERFORMANCE_TERMS);
    let reference = hits(REFERENCE_TERMS);
    match performance.cmp(&reference) {
        std::cmp::Ordering::Greater => TaskType::Performance,
        std::cmp::Ordering::Less => TaskType::Reference,
        std::cmp::Ordering::Equal => TaskType::General,
    }
}

/// Entry agent
#[derive(Debug, Default, Clone)]
pub struct QueryInterpreter;

impl QueryInterpreter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentUnit<AnalyticsState> for QueryInterpreter {
    async fn run(&self, state: &AnalyticsState) -> RoutingDirective<AnalyticsPatch> {
        let query = state.query.as_deref().map(str::trim).unwrap_or_default();
        if query.is_empty() {
            return RoutingDirective::fail("query is empty");
        }

        let task_type = classify(query);
        log::info!("Query classified as {}", task_type);

        RoutingDirective::goto(
            AnalyticsPatch {
                task_type: Some(task_type),
                ..AnalyticsPatch::default()
            },
            [nodes::SQL_RETRIEVER, nodes::KB_RETRIEVER],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_engine::Next;

    #[test]
    fn test_classify() {
        assert_eq!(
            classify("Which tactic had the best ROI in 2025Q1?"),
            TaskType::Performance
        );
        assert_eq!(
            classify("What is the guideline for email frequency?"),
            TaskType::Reference
        );
        assert_eq!(classify("hello"), TaskType::General);
    }

    #[tokio::test]
    async fn test_routes_to_both_retrievers() {
        let directive = QueryInterpreter::new()
            .run(&AnalyticsState::new("campaign spend by quarter"))
            .await;

        assert!(!directive.is_failed());
        assert_eq!(directive.patch.task_type, Some(TaskType::Performance));
        assert_eq!(
            directive.next,
            Next::targets([nodes::SQL_RETRIEVER, nodes::KB_RETRIEVER])
        );
    }

    #[tokio::test]
    async fn test_empty_query_fails() {
        for state in [AnalyticsState::new("   "), AnalyticsState::default()] {
            let directive = QueryInterpreter::new().run(&state).await;
            assert!(directive.is_failed());
            assert_eq!(directive.next, Next::NoFurtherNodes);
        }
    }
}
