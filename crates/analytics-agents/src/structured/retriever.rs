//! Structured retriever agent (`sqlRetriever`)

use std::sync::Arc;

use async_trait::async_trait;
use node_engine::{AgentUnit, RoutingDirective};

use super::planner::{fallback_sql, sanitize_sql, SqlPlanner};
use super::store::StoreHandle;
use crate::error::{AgentError, Result};
use crate::state::{AnalyticsPatch, AnalyticsState, Table};

/// Plans SQL for the query and runs it against the campaign table
pub struct StructuredRetriever {
    store: StoreHandle,
    planner: Arc<dyn SqlPlanner>,
    fallback: bool,
}

impl StructuredRetriever {
    pub fn new(store: StoreHandle, planner: Arc<dyn SqlPlanner>) -> Self {
        Self {
            store,
            planner,
            fallback: false,
        }
    }

    /// Retry once with a plain `LIMIT` query when the planned one fails
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    async fn retrieve(&self, query: &str) -> Result<(String, Table)> {
        let schema = self.store.schema().await?;
        let raw = self.planner.plan(query, &schema).await?;

        let attempt = match sanitize_sql(&raw) {
            Ok(sql) => {
                log::info!("Planned SQL ({}): {}", self.planner.name(), sql);
                self.store.query(&sql).await.map(|table| (sql, table))
            }
            Err(e) => Err(e),
        };

        match attempt {
            Ok(result) => Ok(result),
            Err(e @ (AgentError::Database(_) | AgentError::InvalidSql(_))) if self.fallback => {
                let sql = fallback_sql(self.store.table());
                log::warn!("Planned SQL failed ({}); retrying with '{}'", e, sql);
                let table = self.store.query(&sql).await?;
                Ok((sql, table))
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl AgentUnit<AnalyticsState> for StructuredRetriever {
    async fn run(&self, state: &AnalyticsState) -> RoutingDirective<AnalyticsPatch> {
        let Some(query) = state.query.as_deref() else {
            return RoutingDirective::fail(AgentError::MissingInput("query").to_string());
        };

        match self.retrieve(query).await {
            Ok((sql, records)) => {
                log::info!("Retrieved {} row(s)", records.len());
                RoutingDirective::proceed(AnalyticsPatch {
                    sql: Some(sql),
                    records: Some(records),
                    ..AnalyticsPatch::default()
                })
            }
            Err(e) => {
                log::warn!("SQL retrieval failed: {}", e);
                RoutingDirective::fail(e.to_string())
            }
        }
    }
}
