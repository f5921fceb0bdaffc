//! Structured-data retrieval: campaign store, SQL planning and the
//! `sqlRetriever` agent

pub mod planner;
pub mod retriever;
pub mod store;

pub use planner::{fallback_sql, sanitize_sql, KeywordSqlPlanner, OllamaSqlPlanner, SqlPlanner};
pub use retriever::StructuredRetriever;
pub use store::{CampaignStore, StoreHandle, TableSchema};
