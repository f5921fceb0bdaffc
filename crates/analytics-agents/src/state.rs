//! The analytics state record and its patches

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use node_engine::WorkflowState;

/// Coarse classification of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Asks about campaign numbers
    Performance,
    /// Asks about guidance or definitions
    Reference,
    General,
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TaskType::Performance => "performance",
            TaskType::Reference => "reference",
            TaskType::General => "general",
        };
        f.write_str(label)
    }
}

/// Rows returned by the structured retriever
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of a column in a row
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(index)
    }

    /// Rows as JSON objects keyed by column name
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

/// A knowledge base entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub doc_id: String,
    #[serde(default)]
    pub title: String,
    pub text: String,
}

/// Shared record threaded through the analytics graph
///
/// Every field is optional: absent means "not produced yet".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsState {
    /// Raw user query
    pub query: Option<String>,
    /// Set by the orchestrator
    pub task_type: Option<TaskType>,
    /// Statement the SQL retriever actually executed
    pub sql: Option<String>,
    /// Set by the SQL retriever
    pub records: Option<Table>,
    /// Similarity of `document` to the query
    pub best_score: Option<f64>,
    /// Set by the knowledge base retriever
    pub document: Option<KnowledgeDocument>,
    /// Final answer, set by the analyzer
    pub analysis: Option<String>,
}

impl AnalyticsState {
    /// Initial record for a query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }
}

/// Fields changed by one analytics agent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsPatch {
    pub query: Option<String>,
    pub task_type: Option<TaskType>,
    pub sql: Option<String>,
    pub records: Option<Table>,
    pub best_score: Option<f64>,
    pub document: Option<KnowledgeDocument>,
    pub analysis: Option<String>,
}

impl WorkflowState for AnalyticsState {
    type Patch = AnalyticsPatch;

    fn apply(&mut self, patch: AnalyticsPatch) {
        let AnalyticsPatch {
            query,
            task_type,
            sql,
            records,
            best_score,
            document,
            analysis,
        } = patch;

        if query.is_some() {
            self.query = query;
        }
        if task_type.is_some() {
            self.task_type = task_type;
        }
        if sql.is_some() {
            self.sql = sql;
        }
        if records.is_some() {
            self.records = records;
        }
        if best_score.is_some() {
            self.best_score = best_score;
        }
        if document.is_some() {
            self.document = document;
        }
        if analysis.is_some() {
            self.analysis = analysis;
        }
    }

    fn written_fields(patch: &AnalyticsPatch) -> Vec<&'static str> {
        [
            ("query", patch.query.is_some()),
            ("task_type", patch.task_type.is_some()),
            ("sql", patch.sql.is_some()),
            ("records", patch.records.is_some()),
            ("best_score", patch.best_score.is_some()),
            ("document", patch.document.is_some()),
            ("analysis", patch.analysis.is_some()),
        ]
        .into_iter()
        .filter(|(_, written)| *written)
        .map(|(name, _)| name)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_apply_keeps_untouched_fields() {
        let mut state = AnalyticsState::new("top tactics");
        state.apply(AnalyticsPatch {
            task_type: Some(TaskType::Performance),
            ..AnalyticsPatch::default()
        });
        state.apply(AnalyticsPatch {
            best_score: Some(0.5),
            ..AnalyticsPatch::default()
        });

        assert_eq!(state.query.as_deref(), Some("top tactics"));
        assert_eq!(state.task_type, Some(TaskType::Performance));
        assert_eq!(state.best_score, Some(0.5));
        assert!(state.analysis.is_none());
    }

    #[test]
    fn test_written_fields() {
        let patch = AnalyticsPatch {
            sql: Some("SELECT 1".to_string()),
            records: Some(Table::default()),
            ..AnalyticsPatch::default()
        };
        assert_eq!(AnalyticsState::written_fields(&patch), vec!["sql", "records"]);
        assert!(AnalyticsState::written_fields(&AnalyticsPatch::default()).is_empty());
    }

    #[test]
    fn test_table_records() {
        let table = Table {
            columns: vec!["tactic".to_string(), "spend".to_string()],
            rows: vec![vec![json!("Email"), json!(21921)]],
        };
        assert_eq!(table.get(0, "spend"), Some(&json!(21921)));
        assert_eq!(table.get(0, "missing"), None);
        assert_eq!(
            Value::Object(table.to_records()[0].clone()),
            json!({"tactic": "Email", "spend": 21921})
        );
    }
}
