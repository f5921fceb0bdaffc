//! Summary backends for the analyzer

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::OllamaClient;
use crate::state::{AnalyticsState, KnowledgeDocument, Table, TaskType};

const PREVIEW_ROWS: usize = 5;
const EXCERPT_CHARS: usize = 280;

/// Everything the analyzer may draw on; retriever outputs can be absent
#[derive(Debug, Clone, Copy)]
pub struct SummaryInput<'a> {
    pub query: &'a str,
    pub task_type: Option<TaskType>,
    pub sql: Option<&'a str>,
    pub records: Option<&'a Table>,
    pub best_score: Option<f64>,
    pub document: Option<&'a KnowledgeDocument>,
}

impl<'a> SummaryInput<'a> {
    pub fn from_state(query: &'a str, state: &'a AnalyticsState) -> Self {
        Self {
            query,
            task_type: state.task_type,
            sql: state.sql.as_deref(),
            records: state.records.as_ref(),
            best_score: state.best_score,
            document: state.document.as_ref(),
        }
    }
}

/// Produces the final answer text
#[async_trait]
pub trait SummaryBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    async fn summarize(&self, input: &SummaryInput<'_>) -> Result<String>;
}

/// Deterministic markdown summary, no model involved
#[derive(Debug, Default, Clone)]
pub struct TemplateBackend;

#[async_trait]
impl SummaryBackend for TemplateBackend {
    fn name(&self) -> &'static str {
        "template"
    }

    async fn summarize(&self, input: &SummaryInput<'_>) -> Result<String> {
        Ok(render_template(input))
    }
}

fn render_template(input: &SummaryInput<'_>) -> String {
    let mut out = String::new();
    out.push_str("## Analysis\n\n");
    out.push_str(&format!("**Query:** {}\n", input.query));
    if let Some(task_type) = input.task_type {
        out.push_str(&format!("**Task type:** {}\n", task_type));
    }

    out.push_str("\n### Data\n\n");
    match input.records {
        Some(table) if !table.is_empty() => {
            out.push_str(&format!("{} record(s) retrieved", table.len()));
            if let Some(sql) = input.sql {
                out.push_str(&format!(" with `{}`", sql));
            }
            out.push_str(".\n\n");
            out.push_str(&markdown_table(table, PREVIEW_ROWS));
            if table.len() > PREVIEW_ROWS {
                out.push_str(&format!("\n_{} more row(s) omitted._\n", table.len() - PREVIEW_ROWS));
            }
        }
        Some(_) => out.push_str("The query matched no records.\n"),
        None => out.push_str("No tabular data was available.\n"),
    }

    out.push_str("\n### Reference\n\n");
    match input.document {
        Some(document) => {
            let label = if document.title.is_empty() {
                document.doc_id.as_str()
            } else {
                document.title.as_str()
            };
            out.push_str(&format!(
                "Most relevant document: **{}** (`{}`, score {:.3})\n\n> {}\n",
                label,
                document.doc_id,
                input.best_score.unwrap_or_default(),
                excerpt(&document.text, EXCERPT_CHARS)
            ));
        }
        None => out.push_str("No reference document was available.\n"),
    }

    out
}

fn markdown_table(table: &Table, limit: usize) -> String {
    let mut out = format!("| {} |\n", table.columns.join(" | "));
    out.push_str(&format!(
        "|{}\n",
        table.columns.iter().map(|_| "---|").collect::<String>()
    ));
    for row in table.rows.iter().take(limit) {
        let cells: Vec<String> = row
            .iter()
            .map(|value| match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out
}

fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

/// Summary written by a local LLM
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: OllamaClient,
}

impl OllamaBackend {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SummaryBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn summarize(&self, input: &SummaryInput<'_>) -> Result<String> {
        let answer = self.client.generate(&analysis_prompt(input)?).await?;
        Ok(answer.trim().to_string())
    }
}

fn analysis_prompt(input: &SummaryInput<'_>) -> Result<String> {
    let data = match input.records {
        Some(table) => serde_json::to_string(&table.to_records())?,
        None => "[]".to_string(),
    };
    let document = match input.document {
        Some(document) => serde_json::to_string(document)?,
        None => "none".to_string(),
    };

    Ok(format!(
        "For each assignment you receive, follow these steps carefully:

1. Analyze the provided data.
2. Summarize your findings clearly: key insights, commentary and data-driven \
recommendations. Highlight patterns, anomalies and trends in performance.
3. Be concise but insightful. Use natural language and, when helpful, simple \
tables or bullet points. Always explain your reasoning briefly.

If no data is given, you may make assumptions ONLY if you state your line of reasoning.

For context, this is the query: {query}

This is the data you were given as JSON: {data}

The most relevant document found had a score of {score}: {document}
",
        query = input.query,
        data = data,
        score = input
            .best_score
            .map(|s| format!("{:.4}", s))
            .unwrap_or_else(|| "n/a".to_string()),
        document = document,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn table(rows: usize) -> Table {
        Table {
            columns: vec!["tactic".to_string(), "spend".to_string()],
            rows: (0..rows).map(|i| vec![json!("Email"), json!(i)]).collect(),
        }
    }

    fn document() -> KnowledgeDocument {
        KnowledgeDocument {
            doc_id: "kb-1".to_string(),
            title: "Email cadence".to_string(),
            text: "Weekly works best.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_template_with_everything() {
        let records = table(7);
        let document = document();
        let input = SummaryInput {
            query: "email spend",
            task_type: Some(TaskType::Performance),
            sql: Some("SELECT * FROM t"),
            records: Some(&records),
            best_score: Some(0.5),
            document: Some(&document),
        };

        let text = TemplateBackend.summarize(&input).await.unwrap();
        assert!(text.contains("**Query:** email spend"));
        assert!(text.contains("7 record(s) retrieved with `SELECT * FROM t`."));
        assert!(text.contains("| tactic | spend |\n|---|---|\n| Email | 0 |"));
        assert!(text.contains("_2 more row(s) omitted._"));
        assert!(text.contains("**Email cadence** (`kb-1`, score 0.500)"));
    }

    #[tokio::test]
    async fn test_template_tolerates_absent_inputs() {
        let input = SummaryInput {
            query: "q",
            task_type: None,
            sql: None,
            records: None,
            best_score: None,
            document: None,
        };

        let text = TemplateBackend.summarize(&input).await.unwrap();
        assert!(text.contains("No tabular data was available."));
        assert!(text.contains("No reference document was available."));
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("abcdef ghij", 7), "abcdef...");
    }

    #[test]
    fn test_analysis_prompt_embeds_inputs() {
        let records = table(1);
        let input = SummaryInput {
            query: "email spend",
            task_type: None,
            sql: None,
            records: Some(&records),
            best_score: Some(0.25),
            document: None,
        };
        let prompt = analysis_prompt(&input).unwrap();
        assert!(prompt.contains("this is the query: email spend"));
        assert!(prompt.contains(r#""tactic":"Email""#));
        assert!(prompt.contains(r#""spend":0"#));
        assert!(prompt.contains("score of 0.2500: none"));
    }

    #[tokio::test]
    async fn test_ollama_backend_trims_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3.1",
                "response": "\n  Email outperformed display.  \n"
            })))
            .mount(&server)
            .await;

        let backend = OllamaBackend::new(OllamaClient::new(server.uri(), "llama3.1"));
        let input = SummaryInput {
            query: "email vs display",
            task_type: None,
            sql: None,
            records: None,
            best_score: None,
            document: None,
        };
        assert_eq!(
            backend.summarize(&input).await.unwrap(),
            "Email outperformed display."
        );
    }
}
