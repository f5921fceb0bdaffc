//! Natural-language to SQL planning

use async_trait::async_trait;

use super::store::{quote_ident, quote_literal, TableSchema};
use crate::constants::defaults;
use crate::error::{AgentError, Result};
use crate::llm::OllamaClient;

/// Turns a query into a single SELECT statement
#[async_trait]
pub trait SqlPlanner: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Produce SQL for `query`; the caller sanitizes the result
    async fn plan(&self, query: &str, schema: &TableSchema) -> Result<String>;
}

/// Filters on categorical values mentioned in the query
///
/// "email campaigns in Oncology" becomes
/// `WHERE "tactic" IN ('Email') AND "brand_area" IN ('Oncology')`.
#[derive(Debug, Clone)]
pub struct KeywordSqlPlanner {
    max_rows: usize,
}

impl KeywordSqlPlanner {
    pub fn new(max_rows: usize) -> Self {
        Self { max_rows }
    }
}

impl Default for KeywordSqlPlanner {
    fn default() -> Self {
        Self::new(defaults::MAX_ROWS)
    }
}

#[async_trait]
impl SqlPlanner for KeywordSqlPlanner {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn plan(&self, query: &str, schema: &TableSchema) -> Result<String> {
        let query = query.to_lowercase();
        let mut filters = Vec::new();

        for (column, values) in &schema.categories {
            let mentioned: Vec<String> = values
                .iter()
                .filter(|v| v.chars().count() > 1 && query.contains(&v.to_lowercase()))
                .map(|v| quote_literal(v))
                .collect();
            if !mentioned.is_empty() {
                filters.push(format!("{} IN ({})", quote_ident(column), mentioned.join(", ")));
            }
        }

        let mut sql = format!("SELECT * FROM {}", quote_ident(&schema.table));
        if !filters.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&filters.join(" AND "));
        }
        sql.push_str(&format!(" LIMIT {}", self.max_rows));
        Ok(sql)
    }
}

/// Asks a local LLM for a raw-data SELECT
#[derive(Debug, Clone)]
pub struct OllamaSqlPlanner {
    client: OllamaClient,
}

impl OllamaSqlPlanner {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SqlPlanner for OllamaSqlPlanner {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn plan(&self, query: &str, schema: &TableSchema) -> Result<String> {
        self.client.generate(&sql_prompt(query, schema)).await
    }
}

fn sql_prompt(query: &str, schema: &TableSchema) -> String {
    let mut sample = schema.columns.join(",");
    for row in &schema.sample.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        sample.push('\n');
        sample.push_str(&cells.join(","));
    }

    format!(
        "You are an expert SQL generator. Determine what information the assignment needs \
and write a SQL query that extracts it.

CRITICAL RULES:
- Write ONLY a SELECT query that retrieves raw data from the table
- Do NOT use aggregate functions (COUNT, SUM, AVG, MIN, MAX, ...)
- Do NOT use arithmetic or expressions in any clause
- ONLY use simple column selections and basic filtering (WHERE with =, IN, LIKE)

Return ONLY the SQL query. No commentary.

Assignment: {query}

The table name is \"{table}\" and its data has this shape:
{sample}
",
        query = query,
        table = schema.table,
        sample = sample,
    )
}

/// Statement used when the planned one fails to execute
pub fn fallback_sql(table: &str) -> String {
    format!("SELECT * FROM {} LIMIT {}", quote_ident(table), defaults::FALLBACK_ROWS)
}

/// Reduce planner output to a single SELECT statement
///
/// Strips code fences, surrounding quotes, leading prose and a trailing
/// semicolon. Anything that is not exactly one SELECT is rejected.
pub fn sanitize_sql(raw: &str) -> Result<String> {
    let mut sql = raw.trim();

    if let Some(rest) = sql.strip_prefix("```") {
        sql = match rest.get(..3) {
            Some(lang) if lang.eq_ignore_ascii_case("sql") => &rest[3..],
            _ => rest,
        };
    }
    sql = sql.trim().trim_end_matches("```").trim();

    for quote in ['"', '\''] {
        if sql.len() >= 2 && sql.starts_with(quote) && sql.ends_with(quote) {
            sql = sql[1..sql.len() - 1].trim();
        }
    }

    let start = sql
        .to_ascii_lowercase()
        .find("select")
        .ok_or_else(|| AgentError::InvalidSql(format!("no SELECT statement in '{}'", raw.trim())))?;
    if start > 0 {
        log::debug!("Dropping text before SELECT: '{}'", sql[..start].trim());
    }
    sql = sql[start..].trim_end().trim_end_matches(';').trim_end();

    if sql.contains(';') {
        return Err(AgentError::InvalidSql(format!(
            "multiple statements are not allowed: '{}'",
            sql
        )));
    }

    Ok(sql.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn schema() -> TableSchema {
        let mut categories = BTreeMap::new();
        categories.insert(
            "brand_area".to_string(),
            vec!["Cardiology".to_string(), "Oncology".to_string()],
        );
        categories.insert(
            "tactic".to_string(),
            vec!["Display".to_string(), "Email".to_string()],
        );
        TableSchema {
            table: "campaign_performance".to_string(),
            columns: vec!["brand_area".to_string(), "tactic".to_string()],
            categories,
            sample: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_keyword_planner_filters_mentioned_values() {
        let sql = KeywordSqlPlanner::new(50)
            .plan("How did email do in oncology?", &schema())
            .await
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM \"campaign_performance\" WHERE \"brand_area\" IN ('Oncology') AND \"tactic\" IN ('Email') LIMIT 50"
        );
    }

    #[tokio::test]
    async fn test_keyword_planner_without_matches() {
        let sql = KeywordSqlPlanner::new(10)
            .plan("anything interesting?", &schema())
            .await
            .unwrap();
        assert_eq!(sql, "SELECT * FROM \"campaign_performance\" LIMIT 10");
    }

    #[test]
    fn test_sanitize_strips_fences_and_quotes() {
        assert_eq!(
            sanitize_sql("```sql\nSELECT * FROM t;\n```").unwrap(),
            "SELECT * FROM t"
        );
        assert_eq!(sanitize_sql("\"select a from t\"").unwrap(), "select a from t");
        assert_eq!(
            sanitize_sql("Here is the query: SELECT a FROM t").unwrap(),
            "SELECT a FROM t"
        );
    }

    #[test]
    fn test_sanitize_rejects_non_select() {
        assert!(matches!(
            sanitize_sql("DELETE FROM t"),
            Err(AgentError::InvalidSql(_))
        ));
        assert!(matches!(
            sanitize_sql("SELECT 1; DROP TABLE t"),
            Err(AgentError::InvalidSql(_))
        ));
        assert!(sanitize_sql("   ").is_err());
    }

    #[test]
    fn test_fallback_sql() {
        assert_eq!(fallback_sql("campaign_performance"), "SELECT * FROM \"campaign_performance\" LIMIT 10");
    }

    #[test]
    fn test_prompt_mentions_table_and_sample() {
        let mut schema = schema();
        schema.sample.rows.push(vec![
            serde_json::json!("Cardiology"),
            serde_json::json!("Email"),
        ]);
        let prompt = sql_prompt("top tactics", &schema);
        assert!(prompt.contains("Assignment: top tactics"));
        assert!(prompt.contains("\"campaign_performance\""));
        assert!(prompt.contains("brand_area,tactic\nCardiology,Email"));
    }
}
