//! Campaign data store
//!
//! The campaign CSV is read through SQLite's `csv` virtual table and copied
//! into a regular in-memory table with `NUMERIC` columns, so numeric text
//! compares as numbers in generated queries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::Value;

use crate::constants::defaults;
use crate::error::{AgentError, Result};
use crate::state::Table;

/// Column names plus the distinct values of every text column
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<String>,
    /// Distinct values of text columns, capped per column
    pub categories: BTreeMap<String, Vec<String>>,
    /// First rows, for prompting
    pub sample: Table,
}

/// Where the campaign data lives
#[derive(Debug, Clone)]
pub struct CampaignStore {
    csv_path: PathBuf,
    table: String,
}

impl CampaignStore {
    pub fn new(csv_path: impl Into<PathBuf>, table: impl Into<String>) -> Self {
        Self {
            csv_path: csv_path.into(),
            table: table.into(),
        }
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    /// Load the CSV into a fresh in-memory database
    ///
    /// Runs on a blocking thread. The returned handle owns the connection;
    /// dropping the last clone releases it.
    pub async fn open(&self) -> Result<StoreHandle> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.open_blocking()).await?
    }

    fn open_blocking(&self) -> Result<StoreHandle> {
        if !self.csv_path.exists() {
            return Err(AgentError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("CSV file not found: {}", self.csv_path.display()),
            )));
        }

        let conn = Connection::open_in_memory()?;
        rusqlite::vtab::csvtab::load_module(&conn)?;

        let filename = self.csv_path.to_string_lossy().replace('\'', "''");
        conn.execute_batch(&format!(
            "CREATE VIRTUAL TABLE temp.csv_source USING csv(filename='{}', header=yes)",
            filename
        ))?;

        let stmt = conn.prepare("SELECT * FROM temp.csv_source")?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        drop(stmt);
        let column_defs = columns
            .iter()
            .map(|c| format!("{} NUMERIC", quote_ident(c)))
            .collect::<Vec<_>>()
            .join(", ");

        conn.execute_batch(&format!(
            "CREATE TABLE {table} ({column_defs});
             INSERT INTO {table} SELECT * FROM temp.csv_source;
             DROP TABLE temp.csv_source;",
            table = quote_ident(&self.table),
        ))?;

        let rows: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(&self.table)),
            [],
            |row| row.get(0),
        )?;
        log::info!(
            "Loaded {} rows from {:?} into '{}'",
            rows,
            self.csv_path,
            self.table
        );

        Ok(StoreHandle {
            conn: Arc::new(Mutex::new(conn)),
            table: self.table.clone(),
        })
    }
}

/// Run-scoped access to the loaded campaign table
///
/// Clones share one connection; statements are serialized by a mutex and
/// run on blocking threads.
#[derive(Clone)]
pub struct StoreHandle {
    conn: Arc<Mutex<Connection>>,
    table: String,
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl StoreHandle {
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Run a read-only statement and collect every row
    pub async fn query(&self, sql: &str) -> Result<Table> {
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| AgentError::Task(format!("store lock poisoned: {}", e)))?;
            query_blocking(&conn, &sql)
        })
        .await?
    }

    /// Describe the table for SQL planners
    pub async fn schema(&self) -> Result<TableSchema> {
        let conn = Arc::clone(&self.conn);
        let table = self.table.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| AgentError::Task(format!("store lock poisoned: {}", e)))?;
            schema_blocking(&conn, &table)
        })
        .await?
    }
}

fn query_blocking(conn: &Connection, sql: &str) -> Result<Table> {
    let mut stmt = conn.prepare(sql)?;
    if !stmt.readonly() {
        return Err(AgentError::InvalidSql(format!(
            "statement would modify the database: {}",
            sql
        )));
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();
    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(width);
        for index in 0..width {
            values.push(to_json(row.get_ref(index)?));
        }
        rows.push(values);
    }

    Ok(Table { columns, rows })
}

fn schema_blocking(conn: &Connection, table: &str) -> Result<TableSchema> {
    let sample = query_blocking(conn, &format!("SELECT * FROM {} LIMIT 2", quote_ident(table)))?;

    let mut categories = BTreeMap::new();
    for column in &sample.columns {
        let sql = format!(
            "SELECT DISTINCT {col} FROM {table} WHERE typeof({col}) = 'text' ORDER BY 1 LIMIT {limit}",
            col = quote_ident(column),
            table = quote_ident(table),
            limit = defaults::MAX_CATEGORIES,
        );
        let mut stmt = conn.prepare(&sql)?;
        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if !values.is_empty() {
            categories.insert(column.clone(), values);
        }
    }

    Ok(TableSchema {
        table: table.to_string(),
        columns: sample.columns.clone(),
        categories,
        sample,
    })
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<{} byte blob>", bytes.len())),
    }
}

/// Quote an SQL identifier
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote an SQL string literal
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
