//! Analytics pipeline constants
//!
//! Single source of truth for node names, configuration defaults and
//! environment variable names.

/// Node names of the analytics graph
pub mod nodes {
    /// Entry node: classifies the query and fans out
    pub const ORCHESTRATOR: &str = "orchestrator";
    /// Structured (SQL) retriever
    pub const SQL_RETRIEVER: &str = "sqlRetriever";
    /// Semantic (knowledge base) retriever
    pub const KB_RETRIEVER: &str = "kbRetriever";
    /// Fan-in node producing the final answer
    pub const ANALYZER: &str = "analyzer";
}

/// Default values for pipeline configuration
pub mod defaults {
    /// Graph identifier used in events and logs
    pub const WORKFLOW_ID: &str = "analytics";
    /// Campaign performance CSV
    pub const CAMPAIGNS_CSV: &str = "data/campaign_performance.csv";
    /// Knowledge base documents, one JSON object per line
    pub const KNOWLEDGE_BASE: &str = "data/kb_documents.jsonl";
    /// Table the campaign CSV is loaded into
    pub const TABLE_NAME: &str = "campaign_performance";
    /// Ollama server
    pub const OLLAMA_URL: &str = "http://localhost:11434";
    /// Ollama model for SQL planning and synthesis
    pub const OLLAMA_MODEL: &str = "llama3.1";
    /// Row cap for keyword-planned queries
    pub const MAX_ROWS: usize = 200;
    /// Row count of the fallback query
    pub const FALLBACK_ROWS: usize = 10;
    /// Whole-run timeout
    pub const TIMEOUT_SECS: u64 = 120;
    /// Distinct values sampled per text column
    pub const MAX_CATEGORIES: usize = 64;
    /// Report file answers are appended to
    pub const REPORT_PATH: &str = "report.md";
}

/// Environment variables overriding the loaded configuration
pub mod env {
    pub const CAMPAIGNS_CSV: &str = "ANALYTICS_CAMPAIGNS_CSV";
    pub const KNOWLEDGE_BASE: &str = "ANALYTICS_KNOWLEDGE_BASE";
    pub const OLLAMA_URL: &str = "ANALYTICS_OLLAMA_URL";
    pub const OLLAMA_MODEL: &str = "ANALYTICS_OLLAMA_MODEL";
}
