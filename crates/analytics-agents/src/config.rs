//! Pipeline configuration
//!
//! Loaded from an optional JSON file, then overridden by environment
//! variables. Every field has a default so an empty object is valid.

use std::path::{Path, PathBuf};

use node_engine::JoinPolicy;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::constants::{defaults, env};

/// Which implementation backs an LLM-capable stage
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Deterministic in-process implementation
    #[default]
    Local,
    /// Local Ollama server
    Ollama,
}

/// Ollama connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: defaults::OLLAMA_URL.to_string(),
            model: defaults::OLLAMA_MODEL.to_string(),
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Campaign performance CSV
    pub campaigns_csv: PathBuf,
    /// Knowledge base JSONL
    pub knowledge_base: PathBuf,
    /// Table name the CSV is exposed as
    pub table_name: String,
    /// SQL planner implementation
    pub planner: BackendKind,
    /// Summary implementation
    pub synthesizer: BackendKind,
    pub ollama: OllamaConfig,
    /// How the analyzer joins the two retrievers
    pub analyzer_join: JoinPolicy,
    /// Row cap for keyword-planned queries
    pub max_rows: usize,
    /// Retry once with `SELECT * FROM <table> LIMIT 10` when a query fails
    pub sql_fallback: bool,
    /// Maximum agents in flight (0 = unbounded)
    pub max_parallel: usize,
    /// Whole-run timeout in seconds
    pub timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            campaigns_csv: PathBuf::from(defaults::CAMPAIGNS_CSV),
            knowledge_base: PathBuf::from(defaults::KNOWLEDGE_BASE),
            table_name: defaults::TABLE_NAME.to_string(),
            planner: BackendKind::default(),
            synthesizer: BackendKind::default(),
            ollama: OllamaConfig::default(),
            analyzer_join: JoinPolicy::All,
            max_rows: defaults::MAX_ROWS,
            sql_fallback: true,
            max_parallel: 0,
            timeout_secs: defaults::TIMEOUT_SECS,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file
    ///
    /// A missing file yields the defaults.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).await.map_err(ConfigError::Io)?;
        let config = Self::from_json(&contents)?;
        log::info!("Configuration loaded from {:?}", path);
        Ok(config)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the `ANALYTICS_*` environment overrides
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(env::CAMPAIGNS_CSV) {
            self.campaigns_csv = PathBuf::from(path);
        }
        if let Some(path) = lookup(env::KNOWLEDGE_BASE) {
            self.knowledge_base = PathBuf::from(path);
        }
        if let Some(url) = lookup(env::OLLAMA_URL) {
            self.ollama.url = url;
        }
        if let Some(model) = lookup(env::OLLAMA_MODEL) {
            self.ollama.model = model;
        }
        self
    }

    /// Save configuration as pretty JSON
    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(ConfigError::Io)?;
        }
        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(path, contents).await.map_err(ConfigError::Io)?;
        log::info!("Configuration saved to {:?}", path);
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !is_identifier(&self.table_name) {
            return Err(ConfigError::Invalid(format!(
                "table_name '{}' must be alphanumeric or '_'",
                self.table_name
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(serde_json::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_object_is_default() {
        let config = PipelineConfig::from_json("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.analyzer_join, JoinPolicy::All);
        assert!(config.sql_fallback);
    }

    #[test]
    fn test_partial_config() {
        let config = PipelineConfig::from_json(
            r#"{"planner": "ollama", "analyzer_join": "settled", "ollama": {"url": "http://gpu:11434", "model": "qwen2.5"}}"#,
        )
        .unwrap();
        assert_eq!(config.planner, BackendKind::Ollama);
        assert_eq!(config.synthesizer, BackendKind::Local);
        assert_eq!(config.analyzer_join, JoinPolicy::Settled);
        assert_eq!(config.ollama.model, "qwen2.5");
        assert_eq!(config.table_name, defaults::TABLE_NAME);
    }

    #[test]
    fn test_rejects_bad_table_name() {
        let err = PipelineConfig::from_json(r#"{"table_name": "x; DROP TABLE y"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (env::CAMPAIGNS_CSV, "/tmp/c.csv"),
            (env::OLLAMA_MODEL, "mistral"),
        ]
        .into_iter()
        .collect();

        let config =
            PipelineConfig::default().with_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.campaigns_csv, PathBuf::from("/tmp/c.csv"));
        assert_eq!(config.ollama.model, "mistral");
        assert_eq!(config.ollama.url, defaults::OLLAMA_URL);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pipeline.json");

        let config = PipelineConfig {
            max_parallel: 2,
            ..PipelineConfig::default()
        };
        config.save(&path).await.unwrap();

        let loaded = PipelineConfig::load(&path).await.unwrap();
        assert_eq!(loaded.max_parallel, 2);
    }

    #[tokio::test]
    async fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = PipelineConfig::load(&dir.path().join("absent.json"))
            .await
            .unwrap();
        assert_eq!(loaded, PipelineConfig::default());
    }
}
