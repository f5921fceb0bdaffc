//! Minimal Ollama client
//!
//! Sends a single non-streaming prompt to `/api/generate` and returns the
//! completion text.

use serde::Deserialize;

use crate::config::OllamaConfig;
use crate::error::{AgentError, Result};

/// Response structure from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    response: String,
}

/// Client for a local Ollama server
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &OllamaConfig) -> Self {
        Self::new(&config.url, &config.model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate a completion for `prompt`
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let request_body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": 0 }
        });

        log::debug!(
            "Sending {} char prompt to {} with model '{}'",
            prompt.len(),
            url,
            self.model
        );

        let http_response = self
            .http
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                AgentError::Llm(format!(
                    "Failed to connect to Ollama server at {}: {}. Is Ollama running?",
                    self.base_url, e
                ))
            })?;

        if !http_response.status().is_success() {
            let status = http_response.status();
            let error_body = http_response.text().await.unwrap_or_default();
            return Err(AgentError::Llm(format!(
                "Ollama API error ({}): {}",
                status, error_body
            )));
        }

        let response_data: OllamaResponse = http_response.json().await?;

        log::debug!(
            "Ollama completed with {} chars using model '{}'",
            response_data.response.len(),
            response_data.model
        );

        Ok(response_data.response)
    }
}
