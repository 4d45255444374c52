//! LLM client seam (§2.1, §6): the core depends only on
//! `complete(prompt, max_tokens?, temperature?) -> text`; [`OllamaClient`]
//! is the one concrete implementation, speaking the Ollama `/api/generate`
//! protocol.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::LlmConfig;

/// Failure modes of the LLM interface (§6): `timeout`, `connection`,
/// `invalid_response`, `too_long`.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to connect to LLM backend: {0}")]
    Connection(String),

    #[error("LLM returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("prompt too long for the configured context window")]
    TooLong,
}

/// The core-facing seam for text generation. The orchestrator depends on
/// this trait object, never on a concrete backend (§1: "the core only sees
/// `complete(prompt) -> text`").
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    done: bool,
}

/// An HTTP client for Ollama's `/api/generate` endpoint (§2.1), the
/// original system's LLM backend.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model_name: String,
    timeout: Duration,
    default_temperature: f32,
    default_top_p: f32,
}

impl OllamaClient {
    #[must_use]
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url().trim_end_matches('/').to_string(),
            model_name: config.model_name().to_string(),
            timeout: Duration::from_secs(config.timeout_secs()),
            default_temperature: config.temperature(),
            default_top_p: config.top_p(),
        }
    }

    /// The per-call budget (§5: "LLM call: dynamic, `max(base=30s,
    /// approx_tokens/20)`"): the configured base timeout widens for calls
    /// that ask for a large completion, rather than a single flat timeout
    /// for every prompt regardless of requested length.
    fn call_timeout(&self, max_tokens: Option<u32>) -> Duration {
        let token_budget = max_tokens.map_or(Duration::ZERO, |tokens| Duration::from_secs(u64::from(tokens) / 20));
        self.timeout.max(token_budget)
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model_name,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: temperature.unwrap_or(self.default_temperature),
                top_p: self.default_top_p,
                num_predict: max_tokens,
            },
        };

        let timeout = self.call_timeout(max_tokens);
        let response = tokio::time::timeout(
            timeout,
            self.client.post(&url).json(&request).send(),
        )
        .await
        .map_err(|_| LlmError::Timeout(timeout))?
        .map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(timeout)
            } else {
                LlmError::Connection(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(LlmError::InvalidResponse(format!(
                "ollama returned status {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        if !body.done {
            log::warn!("ollama response for {} did not set done=true", self.model_name);
        }

        Ok(body.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(base_url: String) -> LlmConfig {
        LlmConfig {
            base_url,
            model_name: "llama3".to_string(),
            timeout_secs: 5,
            temperature: 0.7,
            top_p: 0.9,
        }
    }

    #[tokio::test]
    async fn complete_parses_successful_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/generate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"response":"hello from ollama","done":true}"#)
            .create_async()
            .await;

        let config = test_config(server.url());
        let client = OllamaClient::new(&config);
        let result = client.complete("say hello", None, None).await.unwrap();
        assert_eq!(result, "hello from ollama");
    }

    #[tokio::test]
    async fn complete_surfaces_non_success_status_as_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/generate")
            .with_status(500)
            .create_async()
            .await;

        let config = test_config(server.url());
        let client = OllamaClient::new(&config);
        let err = client.complete("say hello", None, None).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn call_timeout_widens_for_large_token_budgets() {
        let config = test_config("http://localhost:11434".to_string());
        let client = OllamaClient::new(&config);
        assert_eq!(client.call_timeout(None), Duration::from_secs(5));
        assert_eq!(client.call_timeout(Some(60)), Duration::from_secs(5));
        assert_eq!(client.call_timeout(Some(6000)), Duration::from_secs(300));
    }
}
