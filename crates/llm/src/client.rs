use async_trait::async_trait;
use docsum_common::{AppConfig, DocsumError, ModelFailure, Result};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info};

use crate::llm_trait::ModelClient;
use crate::types::{GenerateOptions, GenerateRequest, GenerateResponse, ModelRequest, ModelResponse};

/// Ollama API client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: Client,
}

impl OllamaClient {
    /// Create new Ollama client
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        let client = http_client(timeout)?;

        info!("Ollama client initialized: {} (model: {})", base_url, model);
        Ok(Self {
            base_url,
            model,
            client,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            &config.ollama_base_url,
            &config.ollama_model,
            Duration::from_secs(config.model_timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse> {
        let url = format!("{}/api/generate", self.base_url);

        debug!(
            "Sending generate request to Ollama - Model: {}, Prompt length: {}",
            self.model,
            request.prompt.len()
        );

        let body = GenerateRequest {
            model: self.model.clone(),
            prompt: request.prompt.clone(),
            stream: Some(false),
            options: Some(GenerateOptions {
                temperature: Some(request.temperature),
                num_predict: Some(i32::try_from(request.max_output_tokens).unwrap_or(i32::MAX)),
            }),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error("Ollama", e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| send_error("Ollama", e))?;
        if !status.is_success() {
            return Err(status_error("Ollama", status, &text));
        }

        let result: GenerateResponse = serde_json::from_str(&text).map_err(|e| {
            DocsumError::model(
                ModelFailure::MalformedResponse,
                format!("Failed to parse Ollama response: {}", e),
            )
        })?;

        if result.response.trim().is_empty() {
            return Err(DocsumError::model(
                ModelFailure::EmptyResponse,
                "Empty response from Ollama",
            ));
        }

        debug!(
            "Received response from Ollama - Length: {}, Done: {}",
            result.response.len(),
            result.done
        );
        Ok(ModelResponse::new(result.response))
    }

    fn name(&self) -> &str {
        "ollama"
    }

    /// Test connection to Ollama
    async fn health_check(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| send_error("Ollama", e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error("Ollama", status, ""))
        }
    }
}

/// Pooled HTTP client with a per-call timeout
pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| DocsumError::internal(format!("Failed to create HTTP client: {}", e)))
}

/// Transport failure before a status was received
pub(crate) fn send_error(backend: &str, e: reqwest::Error) -> DocsumError {
    let failure = if e.is_timeout() {
        ModelFailure::Timeout
    } else {
        ModelFailure::Network
    };
    DocsumError::model(failure, format!("{} request failed: {}", backend, e))
}

/// Backend-reported error status
pub(crate) fn status_error(backend: &str, status: StatusCode, body: &str) -> DocsumError {
    let failure = match status.as_u16() {
        408 => ModelFailure::Timeout,
        429 => ModelFailure::RateLimited,
        503 => ModelFailure::Overloaded,
        400..=499 => ModelFailure::InvalidRequest,
        _ => ModelFailure::Backend,
    };
    let detail = body.trim();
    let message = if detail.is_empty() {
        format!("{} API error: {}", backend, status)
    } else {
        format!("{} API error: {}: {}", backend, status, detail)
    };
    DocsumError::model(failure, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{http_response, spawn_mock_server, unused_port};

    fn client_for(port: u16) -> OllamaClient {
        OllamaClient::new(
            format!("http://127.0.0.1:{}/", port),
            "llama3.2",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn request() -> ModelRequest {
        ModelRequest::new("Summarize this.", 0.5, 1000)
    }

    fn failure_of(err: DocsumError) -> ModelFailure {
        match err {
            DocsumError::ModelCallFailed { failure, .. } => failure,
            other => panic!("expected ModelCallFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_returns_response_text() {
        let body = r#"{"model":"llama3.2","response":"A short summary.","done":true}"#;
        let (port, _handle) = spawn_mock_server(vec![http_response(200, body)]).await;

        let response = client_for(port).generate(&request()).await.unwrap();
        assert_eq!(response.text, "A short summary.");
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_rate_limited() {
        let (port, _handle) = spawn_mock_server(vec![http_response(429, "")]).await;

        let err = client_for(port).generate(&request()).await.unwrap_err();
        assert_eq!(failure_of(err), ModelFailure::RateLimited);
    }

    #[tokio::test]
    async fn test_bad_request_maps_to_invalid_request() {
        let (port, _handle) =
            spawn_mock_server(vec![http_response(400, r#"{"error":"model not found"}"#)]).await;

        let err = client_for(port).generate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("model not found"));
        assert_eq!(failure_of(err), ModelFailure::InvalidRequest);
    }

    #[tokio::test]
    async fn test_empty_response_is_an_error() {
        let body = r#"{"response":"   ","done":true}"#;
        let (port, _handle) = spawn_mock_server(vec![http_response(200, body)]).await;

        let err = client_for(port).generate(&request()).await.unwrap_err();
        assert_eq!(failure_of(err), ModelFailure::EmptyResponse);
    }

    #[tokio::test]
    async fn test_garbage_body_is_malformed() {
        let (port, _handle) = spawn_mock_server(vec![http_response(200, "<html>")]).await;

        let err = client_for(port).generate(&request()).await.unwrap_err();
        assert_eq!(failure_of(err), ModelFailure::MalformedResponse);
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_failure() {
        let port = unused_port().await;

        let err = client_for(port).generate(&request()).await.unwrap_err();
        assert_eq!(failure_of(err), ModelFailure::Network);
    }

    #[tokio::test]
    async fn test_health_check() {
        let (port, _handle) = spawn_mock_server(vec![http_response(200, r#"{"models":[]}"#)]).await;
        assert!(client_for(port).health_check().await.is_ok());
    }
}
