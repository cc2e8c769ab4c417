use async_trait::async_trait;
use docsum_common::{AppConfig, DocsumError, ModelFailure, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::client::{http_client, send_error, status_error};
use crate::llm_trait::ModelClient;
use crate::types::{
    HfErrorBody, ModelRequest, ModelResponse, TextGeneration, TextGenerationParameters,
    TextGenerationRequest,
};

/// Hugging Face Inference API client (text-generation task)
#[derive(Debug, Clone)]
pub struct HuggingFaceClient {
    base_url: String,
    model: String,
    api_token: String,
    client: Client,
}

impl HuggingFaceClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();

        info!("Hugging Face client initialized: {} (model: {})", base_url, model);
        Ok(Self {
            base_url,
            model,
            api_token: api_token.into(),
            client: http_client(timeout)?,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let token = config.huggingface_api_token.clone().ok_or_else(|| {
            DocsumError::config("Hugging Face backend requires an API token")
        })?;
        Self::new(
            &config.huggingface_api_url,
            &config.huggingface_model,
            token,
            Duration::from_secs(config.model_timeout_secs),
        )
    }

    fn model_url(&self) -> String {
        format!("{}/models/{}", self.base_url, self.model)
    }
}

#[async_trait]
impl ModelClient for HuggingFaceClient {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse> {
        debug!(
            "Sending text-generation request to Hugging Face - Model: {}, Prompt length: {}",
            self.model,
            request.prompt.len()
        );

        let body = TextGenerationRequest {
            inputs: request.prompt.clone(),
            parameters: TextGenerationParameters {
                temperature: request.temperature,
                max_new_tokens: request.max_output_tokens,
                return_full_text: false,
            },
        };

        let response = self
            .client
            .post(self.model_url())
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error("Hugging Face", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| send_error("Hugging Face", e))?;

        if !status.is_success() {
            // 503 while the model is loading carries an estimated wait
            let detail = match serde_json::from_str::<HfErrorBody>(&text) {
                Ok(HfErrorBody {
                    error,
                    estimated_time: Some(secs),
                }) => format!("{} (estimated wait {:.0}s)", error, secs),
                Ok(HfErrorBody { error, .. }) => error,
                Err(_) => text,
            };
            return Err(status_error("Hugging Face", status, &detail));
        }

        let generations: Vec<TextGeneration> = serde_json::from_str(&text).map_err(|e| {
            DocsumError::model(
                ModelFailure::MalformedResponse,
                format!("Failed to parse Hugging Face response: {}", e),
            )
        })?;

        let generated = generations
            .into_iter()
            .next()
            .map(|g| g.generated_text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                DocsumError::model(ModelFailure::EmptyResponse, "Empty response from Hugging Face")
            })?;

        Ok(ModelResponse::new(generated.trim()))
    }

    fn name(&self) -> &str {
        "huggingface"
    }

    async fn health_check(&self) -> Result<()> {
        let response = self
            .client
            .get(self.model_url())
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| send_error("Hugging Face", e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error("Hugging Face", status, ""))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{http_response, spawn_mock_server};

    fn client_for(port: u16) -> HuggingFaceClient {
        HuggingFaceClient::new(
            format!("http://127.0.0.1:{}", port),
            "mistralai/Mistral-7B-Instruct-v0.2",
            "hf_test",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn request() -> ModelRequest {
        ModelRequest::new("<s>[INST] Summarize [/INST]</s>", 0.5, 1000)
    }

    #[tokio::test]
    async fn test_generate_takes_first_generation() {
        let body = r#"[{"generated_text":"  The report covers Q3 revenue.  "}]"#;
        let (port, _handle) = spawn_mock_server(vec![http_response(200, body)]).await;

        let response = client_for(port).generate(&request()).await.unwrap();
        assert_eq!(response.text, "The report covers Q3 revenue.");
    }

    #[tokio::test]
    async fn test_model_loading_maps_to_overloaded() {
        let body = r#"{"error":"Model is currently loading","estimated_time":20.0}"#;
        let (port, _handle) = spawn_mock_server(vec![http_response(503, body)]).await;

        let err = client_for(port).generate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("estimated wait 20s"));
        assert!(matches!(
            err,
            DocsumError::ModelCallFailed {
                failure: ModelFailure::Overloaded,
                ..
            }
        ));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_empty_generation_list_is_an_error() {
        let (port, _handle) = spawn_mock_server(vec![http_response(200, "[]")]).await;

        let err = client_for(port).generate(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            DocsumError::ModelCallFailed {
                failure: ModelFailure::EmptyResponse,
                ..
            }
        ));
    }

    #[test]
    fn test_from_config_requires_token() {
        let config = AppConfig::default();
        assert!(HuggingFaceClient::from_config(&config).is_err());
    }
}
