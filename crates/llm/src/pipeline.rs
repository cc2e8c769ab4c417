use docsum_common::{AppConfig, BackendKind, DocsumError, Result, SummarizationConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::chunking::{char_len, TextSplitter};
use crate::client::OllamaClient;
use crate::huggingface::HuggingFaceClient;
use crate::llm_trait::ModelClient;
use crate::retry::{RetryPolicy, RetryingClient};
use crate::summarize::{MapReduceSummarizer, SummarizerOptions};
use crate::types::{Document, Summary};

/// Build the configured backend wrapped in the retry policy
pub fn client_from_config(config: &AppConfig) -> Result<Arc<dyn ModelClient>> {
    let policy = RetryPolicy::from_config(&config.summarization);
    let client: Arc<dyn ModelClient> = match config.backend {
        BackendKind::Ollama => Arc::new(RetryingClient::new(OllamaClient::from_config(config)?, policy)),
        BackendKind::HuggingFace => {
            Arc::new(RetryingClient::new(HuggingFaceClient::from_config(config)?, policy))
        }
    };
    Ok(client)
}

/// Document text in, final summary out
pub struct Pipeline {
    splitter: TextSplitter,
    summarizer: MapReduceSummarizer,
    request_timeout: Option<Duration>,
}

impl Pipeline {
    /// Create a pipeline; fails with `InvalidConfiguration` before any model call
    pub fn new(client: Arc<dyn ModelClient>, config: &SummarizationConfig) -> Result<Self> {
        config.validate()?;

        let request_timeout = match config.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            splitter: TextSplitter::new(config.target_size, config.overlap)?,
            summarizer: MapReduceSummarizer::new(client, SummarizerOptions::from_config(config)),
            request_timeout,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(client_from_config(config)?, &config.summarization)
    }

    pub fn summarizer(&self) -> &MapReduceSummarizer {
        &self.summarizer
    }

    /// Summarize one document
    ///
    /// A blank document returns an empty summary without calling the model. The
    /// request fails with `Cancelled` if `cancel` fires or the request timeout elapses.
    pub async fn run(&self, document: &Document, cancel: &CancellationToken) -> Result<Summary> {
        if document.is_blank() {
            info!("Empty document, skipping summarization");
            return Ok(Summary::empty());
        }

        let chunks = self.splitter.split(document.text());
        if chunks.is_empty() {
            return Ok(Summary::empty());
        }

        info!(
            "Starting summarization - File: {}, Pages: {}, Text length: {} chars, Chunks: {}",
            document.metadata().filename.as_deref().unwrap_or("-"),
            document
                .metadata()
                .page_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
            char_len(document.text()),
            chunks.len()
        );

        let work = self.summarizer.summarize(&chunks, cancel);
        match self.request_timeout {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Summarization exceeded {:?}, cancelling", limit);
                    cancel.cancel();
                    Err(DocsumError::Cancelled)
                }
            },
            None => work.await,
        }
    }
}
