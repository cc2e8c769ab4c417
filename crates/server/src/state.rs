use docsum_common::{AppConfig, Result};
use docsum_llm::{client_from_config, ModelClient, Pipeline};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Summarization pipeline shared by all requests
    pub pipeline: Pipeline,

    /// Backend client, kept for health checks
    pub client: Arc<dyn ModelClient>,
}

impl AppState {
    /// Create new application state from configuration
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = client_from_config(&config)?;
        Self::with_client(config, client)
    }

    /// Create state around an existing client
    pub fn with_client(config: AppConfig, client: Arc<dyn ModelClient>) -> Result<Self> {
        let pipeline = Pipeline::new(client.clone(), &config.summarization)?;

        Ok(Self {
            config,
            pipeline,
            client,
        })
    }
}
