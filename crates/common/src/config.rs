use crate::error::DocsumError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix for configuration overrides
const ENV_PREFIX: &str = "DOCSUM";

/// Token variable used by the Hugging Face tooling
const HF_TOKEN_ENV: &str = "HUGGINGFACEHUB_API_TOKEN";

/// Which text-generation backend serves model calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Ollama,
    HuggingFace,
}

/// Chunking, map-reduce and retry parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizationConfig {
    /// Maximum chunk length in characters
    pub target_size: usize,

    /// Characters shared between consecutive chunks
    pub overlap: usize,

    /// Maximum in-flight map-step calls per request
    pub max_concurrency: usize,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens generated per call
    pub max_output_tokens: u32,

    /// Replace failed chunks with a placeholder instead of failing the request
    pub partial_tolerance: bool,

    /// Maximum number of re-split reduce passes
    pub max_reduce_depth: usize,

    /// Attempts per model call, including the first
    pub max_retries: u32,

    /// First backoff delay; doubles on every retry
    pub retry_base_delay_ms: u64,

    /// Overall deadline for one summarization request (0 disables it)
    pub request_timeout_secs: u64,
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            target_size: 2000,
            overlap: 200,
            max_concurrency: 4,
            temperature: 0.5,
            max_output_tokens: 1000,
            partial_tolerance: false,
            max_reduce_depth: 4,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            request_timeout_secs: 300,
        }
    }
}

impl SummarizationConfig {
    /// Validate splitter and fan-out parameters
    pub fn validate(&self) -> Result<(), DocsumError> {
        if self.target_size == 0 {
            return Err(DocsumError::invalid_configuration(
                "target_size must be greater than 0",
            ));
        }
        if self.overlap >= self.target_size {
            return Err(DocsumError::invalid_configuration(format!(
                "overlap ({}) must be smaller than target_size ({})",
                self.overlap, self.target_size
            )));
        }
        if self.max_concurrency == 0 {
            return Err(DocsumError::invalid_configuration(
                "max_concurrency must be at least 1",
            ));
        }
        if self.max_retries == 0 {
            return Err(DocsumError::invalid_configuration(
                "max_retries counts attempts and must be at least 1",
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(DocsumError::invalid_configuration(format!(
                "temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Docsum application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Model backend
    pub backend: BackendKind,

    /// Ollama API base URL
    pub ollama_base_url: String,

    /// Ollama model name
    pub ollama_model: String,

    /// Hugging Face Inference API base URL
    pub huggingface_api_url: String,

    /// Hugging Face model id
    pub huggingface_model: String,

    /// Hugging Face API token
    pub huggingface_api_token: Option<String>,

    /// Per-call HTTP timeout for model requests
    pub model_timeout_secs: u64,

    /// Server bind address
    pub server_host: String,

    /// Server port
    pub server_port: u16,

    /// Upload size limit enforced at the HTTP boundary
    pub max_upload_bytes: usize,

    /// Log directory
    pub log_dir: PathBuf,

    /// Log level
    pub log_level: String,

    /// Summarization parameters
    pub summarization: SummarizationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Ollama,
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.2:latest".to_string(),
            huggingface_api_url: "https://api-inference.huggingface.co".to_string(),
            huggingface_model: "mistralai/Mistral-7B-Instruct-v0.2".to_string(),
            huggingface_api_token: None,
            model_timeout_secs: 300,
            server_host: "0.0.0.0".to_string(),
            server_port: 3001,
            max_upload_bytes: 10 * 1024 * 1024,
            log_dir: PathBuf::from("./log"),
            log_level: "info".to_string(),
            summarization: SummarizationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, DocsumError> {
        Self::load(None)
    }

    /// Load configuration from an optional TOML file, then `DOCSUM_*` variables
    ///
    /// Nested keys use a double underscore, e.g. `DOCSUM_SUMMARIZATION__TARGET_SIZE`.
    pub fn load(path: Option<&Path>) -> Result<Self, DocsumError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| DocsumError::config(format!("Failed to load configuration: {}", e)))?;

        if config.huggingface_api_token.is_none() {
            config.huggingface_api_token = std::env::var(HF_TOKEN_ENV).ok();
        }

        Ok(config)
    }

    /// Get server bind address (host:port)
    pub fn server_bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), DocsumError> {
        self.summarization.validate()?;

        let url = match self.backend {
            BackendKind::Ollama => &self.ollama_base_url,
            BackendKind::HuggingFace => &self.huggingface_api_url,
        };
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(DocsumError::config(format!(
                "Backend URL must start with http:// or https://, got {}",
                url
            )));
        }

        if self.backend == BackendKind::HuggingFace && self.huggingface_api_token.is_none() {
            return Err(DocsumError::config(format!(
                "Hugging Face backend requires an API token ({})",
                HF_TOKEN_ENV
            )));
        }

        // Validate port range
        if self.server_port == 0 {
            return Err(DocsumError::config("Server port cannot be 0"));
        }

        if self.max_upload_bytes == 0 {
            return Err(DocsumError::config("max_upload_bytes cannot be 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server_port, 3001);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.summarization.target_size, 2000);
        assert_eq!(config.summarization.overlap, 200);
    }

    #[test]
    fn test_server_bind_address() {
        let config = AppConfig::default();
        assert_eq!(config.server_bind_address(), "0.0.0.0:3001");
    }

    #[test]
    fn test_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let mut invalid_config = AppConfig::default();
        invalid_config.ollama_base_url = "localhost:11434".to_string();
        assert!(invalid_config.validate().is_err());

        let mut hf = AppConfig::default();
        hf.backend = BackendKind::HuggingFace;
        hf.huggingface_api_token = None;
        assert!(hf.validate().is_err());
        hf.huggingface_api_token = Some("hf_token".to_string());
        assert!(hf.validate().is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_target() {
        let mut config = SummarizationConfig::default();
        config.overlap = config.target_size;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, DocsumError::InvalidConfiguration(_)));

        config.target_size = 0;
        config.overlap = 0;
        assert!(matches!(
            config.validate(),
            Err(DocsumError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let parsed: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "backend = \"huggingface\"\n[summarization]\ntarget_size = 500\n",
                config::FileFormat::Toml,
            ))
            .build()
            .and_then(|c| c.try_deserialize())
            .unwrap();

        assert_eq!(parsed.backend, BackendKind::HuggingFace);
        assert_eq!(parsed.summarization.target_size, 500);
        assert_eq!(parsed.summarization.overlap, 200);
        assert_eq!(parsed.server_port, 3001);
    }
}
