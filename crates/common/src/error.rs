use serde::Serialize;
use std::fmt;

/// Why a single model call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFailure {
    /// Connection refused, reset, DNS failure
    Network,
    /// The call did not complete within the client timeout
    Timeout,
    /// Backend answered 429
    RateLimited,
    /// Backend rejected the request itself (4xx other than 429)
    InvalidRequest,
    /// Backend is loading the model or shedding load (503)
    Overloaded,
    /// Any other backend-reported error
    Backend,
    /// Response body could not be parsed
    MalformedResponse,
    /// Response parsed but carried no generated text
    EmptyResponse,
}

impl ModelFailure {
    /// Whether a retry has a chance of succeeding
    pub fn is_transient(self) -> bool {
        !matches!(self, Self::InvalidRequest)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::InvalidRequest => "invalid_request",
            Self::Overloaded => "overloaded",
            Self::Backend => "backend",
            Self::MalformedResponse => "malformed_response",
            Self::EmptyResponse => "empty_response",
        }
    }
}

impl fmt::Display for ModelFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable failure identifier exposed to API callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    InvalidConfiguration,
    InvalidInput,
    UnsupportedMediaType,
    PayloadTooLarge,
    ExtractionFailed,
    ModelCallFailed,
    AggregateSummarizationFailed,
    RecursionLimitExceeded,
    Cancelled,
    Internal,
}

/// Docsum error types
#[derive(Debug, thiserror::Error)]
pub enum DocsumError {
    /// Splitter or pipeline parameters are unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Uploaded content type is not a recognized document type
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Upload exceeds the configured size limit
    #[error("Payload too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Text extraction from the uploaded document failed
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// A single model call failed
    #[error("Model call failed ({failure}): {message}")]
    ModelCallFailed {
        failure: ModelFailure,
        message: String,
    },

    /// One or more map-step calls failed after retries
    #[error("Summarization failed for chunk(s) {failed_chunks:?}: {message}")]
    AggregateSummarizationFailed {
        failed_chunks: Vec<usize>,
        /// Model failure behind the first failed chunk, when there was one
        failure: Option<ModelFailure>,
        message: String,
    },

    /// The reduce step did not converge under the depth cap
    #[error("Reduce step did not converge after {depth} pass(es); combined summary is still {size} chars")]
    RecursionLimitExceeded { depth: usize, size: usize },

    /// The request was aborted by the caller or by the request timeout
    #[error("Request cancelled")]
    Cancelled,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DocsumError {
    /// Create invalid configuration error
    pub fn invalid_configuration<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create extraction error
    pub fn extraction<S: Into<String>>(msg: S) -> Self {
        Self::Extraction(msg.into())
    }

    /// Create model call error
    pub fn model<S: Into<String>>(failure: ModelFailure, msg: S) -> Self {
        Self::ModelCallFailed {
            failure,
            message: msg.into(),
        }
    }

    /// Create internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// The model failure carried by this error, if any
    pub fn model_failure(&self) -> Option<ModelFailure> {
        match self {
            Self::ModelCallFailed { failure, .. } => Some(*failure),
            Self::AggregateSummarizationFailed { failure, .. } => *failure,
            _ => None,
        }
    }

    /// Whether retrying the same model call may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ModelCallFailed { failure, .. } => failure.is_transient(),
            _ => false,
        }
    }

    /// Stable kind reported to API callers
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidConfiguration(_) => FailureKind::InvalidConfiguration,
            Self::InvalidInput(_) => FailureKind::InvalidInput,
            Self::UnsupportedMediaType(_) => FailureKind::UnsupportedMediaType,
            Self::PayloadTooLarge { .. } => FailureKind::PayloadTooLarge,
            Self::Extraction(_) => FailureKind::ExtractionFailed,
            Self::ModelCallFailed { .. } => FailureKind::ModelCallFailed,
            Self::AggregateSummarizationFailed { .. } => FailureKind::AggregateSummarizationFailed,
            Self::RecursionLimitExceeded { .. } => FailureKind::RecursionLimitExceeded,
            Self::Cancelled => FailureKind::Cancelled,
            Self::Config(_)
            | Self::Internal(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => FailureKind::Internal,
        }
    }
}

// HTTP response conversion
impl DocsumError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::UnsupportedMediaType(_) => 415,
            Self::PayloadTooLarge { .. } => 413,
            Self::Extraction(_) => 422,
            Self::ModelCallFailed { .. } | Self::AggregateSummarizationFailed { .. } => {
                match self.model_failure() {
                    Some(ModelFailure::Timeout) => 504,
                    Some(ModelFailure::RateLimited) | Some(ModelFailure::Overloaded) => 503,
                    _ => 502,
                }
            }
            Self::RecursionLimitExceeded { .. } => 500,
            // Client closed request
            Self::Cancelled => 499,
            Self::InvalidConfiguration(_) => 500,
            Self::Config(_) => 500,
            Self::Internal(_) => 500,
            Self::Io(_) => 500,
            Self::Json(_) => 400,
            Self::Other(_) => 500,
        }
    }
}
