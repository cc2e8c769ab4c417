pub mod config;
pub mod error;
pub mod logger;

// Re-export commonly used types
pub use config::{AppConfig, BackendKind, SummarizationConfig};
pub use error::{DocsumError, FailureKind, ModelFailure};
pub type Result<T> = std::result::Result<T, DocsumError>;
