use async_trait::async_trait;
use docsum_common::Result;

use crate::types::{ModelRequest, ModelResponse};

/// A single text-generation call
///
/// Implementations make exactly one backend call per `generate` and never retry;
/// wrap them in `RetryingClient` for backoff. Failures are reported as
/// `DocsumError::ModelCallFailed`, never as an empty response.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Generate text from a prompt
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse>;

    /// Backend name for logs and health output
    fn name(&self) -> &str;

    /// Test connection/availability
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<T: ModelClient + ?Sized> ModelClient for std::sync::Arc<T> {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse> {
        (**self).generate(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    async fn health_check(&self) -> Result<()> {
        (**self).health_check().await
    }
}
