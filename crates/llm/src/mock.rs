//! Deterministic model client for tests.

use async_trait::async_trait;
use docsum_common::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::llm_trait::ModelClient;
use crate::types::{ModelRequest, ModelResponse};

type Responder = dyn Fn(usize, &ModelRequest) -> Result<String> + Send + Sync;
type DelayFn = dyn Fn(&ModelRequest) -> Duration + Send + Sync;

/// Stub client driven by a responder closure
///
/// The closure receives the 0-based call number and the request. Every prompt is
/// recorded in call order.
#[derive(Clone)]
pub struct StubClient {
    responder: Arc<Responder>,
    delay: Option<Arc<DelayFn>>,
    calls: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl StubClient {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(usize, &ModelRequest) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always answers with the same text
    pub fn fixed(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_, _| Ok(text.clone()))
    }

    /// Sleep before answering, per request
    pub fn with_delay<F>(mut self, delay: F) -> Self
    where
        F: Fn(&ModelRequest) -> Duration + Send + Sync + 'static,
    {
        self.delay = Some(Arc::new(delay));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ModelClient for StubClient {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.prompt.clone());

        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(request)).await;
        }

        (self.responder)(call, request).map(ModelResponse::new)
    }

    fn name(&self) -> &str {
        "stub"
    }
}
