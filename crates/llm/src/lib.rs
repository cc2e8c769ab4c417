//! Docsum LLM Integration
//!
//! Text splitting, model backends and map-reduce summarization

mod chunking;
mod client;
mod huggingface;
mod llm_trait;
mod pipeline;
mod prompts;
mod retry;
mod summarize;
mod types;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(test)]
mod test_server;

pub use chunking::{split_text, Chunk, TextSplitter, DEFAULT_SEPARATORS};
pub use client::OllamaClient;
pub use huggingface::HuggingFaceClient;
pub use llm_trait::ModelClient;
pub use pipeline::{client_from_config, Pipeline};
pub use prompts::{PromptSpec, COMBINE_PROMPT, MAP_PROMPT, TEXT_PLACEHOLDER};
pub use retry::{RetryPolicy, RetryingClient};
pub use summarize::{MapReduceSummarizer, SummarizerOptions, SUMMARY_SEPARATOR};
pub use types::{Document, DocumentMetadata, ModelRequest, ModelResponse, Summary, SummaryNode};

// Re-exported so callers don't need a direct tokio-util dependency
pub use tokio_util::sync::CancellationToken;
