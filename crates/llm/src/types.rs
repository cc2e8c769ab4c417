use serde::{Deserialize, Serialize};

/// Backend-agnostic generation request
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    /// Fully rendered prompt
    pub prompt: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_output_tokens: u32,
}

impl ModelRequest {
    pub fn new(prompt: impl Into<String>, temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            temperature,
            max_output_tokens,
        }
    }
}

/// Generated text returned by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelResponse {
    pub text: String,
}

impl ModelResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Ollama generate request
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    /// Model name (e.g., "llama3.2", "gemma2")
    pub model: String,

    /// Prompt text
    pub prompt: String,

    /// Disable streaming
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    /// Generation options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>,
}

/// Generation options
#[derive(Debug, Clone, Serialize, Default)]
pub struct GenerateOptions {
    /// Temperature (0.0 - 1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,
}

/// Ollama generate response
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    /// Generated text
    pub response: String,

    /// Whether generation is complete
    #[serde(default)]
    pub done: bool,
}

/// Hugging Face text-generation request
#[derive(Debug, Clone, Serialize)]
pub struct TextGenerationRequest {
    pub inputs: String,
    pub parameters: TextGenerationParameters,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextGenerationParameters {
    pub temperature: f32,
    pub max_new_tokens: u32,
    /// Only return the continuation, not the prompt
    pub return_full_text: bool,
}

/// One element of the Hugging Face text-generation response array
#[derive(Debug, Clone, Deserialize)]
pub struct TextGeneration {
    pub generated_text: String,
}

/// Hugging Face error body
#[derive(Debug, Clone, Deserialize)]
pub struct HfErrorBody {
    pub error: String,
    #[serde(default)]
    pub estimated_time: Option<f32>,
}

/// Node of the summary tree built bottom-up by map-reduce
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryNode {
    /// Map-step output for one source chunk
    Leaf { chunk_index: usize, text: String },

    /// Summary produced by combining an ordered list of child summaries
    Aggregate {
        text: String,
        children: Vec<SummaryNode>,
    },
}

impl SummaryNode {
    pub fn text(&self) -> &str {
        match self {
            Self::Leaf { text, .. } | Self::Aggregate { text, .. } => text,
        }
    }

    /// Height of the tree; a leaf has depth 1
    pub fn depth(&self) -> usize {
        match self {
            Self::Leaf { .. } => 1,
            Self::Aggregate { children, .. } => {
                1 + children.iter().map(SummaryNode::depth).max().unwrap_or(0)
            }
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf { .. } => 1,
            Self::Aggregate { children, .. } => children.iter().map(SummaryNode::leaf_count).sum(),
        }
    }

    /// Chunk indices of all leaves, left to right
    pub fn leaf_indices(&self) -> Vec<usize> {
        let mut out = Vec::new();
        self.collect_leaf_indices(&mut out);
        out
    }

    fn collect_leaf_indices(&self, out: &mut Vec<usize>) {
        match self {
            Self::Leaf { chunk_index, .. } => out.push(*chunk_index),
            Self::Aggregate { children, .. } => {
                for child in children {
                    child.collect_leaf_indices(out);
                }
            }
        }
    }
}

/// Summarization result
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    /// Final summary text
    pub text: String,

    /// Number of chunks the source document was split into
    pub chunk_count: usize,

    /// Re-split reduce passes performed before the final combine call
    pub reduce_passes: usize,

    /// Chunks replaced by a placeholder (partial-tolerance mode only)
    pub failed_chunks: Vec<usize>,

    /// Non-fatal conditions the caller should surface
    pub warnings: Vec<String>,

    /// The document was empty and no model call was made
    pub empty: bool,

    /// Summary tree, kept for inspection while the request is alive
    #[serde(skip)]
    pub tree: Option<SummaryNode>,
}

impl Summary {
    /// Result for a document without any text
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            chunk_count: 0,
            reduce_passes: 0,
            failed_chunks: Vec::new(),
            warnings: Vec::new(),
            empty: true,
            tree: None,
        }
    }
}

/// Source metadata reported by the extraction step
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentMetadata {
    pub filename: Option<String>,
    pub page_count: Option<usize>,
}

/// Extracted document text handed to the pipeline
#[derive(Debug, Clone)]
pub struct Document {
    text: String,
    metadata: DocumentMetadata,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: DocumentMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    /// True when there is nothing but whitespace to summarize
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
