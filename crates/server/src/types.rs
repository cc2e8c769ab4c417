use docsum_common::FailureKind;
use docsum_llm::Summary;
use serde::{Deserialize, Serialize};

/// Successful upload response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    /// Final summary text
    pub summary: String,

    pub chunk_count: usize,

    pub reduce_passes: usize,

    /// Chunks that were replaced by a placeholder
    #[serde(default)]
    pub failed_chunks: Vec<usize>,

    #[serde(default)]
    pub warnings: Vec<String>,
}

impl From<Summary> for SummaryResponse {
    fn from(summary: Summary) -> Self {
        Self {
            summary: summary.text,
            chunk_count: summary.chunk_count,
            reduce_passes: summary.reduce_passes,
            failed_chunks: summary.failed_chunks,
            warnings: summary.warnings,
        }
    }
}

/// Error body for every non-2xx response
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: FailureKind,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub backend: String,
    pub backend_reachable: bool,
    pub version: String,
}
