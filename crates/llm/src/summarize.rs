use docsum_common::{DocsumError, Result, SummarizationConfig};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::ops::Range;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chunking::{char_len, Chunk, TextSplitter};
use crate::llm_trait::ModelClient;
use crate::prompts::{PromptSpec, COMBINE_PROMPT, MAP_PROMPT};
use crate::types::{ModelRequest, Summary, SummaryNode};

/// Joins partial summaries before the reduce step
pub const SUMMARY_SEPARATOR: &str = "\n\n";

/// Map-reduce parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SummarizerOptions {
    pub target_size: usize,
    pub overlap: usize,
    pub max_concurrency: usize,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub partial_tolerance: bool,
    pub max_reduce_depth: usize,
}

impl SummarizerOptions {
    pub fn from_config(config: &SummarizationConfig) -> Self {
        Self {
            target_size: config.target_size,
            overlap: config.overlap,
            max_concurrency: config.max_concurrency.max(1),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            partial_tolerance: config.partial_tolerance,
            max_reduce_depth: config.max_reduce_depth,
        }
    }
}

impl Default for SummarizerOptions {
    fn default() -> Self {
        Self::from_config(&SummarizationConfig::default())
    }
}

/// Summarizer for long text using map-reduce strategy
pub struct MapReduceSummarizer {
    client: Arc<dyn ModelClient>,
    options: SummarizerOptions,
    map_prompt: PromptSpec,
    combine_prompt: PromptSpec,
}

impl MapReduceSummarizer {
    /// Create new summarizer
    pub fn new(client: Arc<dyn ModelClient>, options: SummarizerOptions) -> Self {
        Self {
            client,
            options,
            map_prompt: MAP_PROMPT,
            combine_prompt: COMBINE_PROMPT,
        }
    }

    pub fn with_prompts(mut self, map_prompt: PromptSpec, combine_prompt: PromptSpec) -> Self {
        self.map_prompt = map_prompt;
        self.combine_prompt = combine_prompt;
        self
    }

    pub fn options(&self) -> &SummarizerOptions {
        &self.options
    }

    /// Summarize ordered chunks into one summary
    ///
    /// Chunk summaries are combined in chunk order. While the combined text is
    /// longer than `target_size` it is re-split and summarized again with the
    /// combine prompt, at most `max_reduce_depth` times.
    pub async fn summarize(&self, chunks: &[Chunk], cancel: &CancellationToken) -> Result<Summary> {
        if chunks.is_empty() {
            debug!("No chunks to summarize");
            return Ok(Summary::empty());
        }

        let splitter = TextSplitter::new(self.options.target_size, self.options.overlap)?;
        let mut warnings = Vec::new();

        // Map phase
        info!("Map step over {} chunk(s)", chunks.len());
        let outputs = self.map_step(chunks, &self.map_prompt, cancel).await?;
        let (leaves, failed_chunks) = self.collect_outputs(chunks, outputs, SECTION_LABEL)?;
        if !failed_chunks.is_empty() {
            warnings.push(format!(
                "{} chunk(s) could not be summarized: {:?}",
                failed_chunks.len(),
                failed_chunks
            ));
        }

        let mut nodes: Vec<SummaryNode> = leaves
            .into_iter()
            .zip(chunks)
            .map(|(text, chunk)| SummaryNode::Leaf {
                chunk_index: chunk.index,
                text,
            })
            .collect();

        // Reduce phase
        let mut passes = 0;
        let combined = loop {
            let (combined, spans) = join_summaries(&nodes);
            let size = char_len(&combined);
            debug!("Combined summaries - Length: {} chars", size);

            if size <= self.options.target_size {
                break combined;
            }

            if passes >= self.options.max_reduce_depth {
                if !self.options.partial_tolerance {
                    return Err(DocsumError::RecursionLimitExceeded {
                        depth: passes,
                        size,
                    });
                }
                let message = format!(
                    "Reduce step did not converge after {} pass(es); combined summaries truncated from {} to {} chars",
                    passes, size, self.options.target_size
                );
                warn!("{}", message);
                warnings.push(message);
                break combined.chars().take(self.options.target_size).collect();
            }

            passes += 1;
            let sub_chunks = splitter.split(&combined);
            info!(
                "Reduce pass {}: {} chars exceed target size {}, re-split into {} chunk(s)",
                passes,
                size,
                self.options.target_size,
                sub_chunks.len()
            );

            let outputs = self.map_step(&sub_chunks, &self.combine_prompt, cancel).await?;
            let (texts, failed) = self.collect_outputs(&sub_chunks, outputs, COMBINED_PART_LABEL)?;
            if !failed.is_empty() {
                warnings.push(format!(
                    "Reduce pass {}: {} section(s) could not be combined: {:?}",
                    passes,
                    failed.len(),
                    failed
                ));
            }

            nodes = texts
                .into_iter()
                .zip(&sub_chunks)
                .map(|(text, chunk)| SummaryNode::Aggregate {
                    text,
                    children: children_within(&nodes, &spans, chunk.core_start..chunk.end),
                })
                .collect();
        };

        // Final combine call
        info!("Final combine over {} summaries ({} chars)", nodes.len(), char_len(&combined));
        let text = self.generate(&self.combine_prompt, &combined, cancel).await?;

        Ok(Summary {
            text: text.clone(),
            chunk_count: chunks.len(),
            reduce_passes: passes,
            failed_chunks,
            warnings,
            empty: false,
            tree: Some(SummaryNode::Aggregate {
                text,
                children: nodes,
            }),
        })
    }

    /// One call per chunk with bounded concurrency; results keep chunk order
    async fn map_step(
        &self,
        chunks: &[Chunk],
        prompt: &PromptSpec,
        cancel: &CancellationToken,
    ) -> Result<Vec<Result<String>>> {
        let calls = stream::iter(chunks.iter().map(|chunk| {
            let request = self.request(prompt, &chunk.text);
            async move {
                debug!("Summarizing chunk {} with {} prompt", chunk.index, prompt.name);
                self.client
                    .generate(&request)
                    .await
                    .map(|response| response.text.trim().to_string())
            }
        }))
        .buffered(self.options.max_concurrency)
        .collect::<Vec<_>>();

        until_cancelled(cancel, calls).await
    }

    /// Split results into ordered texts and failed indices, applying the partial-failure policy
    fn collect_outputs(
        &self,
        chunks: &[Chunk],
        outputs: Vec<Result<String>>,
        label: &str,
    ) -> Result<(Vec<String>, Vec<usize>)> {
        let mut texts = Vec::with_capacity(outputs.len());
        let mut failed = Vec::new();
        let mut first_error = None;

        for (chunk, output) in chunks.iter().zip(outputs) {
            match output {
                Ok(text) => texts.push(text),
                Err(e) => {
                    warn!("Chunk {} failed: {}", chunk.index, e);
                    failed.push(chunk.index);
                    texts.push(placeholder(label, chunk.index));
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(error) = first_error {
            if !self.options.partial_tolerance || failed.len() == chunks.len() {
                return Err(DocsumError::AggregateSummarizationFailed {
                    failed_chunks: failed,
                    failure: error.model_failure(),
                    message: error.to_string(),
                });
            }
        }

        Ok((texts, failed))
    }

    async fn generate(&self, prompt: &PromptSpec, text: &str, cancel: &CancellationToken) -> Result<String> {
        let request = self.request(prompt, text);
        let response = until_cancelled(cancel, self.client.generate(&request)).await??;
        Ok(response.text.trim().to_string())
    }

    fn request(&self, prompt: &PromptSpec, text: &str) -> ModelRequest {
        ModelRequest::new(
            prompt.render(text),
            self.options.temperature,
            self.options.max_output_tokens,
        )
    }
}

/// Placeholder label for document chunks in the map step
const SECTION_LABEL: &str = "Section";

/// Placeholder label for re-split pieces in a reduce pass
const COMBINED_PART_LABEL: &str = "Combined part";

/// Notice substituted for a chunk whose summary could not be produced
fn placeholder(label: &str, index: usize) -> String {
    format!("[{} {} could not be summarized]", label, index + 1)
}

/// Join node texts in order, returning the byte span of each node in the result
fn join_summaries(nodes: &[SummaryNode]) -> (String, Vec<Range<usize>>) {
    let mut combined = String::new();
    let mut spans = Vec::with_capacity(nodes.len());

    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            combined.push_str(SUMMARY_SEPARATOR);
        }
        let start = combined.len();
        combined.push_str(node.text());
        spans.push(start..combined.len());
    }

    (combined, spans)
}

/// Nodes whose text starts inside `core`, so every node gets exactly one parent
fn children_within(nodes: &[SummaryNode], spans: &[Range<usize>], core: Range<usize>) -> Vec<SummaryNode> {
    nodes
        .iter()
        .zip(spans)
        .filter(|(_, node_span)| core.contains(&node_span.start))
        .map(|(node, _)| node.clone())
        .collect()
}

async fn until_cancelled<F: Future>(cancel: &CancellationToken, fut: F) -> Result<F::Output> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            info!("Summarization cancelled");
            Err(DocsumError::Cancelled)
        }
        output = fut => Ok(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::split_text;
    use crate::mock::StubClient;
    use docsum_common::ModelFailure;
    use std::time::Duration;

    fn options(target_size: usize, overlap: usize) -> SummarizerOptions {
        SummarizerOptions {
            target_size,
            overlap,
            max_concurrency: 3,
            temperature: 0.5,
            max_output_tokens: 100,
            partial_tolerance: false,
            max_reduce_depth: 3,
        }
    }

    fn chunk(index: usize, text: &str) -> Chunk {
        Chunk {
            index,
            text: text.to_string(),
            start: index * 100,
            core_start: index * 100,
            end: index * 100 + text.len(),
        }
    }

    /// Replies "summary-of-chunk-N" for a prompt containing "chunk-N"
    fn indexing_stub() -> StubClient {
        StubClient::new(|_, request| {
            if request.prompt.contains("consecutive parts") {
                return Ok("final".to_string());
            }
            let index = request
                .prompt
                .split("chunk-")
                .nth(1)
                .and_then(|rest| rest.split_whitespace().next())
                .unwrap_or("?")
                .to_string();
            Ok(format!("summary-of-chunk-{}", index))
        })
    }

    #[tokio::test]
    async fn test_zero_chunks_makes_no_calls() {
        let stub = StubClient::fixed("unused");
        let summarizer = MapReduceSummarizer::new(Arc::new(stub.clone()), options(100, 10));

        let summary = summarizer.summarize(&[], &CancellationToken::new()).await.unwrap();
        assert!(summary.empty);
        assert_eq!(summary.text, "");
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn test_out_of_order_completion_keeps_chunk_order() {
        // Later chunks finish first
        let stub = indexing_stub().with_delay(|request| {
            let n = request.prompt.matches("chunk-").count() as u64;
            let late = request.prompt.contains("chunk-0 ") as u64 * 30
                + request.prompt.contains("chunk-1 ") as u64 * 20;
            Duration::from_millis(n + late)
        });
        let summarizer = MapReduceSummarizer::new(Arc::new(stub.clone()), options(1000, 0));
        let chunks: Vec<Chunk> = (0..5).map(|i| chunk(i, &format!("chunk-{} body", i))).collect();

        let summary = summarizer.summarize(&chunks, &CancellationToken::new()).await.unwrap();
        assert_eq!(summary.text, "final");

        let prompts = stub.prompts();
        let final_prompt = prompts.last().unwrap();
        let positions: Vec<usize> = (0..5)
            .map(|i| final_prompt.find(&format!("summary-of-chunk-{}", i)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        let tree = summary.tree.unwrap();
        assert_eq!(tree.leaf_indices(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_failed_chunk_fails_request_with_index() {
        let stub = StubClient::new(|_, request| {
            if request.prompt.contains("chunk-2 ") {
                Err(DocsumError::model(ModelFailure::Backend, "boom"))
            } else {
                Ok("ok".to_string())
            }
        });
        let summarizer = MapReduceSummarizer::new(Arc::new(stub), options(1000, 0));
        let chunks: Vec<Chunk> = (0..4).map(|i| chunk(i, &format!("chunk-{} body", i))).collect();

        let err = summarizer
            .summarize(&chunks, &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            DocsumError::AggregateSummarizationFailed { failed_chunks, failure, message } => {
                assert_eq!(failed_chunks, vec![2]);
                assert_eq!(failure, Some(ModelFailure::Backend));
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_partial_tolerance_inserts_placeholder() {
        let stub = StubClient::new(|_, request| {
            if request.prompt.contains("chunk-1 ") {
                Err(DocsumError::model(ModelFailure::RateLimited, "429"))
            } else if request.prompt.contains("consecutive parts") {
                Ok("final".to_string())
            } else {
                Ok("ok".to_string())
            }
        });
        let mut opts = options(1000, 0);
        opts.partial_tolerance = true;
        let summarizer = MapReduceSummarizer::new(Arc::new(stub.clone()), opts);
        let chunks: Vec<Chunk> = (0..3).map(|i| chunk(i, &format!("chunk-{} body", i))).collect();

        let summary = summarizer.summarize(&chunks, &CancellationToken::new()).await.unwrap();
        assert_eq!(summary.failed_chunks, vec![1]);
        assert_eq!(summary.warnings.len(), 1);
        assert!(stub
            .prompts()
            .last()
            .unwrap()
            .contains("[Section 2 could not be summarized]"));
    }

    #[tokio::test]
    async fn test_failed_reduce_piece_gets_combined_part_placeholder() {
        // Each leaf is ~70 chars, so with target 100 every leaf becomes its own reduce piece
        let stub = StubClient::new(|_, request| {
            if request.prompt.contains("consecutive parts") {
                if request.prompt.contains("summary-of-chunk-1 ") {
                    return Err(DocsumError::model(ModelFailure::Backend, "502"));
                }
                return Ok(if request.prompt.contains("could not be summarized") {
                    "final"
                } else {
                    "ok"
                }
                .to_string());
            }
            let index = request
                .prompt
                .split("chunk-")
                .nth(1)
                .and_then(|rest| rest.split_whitespace().next())
                .unwrap_or("?")
                .to_string();
            Ok(format!("summary-of-chunk-{} {}", index, "x".repeat(50)))
        });
        let mut opts = options(100, 0);
        opts.partial_tolerance = true;
        let summarizer = MapReduceSummarizer::new(Arc::new(stub.clone()), opts);
        let chunks: Vec<Chunk> = (0..3).map(|i| chunk(i, &format!("chunk-{} body", i))).collect();

        let summary = summarizer.summarize(&chunks, &CancellationToken::new()).await.unwrap();
        assert_eq!(summary.text, "final");
        assert_eq!(summary.reduce_passes, 1);
        assert!(summary.failed_chunks.is_empty());
        assert!(summary.warnings.iter().any(|w| w.starts_with("Reduce pass 1")));

        let prompts = stub.prompts();
        let final_prompt = prompts.last().unwrap();
        assert!(final_prompt.contains("[Combined part 2 could not be summarized]"));
        assert!(!final_prompt.contains("[Section"));
    }

    #[tokio::test]
    async fn test_partial_tolerance_still_fails_when_every_chunk_fails() {
        let stub = StubClient::new(|_, _| Err(DocsumError::model(ModelFailure::Network, "down")));
        let mut opts = options(1000, 0);
        opts.partial_tolerance = true;
        let summarizer = MapReduceSummarizer::new(Arc::new(stub), opts);
        let chunks = vec![chunk(0, "chunk-0 body"), chunk(1, "chunk-1 body")];

        let err = summarizer
            .summarize(&chunks, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DocsumError::AggregateSummarizationFailed { .. }));
    }

    #[tokio::test]
    async fn test_non_converging_reduce_hits_depth_cap() {
        // Every call returns more text than the target size
        let stub = StubClient::fixed("word ".repeat(40));
        let summarizer = MapReduceSummarizer::new(Arc::new(stub.clone()), options(100, 10));
        let chunks = split_text(&"chunk text. ".repeat(30), 100, 10).unwrap();

        let err = summarizer
            .summarize(&chunks, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DocsumError::RecursionLimitExceeded { depth: 3, .. }));
    }

    #[tokio::test]
    async fn test_non_converging_reduce_truncates_in_partial_mode() {
        let stub = StubClient::fixed("word ".repeat(40));
        let mut opts = options(100, 10);
        opts.partial_tolerance = true;
        opts.max_reduce_depth = 1;
        let summarizer = MapReduceSummarizer::new(Arc::new(stub), opts);
        let chunks = split_text(&"chunk text. ".repeat(30), 100, 10).unwrap();

        let summary = summarizer.summarize(&chunks, &CancellationToken::new()).await.unwrap();
        assert_eq!(summary.reduce_passes, 1);
        assert!(summary.warnings.iter().any(|w| w.contains("truncated")));
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_calls() {
        let stub = StubClient::fixed("slow").with_delay(|_| Duration::from_secs(30));
        let summarizer = MapReduceSummarizer::new(Arc::new(stub), options(1000, 0));
        let chunks = vec![chunk(0, "chunk-0 body"), chunk(1, "chunk-1 body")];
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = summarizer.summarize(&chunks, &cancel).await.unwrap_err();
        assert!(matches!(err, DocsumError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_join_summaries_spans() {
        let nodes = vec![
            SummaryNode::Leaf { chunk_index: 0, text: "ab".into() },
            SummaryNode::Leaf { chunk_index: 1, text: "cd".into() },
        ];
        let (combined, spans) = join_summaries(&nodes);
        assert_eq!(combined, "ab\n\ncd");
        assert_eq!(spans, vec![0..2, 4..6]);
        assert_eq!(children_within(&nodes, &spans, 0..4).len(), 1);
        assert_eq!(children_within(&nodes, &spans, 4..6).len(), 1);
        assert_eq!(children_within(&nodes, &spans, 0..6).len(), 2);
    }
}
