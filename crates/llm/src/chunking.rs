use docsum_common::{DocsumError, Result};
use std::ops::Range;

/// Separators tried from coarsest to finest granularity
///
/// Paragraph breaks, line breaks, sentence endings (including CJK full stops),
/// then word breaks. Pieces that are still too long after the last separator are
/// cut into fixed character windows.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "? ", "! ", "。", "！", "？", " "];

/// Text chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in document order (0-based)
    pub index: usize,

    /// Chunk text, including the leading overlap copied from the previous chunk
    pub text: String,

    /// Byte offset where the chunk (including overlap) starts in the parent text
    pub start: usize,

    /// Byte offset where the chunk's own content starts; `start..core_start` is overlap
    pub core_start: usize,

    /// Byte offset one past the end of the chunk in the parent text
    pub end: usize,
}

impl Chunk {
    /// Overlap region shared with the previous chunk
    pub fn overlap(&self) -> &str {
        &self.text[..self.core_start - self.start]
    }

    /// Content owned by this chunk alone
    pub fn core(&self) -> &str {
        &self.text[self.core_start - self.start..]
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Byte span in the parent text
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Recursive separator splitter
#[derive(Debug, Clone)]
pub struct TextSplitter {
    target_size: usize,
    overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    /// Create a splitter with the default separator priority list
    ///
    /// Fails with `InvalidConfiguration` unless `target_size > 0` and
    /// `overlap < target_size`.
    pub fn new(target_size: usize, overlap: usize) -> Result<Self> {
        if target_size == 0 {
            return Err(DocsumError::invalid_configuration(
                "target_size must be greater than 0",
            ));
        }
        if overlap >= target_size {
            return Err(DocsumError::invalid_configuration(format!(
                "overlap ({}) must be smaller than target_size ({})",
                overlap, target_size
            )));
        }

        Ok(Self {
            target_size,
            overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Replace the separator priority list (coarsest first)
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators
            .into_iter()
            .map(Into::into)
            .filter(|s: &String| !s.is_empty())
            .collect();
        self
    }

    pub fn target_size(&self) -> usize {
        self.target_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split text into ordered, overlapping chunks
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        if char_len(text) <= self.target_size {
            return vec![Chunk {
                index: 0,
                text: text.to_string(),
                start: 0,
                core_start: 0,
                end: text.len(),
            }];
        }

        // Every piece must fit in a chunk that also carries the overlap prefix
        let piece_limit = self.target_size - self.overlap;
        let mut pieces = Vec::new();
        self.collect_pieces(text, 0, 0, piece_limit, &mut pieces);

        self.merge(text, pieces)
    }

    /// Divide `text` on the separator at `level`, recursing into oversized pieces
    fn collect_pieces(
        &self,
        text: &str,
        offset: usize,
        level: usize,
        limit: usize,
        out: &mut Vec<Range<usize>>,
    ) {
        let Some(separator) = self.separators.get(level) else {
            split_by_chars(text, offset, limit, out);
            return;
        };

        let mut pos = offset;
        for piece in text.split_inclusive(separator.as_str()) {
            if char_len(piece) <= limit {
                out.push(pos..pos + piece.len());
            } else {
                self.collect_pieces(piece, pos, level + 1, limit, out);
            }
            pos += piece.len();
        }
    }

    /// Greedily merge adjacent pieces, then attach overlap from the previous chunk
    fn merge(&self, text: &str, pieces: Vec<Range<usize>>) -> Vec<Chunk> {
        let core_budget = self.target_size - self.overlap;
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut current: Option<(Range<usize>, usize)> = None;

        for piece in pieces {
            let piece_chars = char_len(&text[piece.clone()]);
            // The first chunk carries no overlap and may use the full target size
            let budget = if chunks.is_empty() {
                self.target_size
            } else {
                core_budget
            };

            current = match current.take() {
                Some((range, chars)) if chars + piece_chars <= budget => {
                    Some((range.start..piece.end, chars + piece_chars))
                }
                Some((range, _)) => {
                    self.push_chunk(text, range, &mut chunks);
                    Some((piece, piece_chars))
                }
                None => Some((piece, piece_chars)),
            };
        }

        if let Some((range, _)) = current {
            self.push_chunk(text, range, &mut chunks);
        }

        chunks
    }

    fn push_chunk(&self, text: &str, core: Range<usize>, chunks: &mut Vec<Chunk>) {
        let start = match chunks.last() {
            Some(prev) => {
                let shared = self.overlap.min(prev.char_len());
                back_by_chars(text, core.start, shared)
            }
            None => core.start,
        };

        chunks.push(Chunk {
            index: chunks.len(),
            text: text[start..core.end].to_string(),
            start,
            core_start: core.start,
            end: core.end,
        });
    }
}

/// Split text into chunks of at most `target_size` characters
pub fn split_text(text: &str, target_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    Ok(TextSplitter::new(target_size, overlap)?.split(text))
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Last-resort split into windows of `limit` characters
fn split_by_chars(text: &str, offset: usize, limit: usize, out: &mut Vec<Range<usize>>) {
    let mut window_start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == limit {
            out.push(offset + window_start..offset + idx);
            window_start = idx;
            count = 0;
        }
        count += 1;
    }
    if window_start < text.len() {
        out.push(offset + window_start..offset + text.len());
    }
}

/// Byte offset `n` characters before `pos`
fn back_by_chars(text: &str, pos: usize, n: usize) -> usize {
    if n == 0 {
        return pos;
    }
    text[..pos]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}
