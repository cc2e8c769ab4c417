//! Prompt templates for summarization

/// Placeholder substituted with the text to summarize
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Instruction framing with exactly one `{text}` placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptSpec {
    pub name: &'static str,
    pub template: &'static str,
}

impl PromptSpec {
    pub const fn new(name: &'static str, template: &'static str) -> Self {
        Self { name, template }
    }

    /// Substitute the placeholder with `text`
    pub fn render(&self, text: &str) -> String {
        self.template.replacen(TEXT_PLACEHOLDER, text, 1)
    }

    pub fn placeholder_count(&self) -> usize {
        self.template.matches(TEXT_PLACEHOLDER).count()
    }
}

/// Prompt for chunk summarization (map step)
pub const MAP_PROMPT: PromptSpec = PromptSpec::new(
    "map",
    "<s>[INST] Please provide a concise summary of the following text:

{text}

Focus on the main points and key ideas. [/INST]</s>",
);

/// Prompt for combining partial summaries (reduce step)
pub const COMBINE_PROMPT: PromptSpec = PromptSpec::new(
    "combine",
    "<s>[INST] The following are summaries of consecutive parts of one document, in order. \
Combine them into a single concise summary of the whole document:

{text}

Focus on the main points and key ideas, remove repetition, and keep the original order. [/INST]</s>",
);
