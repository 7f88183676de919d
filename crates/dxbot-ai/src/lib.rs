//! Language-model summarizer that turns a Slack thread into a ticket description.
mod openai;
mod prompt;
mod types;

pub use openai::{OpenAiSummarizer, OpenAiSummarizerConfig};
pub use prompt::{build_description_prompt, DESCRIPTION_SYSTEM_PROMPT};
pub use types::SummarizerError;
