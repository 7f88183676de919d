use thiserror::Error;

#[derive(Debug, Error)]
/// Failures while generating a ticket description.
pub enum SummarizerError {
    #[error("missing API key")]
    MissingApiKey,
    #[error("API key is not a valid header value")]
    InvalidApiKey,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("provider returned an empty completion")]
    EmptyCompletion,
}
