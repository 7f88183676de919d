use dxbot_core::transport_helpers::{
    is_retryable_status, is_retryable_transport_error, parse_retry_after, retry_delay,
    truncate_for_error,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use tokio::time::sleep;

use crate::prompt::{build_description_prompt, DESCRIPTION_SYSTEM_PROMPT};
use crate::SummarizerError;

#[derive(Debug, Clone)]
pub struct OpenAiSummarizerConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub request_timeout_ms: u64,
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone)]
/// Chat-completions client specialised for ticket descriptions.
pub struct OpenAiSummarizer {
    client: reqwest::Client,
    config: OpenAiSummarizerConfig,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    #[serde(default)]
    message: Option<ChatCompletionMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiSummarizer {
    pub fn new(config: OpenAiSummarizerConfig) -> Result<Self, SummarizerError> {
        if config.api_key.trim().is_empty() {
            return Err(SummarizerError::MissingApiKey);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = format!("Bearer {}", config.api_key.trim());
        let mut auth_value =
            HeaderValue::from_str(&bearer).map_err(|_| SummarizerError::InvalidApiKey)?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_millis(
                config.request_timeout_ms.max(1),
            ))
            .build()?;

        Ok(Self { client, config })
    }

    fn chat_completions_url(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            return base.to_string();
        }
        format!("{base}/chat/completions")
    }

    /// Produces a trimmed description of the discussion in `thread_context`.
    pub async fn summarize(&self, thread_context: &str) -> Result<String, SummarizerError> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": DESCRIPTION_SYSTEM_PROMPT },
                { "role": "user", "content": build_description_prompt(thread_context) },
            ],
            "max_tokens": self.config.max_tokens,
        });
        let url = self.chat_completions_url();
        let max_retries = self.config.max_retries;

        for attempt in 0..=max_retries {
            let response = self
                .client
                .post(&url)
                .header("x-dxbot-retry-attempt", attempt.to_string())
                .json(&body)
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let raw = response.text().await?;
                        return parse_completion_text(&raw);
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let raw = response.text().await.unwrap_or_default();
                    if attempt < max_retries && is_retryable_status(status.as_u16()) {
                        sleep(retry_delay(
                            self.config.retry_base_delay_ms,
                            attempt.saturating_add(1),
                            retry_after,
                        ))
                        .await;
                        continue;
                    }
                    return Err(SummarizerError::HttpStatus {
                        status: status.as_u16(),
                        body: truncate_for_error(&raw, 800),
                    });
                }
                Err(error) => {
                    if attempt < max_retries && is_retryable_transport_error(&error) {
                        sleep(retry_delay(
                            self.config.retry_base_delay_ms,
                            attempt.saturating_add(1),
                            None,
                        ))
                        .await;
                        continue;
                    }
                    return Err(SummarizerError::Http(error));
                }
            }
        }

        Err(SummarizerError::EmptyCompletion)
    }
}

fn parse_completion_text(raw: &str) -> Result<String, SummarizerError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(raw)?;
    let text = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .map(|content| content.trim().to_string())
        .unwrap_or_default();
    if text.is_empty() {
        return Err(SummarizerError::EmptyCompletion);
    }
    Ok(text)
}
