//! Slack Web API client helpers used by the registry jobs and the ticket flow.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use dxbot_core::transport_helpers::{
    is_retryable_status, is_retryable_transport_error, parse_retry_after, retry_delay,
    truncate_for_error,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::slack_types::{
    AuthTestBody, ChannelInfoBody, ChannelListBody, EmptyBody, MembersBody, MessagesBody,
    PermalinkBody, PostMessageBody, SlackChannel, SlackChannelPage, SlackEnvelope,
    SlackMessagePage, SlackPostedMessage,
};

const CHANNEL_PAGE_LIMIT: &str = "100";
const MEMBER_PAGE_LIMIT: &str = "200";
const CHANNEL_TYPES: &str = "public_channel,private_channel";

#[derive(Debug, Clone)]
pub struct SlackApiClientConfig {
    pub api_base: String,
    pub bot_token: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

#[derive(Clone)]
pub struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl SlackApiClient {
    pub fn new(config: SlackApiClientConfig) -> Result<Self> {
        if config.bot_token.trim().is_empty() {
            bail!("slack bot token cannot be empty");
        }
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("dxbot-slack"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .context("failed to create slack api client")?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.trim().to_string(),
            retry_max_attempts: config.retry_max_attempts.max(1),
            retry_base_delay_ms: config.retry_base_delay_ms.max(1),
        })
    }

    pub async fn resolve_bot_user_id(&self) -> Result<String> {
        let response: SlackEnvelope<AuthTestBody> = self
            .request_json("auth.test", || self.post("auth.test"))
            .await?;
        response
            .into_body("auth.test")?
            .user_id
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("slack auth.test did not return user_id"))
    }

    /// One page of `conversations.list` across public and private channels.
    pub async fn list_channels(&self, cursor: Option<&str>) -> Result<SlackChannelPage> {
        let response: SlackEnvelope<ChannelListBody> = self
            .request_json("conversations.list", || {
                let mut request = self.get("conversations.list").query(&[
                    ("limit", CHANNEL_PAGE_LIMIT),
                    ("types", CHANNEL_TYPES),
                ]);
                if let Some(cursor) = cursor {
                    request = request.query(&[("cursor", cursor)]);
                }
                request
            })
            .await?;
        let body = response.into_body("conversations.list")?;
        Ok(SlackChannelPage {
            channels: body.channels,
            next_cursor: body.response_metadata.cursor(),
        })
    }

    pub async fn channel_info(&self, channel: &str) -> Result<SlackChannel> {
        let response: SlackEnvelope<ChannelInfoBody> = self
            .request_json("conversations.info", || {
                self.get("conversations.info")
                    .query(&[("channel", channel)])
            })
            .await?;
        response
            .into_body("conversations.info")?
            .channel
            .ok_or_else(|| anyhow!("slack conversations.info response missing channel"))
    }

    pub async fn join_channel(&self, channel: &str) -> Result<()> {
        let payload = json!({ "channel": channel });
        let response: SlackEnvelope<EmptyBody> = self
            .request_json("conversations.join", || {
                self.post("conversations.join").json(&payload)
            })
            .await?;
        response.into_body("conversations.join")?;
        Ok(())
    }

    /// Complete member list of a channel, following every cursor.
    pub async fn channel_members(&self, channel: &str) -> Result<Vec<String>> {
        let mut members = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page_cursor = cursor.clone();
            let response: SlackEnvelope<MembersBody> = self
                .request_json("conversations.members", || {
                    let mut request = self
                        .get("conversations.members")
                        .query(&[("channel", channel), ("limit", MEMBER_PAGE_LIMIT)]);
                    if let Some(cursor) = page_cursor.as_deref() {
                        request = request.query(&[("cursor", cursor)]);
                    }
                    request
                })
                .await?;
            let body = response.into_body("conversations.members")?;
            members.extend(body.members);
            match body.response_metadata.cursor() {
                Some(next) if Some(&next) != cursor.as_ref() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(members)
    }

    /// One page of `conversations.history` with messages at or after `oldest`.
    pub async fn history(
        &self,
        channel: &str,
        oldest: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<SlackMessagePage> {
        let limit_value = limit.max(1).to_string();
        let response: SlackEnvelope<MessagesBody> = self
            .request_json("conversations.history", || {
                let mut request = self.get("conversations.history").query(&[
                    ("channel", channel),
                    ("oldest", oldest),
                    ("inclusive", "true"),
                    ("limit", limit_value.as_str()),
                ]);
                if let Some(cursor) = cursor {
                    request = request.query(&[("cursor", cursor)]);
                }
                request
            })
            .await?;
        Ok(message_page(response.into_body("conversations.history")?))
    }

    /// One page of `conversations.replies`; the first page starts with the parent.
    pub async fn replies(
        &self,
        channel: &str,
        thread_ts: &str,
        cursor: Option<&str>,
    ) -> Result<SlackMessagePage> {
        let response: SlackEnvelope<MessagesBody> = self
            .request_json("conversations.replies", || {
                let mut request = self
                    .get("conversations.replies")
                    .query(&[("channel", channel), ("ts", thread_ts)]);
                if let Some(cursor) = cursor {
                    request = request.query(&[("cursor", cursor)]);
                }
                request
            })
            .await?;
        Ok(message_page(response.into_body("conversations.replies")?))
    }

    pub async fn permalink(&self, channel: &str, message_ts: &str) -> Result<String> {
        let response: SlackEnvelope<PermalinkBody> = self
            .request_json("chat.getPermalink", || {
                self.get("chat.getPermalink")
                    .query(&[("channel", channel), ("message_ts", message_ts)])
            })
            .await?;
        response
            .into_body("chat.getPermalink")?
            .permalink
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("slack chat.getPermalink did not return permalink"))
    }

    pub async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<SlackPostedMessage> {
        let mut payload = json!({
            "channel": channel,
            "text": text,
            "unfurl_links": false,
            "unfurl_media": false,
        });
        if let Some(thread_ts) = thread_ts {
            payload["thread_ts"] = Value::String(thread_ts.to_string());
        }

        let response: SlackEnvelope<PostMessageBody> = self
            .request_json("chat.postMessage", || {
                self.post("chat.postMessage").json(&payload)
            })
            .await?;
        let body = response.into_body("chat.postMessage")?;
        Ok(SlackPostedMessage {
            channel: body.channel.unwrap_or_else(|| channel.to_string()),
            ts: body
                .ts
                .ok_or_else(|| anyhow!("slack chat.postMessage response missing ts"))?,
        })
    }

    fn get(&self, method: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}/{method}", self.api_base))
            .bearer_auth(&self.bot_token)
    }

    fn post(&self, method: &str) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}/{method}", self.api_base))
            .bearer_auth(&self.bot_token)
    }

    async fn request_json<T, F>(&self, operation: &str, mut builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = builder()
                .header("x-dxbot-retry-attempt", attempt.saturating_sub(1).to_string())
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed = response
                            .json::<T>()
                            .await
                            .with_context(|| format!("failed to decode slack {operation}"))?;
                        return Ok(parsed);
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts && is_retryable_status(status.as_u16()) {
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }

                    bail!(
                        "slack api {operation} failed with status {}: {}",
                        status.as_u16(),
                        truncate_for_error(&body, 800)
                    );
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("slack api {operation} request failed"));
                }
            }
        }
    }
}

fn message_page(body: MessagesBody) -> SlackMessagePage {
    SlackMessagePage {
        messages: body.messages,
        next_cursor: body.response_metadata.cursor(),
        has_more: body.has_more,
    }
}
