use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Slack answered HTTP 200 with `ok: false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("slack {method} failed: {code}")]
pub struct SlackApiError {
    pub method: String,
    pub code: String,
}

impl SlackApiError {
    pub fn is_channel_not_found(&self) -> bool {
        self.code == "channel_not_found"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackChannel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_archived: bool,
    /// Absent when the provider does not report membership for this listing.
    #[serde(default)]
    pub is_member: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlackChannelPage {
    pub channels: Vec<SlackChannel>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackMessage {
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlackMessagePage {
    pub messages: Vec<SlackMessage>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackPostedMessage {
    pub channel: String,
    pub ts: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SlackResponseMetadata {
    #[serde(default)]
    pub(crate) next_cursor: Option<String>,
}

impl SlackResponseMetadata {
    /// Slack signals the last page with an empty cursor string.
    pub(crate) fn cursor(self) -> Option<String> {
        self.next_cursor
            .map(|cursor| cursor.trim().to_string())
            .filter(|cursor| !cursor.is_empty())
    }
}

/// Common `{ ok, error, ...body }` envelope of every Web API response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SlackEnvelope<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    body: T,
}

impl<T> SlackEnvelope<T> {
    pub(crate) fn into_body(self, method: &str) -> Result<T, SlackApiError> {
        if self.ok {
            return Ok(self.body);
        }
        Err(SlackApiError {
            method: method.to_string(),
            code: self.error.unwrap_or_else(|| "unknown_error".to_string()),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct AuthTestBody {
    pub(crate) user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ChannelListBody {
    pub(crate) channels: Vec<SlackChannel>,
    pub(crate) response_metadata: SlackResponseMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ChannelInfoBody {
    pub(crate) channel: Option<SlackChannel>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct EmptyBody {}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct MembersBody {
    pub(crate) members: Vec<String>,
    pub(crate) response_metadata: SlackResponseMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct MessagesBody {
    pub(crate) messages: Vec<SlackMessage>,
    pub(crate) has_more: bool,
    pub(crate) response_metadata: SlackResponseMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PermalinkBody {
    pub(crate) permalink: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PostMessageBody {
    pub(crate) channel: Option<String>,
    pub(crate) ts: Option<String>,
}
