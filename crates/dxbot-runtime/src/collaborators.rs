//! Outbound seams of the bridge: chat directory, chat history, chat posting,
//! description summarizer and issue tracker.
//!
//! The runtime only talks to these traits. Production wiring lives in
//! `client_adapters`; tests substitute in-memory fakes.

use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSummary {
    pub id: String,
    pub is_archived: bool,
    /// `None` when the listing does not say whether the bot is in the channel.
    pub is_member: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelPage {
    pub channels: Vec<ChannelSummary>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelInfo {
    pub is_archived: bool,
    pub is_member: bool,
}

/// Result of a membership lookup. A channel that no longer exists is a
/// distinct answer, not a transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipLookup {
    Members(Vec<String>),
    ChannelNotFound,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatMessage {
    pub ts: String,
    pub text: String,
    pub user: Option<String>,
    pub thread_ts: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePage {
    pub messages: Vec<ChatMessage>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl MessagePage {
    /// Cursor for the following page, or `None` once the provider is exhausted.
    pub fn continuation(&self) -> Option<&str> {
        if !self.has_more {
            return None;
        }
        self.next_cursor.as_deref().filter(|cursor| !cursor.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub project_key: String,
    pub issue_type: String,
    pub summary: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueSummary {
    pub key: String,
    pub summary: String,
    pub url: String,
}

#[async_trait]
pub trait ChatDirectory: Send + Sync {
    async fn list_channels_page(&self, cursor: Option<&str>) -> Result<ChannelPage>;
    async fn channel_info(&self, channel: &str) -> Result<ChannelInfo>;
    async fn join_channel(&self, channel: &str) -> Result<()>;
    async fn channel_members(&self, channel: &str) -> Result<MembershipLookup>;
}

#[async_trait]
pub trait ChatHistory: Send + Sync {
    /// Messages at or after `oldest` (unix seconds, inclusive).
    async fn history_page(
        &self,
        channel: &str,
        oldest: &str,
        cursor: Option<&str>,
    ) -> Result<MessagePage>;
    /// Thread messages; the first page starts with the parent message.
    async fn thread_replies_page(
        &self,
        channel: &str,
        thread_ts: &str,
        cursor: Option<&str>,
    ) -> Result<MessagePage>;
    async fn permalink(&self, channel: &str, message_ts: &str) -> Result<String>;
}

#[async_trait]
pub trait ChatPosting: Send + Sync {
    async fn post_message(&self, channel: &str, text: &str, thread_ts: Option<&str>)
        -> Result<()>;
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, thread_context: &str) -> Result<String>;
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Creates the issue and returns its key.
    async fn create_issue(&self, issue: &NewIssue) -> Result<String>;
    fn issue_url(&self, key: &str) -> String;
    async fn search_issues(&self, jql: &str) -> Result<Vec<IssueSummary>>;
}
