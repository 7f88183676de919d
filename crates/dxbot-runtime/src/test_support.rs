use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::bridge_config::BridgeCollaborators;
use crate::collaborators::{
    ChannelInfo, ChannelPage, ChannelSummary, ChatDirectory, ChatHistory, ChatMessage,
    ChatPosting, IssueSummary, IssueTracker, MembershipLookup, MessagePage, NewIssue, Summarizer,
};

#[derive(Debug, Clone)]
pub(crate) enum MemberScript {
    Members(Vec<String>),
    NotFound,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PostedMessage {
    pub channel: String,
    pub text: String,
    pub thread_ts: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct FakeChatState {
    pub channels: Vec<ChannelSummary>,
    pub channel_page_size: usize,
    pub list_fails: bool,
    pub infos: HashMap<String, ChannelInfo>,
    pub members: HashMap<String, MemberScript>,
    pub join_fails: HashSet<String>,
    pub history: HashMap<String, Vec<ChatMessage>>,
    pub history_page_size: usize,
    pub history_fails: HashSet<String>,
    pub replies: HashMap<String, Vec<ChatMessage>>,
    pub replies_fail: bool,
    pub permalink_fails: bool,
    pub post_fails: bool,

    pub list_calls: Vec<Option<String>>,
    pub info_calls: Vec<String>,
    pub joined: Vec<String>,
    pub member_calls: Vec<String>,
    pub history_calls: Vec<(String, String, Option<String>)>,
    pub reply_calls: usize,
    pub posts: Vec<PostedMessage>,
}

#[derive(Default)]
pub(crate) struct FakeChat {
    state: Mutex<FakeChatState>,
}

impl FakeChat {
    pub(crate) fn new(state: FakeChatState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, FakeChatState> {
        self.state.lock().expect("fake chat lock")
    }
}

pub(crate) fn channel(id: &str) -> ChannelSummary {
    ChannelSummary {
        id: id.to_string(),
        is_archived: false,
        is_member: Some(true),
    }
}

pub(crate) fn archived(id: &str) -> ChannelSummary {
    ChannelSummary {
        id: id.to_string(),
        is_archived: true,
        is_member: Some(false),
    }
}

pub(crate) fn message(ts: &str, text: &str, thread_ts: Option<&str>) -> ChatMessage {
    ChatMessage {
        ts: ts.to_string(),
        text: text.to_string(),
        user: Some("U9".to_string()),
        thread_ts: thread_ts.map(str::to_string),
    }
}

pub(crate) fn members(ids: &[&str]) -> MemberScript {
    MemberScript::Members(ids.iter().map(|id| id.to_string()).collect())
}

fn paginate<T: Clone>(
    items: &[T],
    cursor: Option<&str>,
    page_size: usize,
) -> (Vec<T>, Option<String>) {
    let page_size = if page_size == 0 {
        items.len().max(1)
    } else {
        page_size
    };
    let start = cursor
        .and_then(|cursor| cursor.strip_prefix("offset:"))
        .and_then(|offset| offset.parse::<usize>().ok())
        .unwrap_or(0)
        .min(items.len());
    let end = start.saturating_add(page_size).min(items.len());
    let next = (end < items.len()).then(|| format!("offset:{end}"));
    (items[start..end].to_vec(), next)
}

#[async_trait]
impl ChatDirectory for FakeChat {
    async fn list_channels_page(&self, cursor: Option<&str>) -> Result<ChannelPage> {
        let mut state = self.state();
        state.list_calls.push(cursor.map(str::to_string));
        if state.list_fails {
            bail!("listing unavailable");
        }
        let (channels, next_cursor) = paginate(&state.channels, cursor, state.channel_page_size);
        Ok(ChannelPage {
            channels,
            next_cursor,
        })
    }

    async fn channel_info(&self, channel: &str) -> Result<ChannelInfo> {
        let mut state = self.state();
        state.info_calls.push(channel.to_string());
        state
            .infos
            .get(channel)
            .copied()
            .ok_or_else(|| anyhow!("no info for {channel}"))
    }

    async fn join_channel(&self, channel: &str) -> Result<()> {
        let mut state = self.state();
        if state.join_fails.contains(channel) {
            bail!("join refused for {channel}");
        }
        state.joined.push(channel.to_string());
        Ok(())
    }

    async fn channel_members(&self, channel: &str) -> Result<MembershipLookup> {
        let mut state = self.state();
        state.member_calls.push(channel.to_string());
        match state.members.get(channel) {
            Some(MemberScript::Members(members)) => Ok(MembershipLookup::Members(members.clone())),
            Some(MemberScript::NotFound) => Ok(MembershipLookup::ChannelNotFound),
            Some(MemberScript::Fail) | None => bail!("member lookup failed for {channel}"),
        }
    }
}

#[async_trait]
impl ChatHistory for FakeChat {
    async fn history_page(
        &self,
        channel: &str,
        oldest: &str,
        cursor: Option<&str>,
    ) -> Result<MessagePage> {
        let mut state = self.state();
        state.history_calls.push((
            channel.to_string(),
            oldest.to_string(),
            cursor.map(str::to_string),
        ));
        if state.history_fails.contains(channel) {
            bail!("history unavailable for {channel}");
        }
        let messages = state.history.get(channel).cloned().unwrap_or_default();
        let (messages, next_cursor) = paginate(&messages, cursor, state.history_page_size);
        Ok(MessagePage {
            messages,
            has_more: next_cursor.is_some(),
            next_cursor,
        })
    }

    async fn thread_replies_page(
        &self,
        _channel: &str,
        thread_ts: &str,
        cursor: Option<&str>,
    ) -> Result<MessagePage> {
        let mut state = self.state();
        state.reply_calls = state.reply_calls.saturating_add(1);
        if state.replies_fail {
            bail!("replies unavailable");
        }
        let messages = state.replies.get(thread_ts).cloned().unwrap_or_default();
        let (messages, next_cursor) = paginate(&messages, cursor, 2);
        Ok(MessagePage {
            messages,
            has_more: next_cursor.is_some(),
            next_cursor,
        })
    }

    async fn permalink(&self, channel: &str, message_ts: &str) -> Result<String> {
        if self.state().permalink_fails {
            bail!("permalink unavailable");
        }
        Ok(format!(
            "https://acme.slack.com/archives/{channel}/p{}",
            message_ts.replace('.', "")
        ))
    }
}

#[async_trait]
impl ChatPosting for FakeChat {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state();
        if state.post_fails {
            bail!("post rejected");
        }
        state.posts.push(PostedMessage {
            channel: channel.to_string(),
            text: text.to_string(),
            thread_ts: thread_ts.map(str::to_string),
        });
        Ok(())
    }
}

pub(crate) struct FakeSummarizer {
    reply: Result<String, String>,
    pub(crate) inputs: Mutex<Vec<String>>,
}

impl FakeSummarizer {
    pub(crate) fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            inputs: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn failing(error: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(error.to_string()),
            inputs: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, thread_context: &str) -> Result<String> {
        self.inputs
            .lock()
            .expect("summarizer lock")
            .push(thread_context.to_string());
        self.reply.clone().map_err(|error| anyhow!(error))
    }
}

#[derive(Default)]
pub(crate) struct FakeTracker {
    pub(crate) next_key: String,
    pub(crate) create_fails: bool,
    pub(crate) search_results: HashMap<String, Vec<IssueSummary>>,
    pub(crate) failing_searches: HashSet<String>,
    pub(crate) created: Mutex<Vec<NewIssue>>,
    pub(crate) searches: Mutex<Vec<String>>,
}

impl FakeTracker {
    pub(crate) fn with_key(key: &str) -> Self {
        Self {
            next_key: key.to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn created(&self) -> Vec<NewIssue> {
        self.created.lock().expect("tracker lock").clone()
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn create_issue(&self, issue: &NewIssue) -> Result<String> {
        if self.create_fails {
            bail!("tracker rejected issue");
        }
        self.created.lock().expect("tracker lock").push(issue.clone());
        Ok(self.next_key.clone())
    }

    fn issue_url(&self, key: &str) -> String {
        format!("https://acme.atlassian.net/browse/{key}")
    }

    async fn search_issues(&self, jql: &str) -> Result<Vec<IssueSummary>> {
        self.searches.lock().expect("tracker lock").push(jql.to_string());
        if self.failing_searches.contains(jql) {
            bail!("search failed");
        }
        Ok(self.search_results.get(jql).cloned().unwrap_or_default())
    }
}

pub(crate) fn collaborators(
    chat: &Arc<FakeChat>,
    summarizer: Arc<FakeSummarizer>,
    tracker: Arc<FakeTracker>,
) -> BridgeCollaborators {
    BridgeCollaborators {
        directory: chat.clone(),
        history: chat.clone(),
        posting: chat.clone(),
        summarizer,
        tracker,
    }
}
