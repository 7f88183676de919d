//! Turns an explicit in-thread request into a tracker issue.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::collaborators::{ChatHistory, ChatPosting, IssueTracker, NewIssue, Summarizer};
use crate::event_dedup::EventDedupGuard;

pub const TICKET_FAILURE_NOTICE: &str = "Failed to create Jira ticket. Please try again later.";
const MAX_REPLY_PAGES: usize = 200;

/// Chat event as delivered by the events API (`event` object of the envelope).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
}

impl TriggerEvent {
    pub fn dedup_key(&self) -> String {
        format!("{}:{}", self.channel, self.ts)
    }

    fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    fn thread_ts(&self) -> Option<&str> {
        self.thread_ts.as_deref().filter(|ts| !ts.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStage {
    ThreadContext,
    Description,
    Permalink,
    IssueCreation,
}

impl TicketStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ThreadContext => "thread_context",
            Self::Description => "description",
            Self::Permalink => "permalink",
            Self::IssueCreation => "issue_creation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The event did not meet the trigger conditions.
    Ignored,
    /// The event key was already handled.
    Duplicate,
    Created {
        issue_key: String,
        issue_url: String,
    },
    /// A stage failed after the event key was recorded; a failure notice went to the thread.
    Failed { stage: TicketStage, error: String },
}

#[derive(Debug, Clone)]
pub struct TicketOrchestratorConfig {
    pub bot_user_id: String,
    pub trigger_phrase: String,
    pub project_key: String,
    pub issue_type: String,
}

pub struct TicketOrchestrator {
    config: TicketOrchestratorConfig,
    history: Arc<dyn ChatHistory>,
    posting: Arc<dyn ChatPosting>,
    summarizer: Arc<dyn Summarizer>,
    tracker: Arc<dyn IssueTracker>,
    dedup: EventDedupGuard,
}

impl TicketOrchestrator {
    pub fn new(
        config: TicketOrchestratorConfig,
        history: Arc<dyn ChatHistory>,
        posting: Arc<dyn ChatPosting>,
        summarizer: Arc<dyn Summarizer>,
        tracker: Arc<dyn IssueTracker>,
    ) -> Self {
        Self {
            config,
            history,
            posting,
            summarizer,
            tracker,
            dedup: EventDedupGuard::new(),
        }
    }

    pub fn dedup_guard(&self) -> &EventDedupGuard {
        &self.dedup
    }

    /// Whether `event` asks for a ticket: a threaded message that mentions the
    /// bot and contains the trigger phrase (case-sensitive).
    pub fn is_trigger(&self, event: &TriggerEvent) -> bool {
        if !matches!(event.event_type.as_str(), "message" | "app_mention") {
            return false;
        }
        let text = event.text();
        if text.trim().is_empty() || event.channel.is_empty() || event.ts.is_empty() {
            return false;
        }
        let bot_mention = format!("<@{}>", self.config.bot_user_id);
        text.contains(&bot_mention)
            && event.thread_ts().is_some()
            && text.contains(self.config.trigger_phrase.as_str())
    }

    pub async fn handle_trigger(&self, event: &TriggerEvent) -> TriggerOutcome {
        if !self.is_trigger(event) {
            return TriggerOutcome::Ignored;
        }
        let key = event.dedup_key();
        if !self.dedup.should_process(&key) {
            tracing::debug!(event_key = %key, "duplicate trigger ignored");
            return TriggerOutcome::Duplicate;
        }
        let Some(thread_ts) = event.thread_ts() else {
            return TriggerOutcome::Ignored;
        };

        match self.create_ticket(event, thread_ts).await {
            Ok((issue_key, issue_url)) => {
                let text = format!("Jira ticket created: <{issue_url}|{issue_key}>");
                if let Err(error) = self
                    .posting
                    .post_message(&event.channel, &text, Some(thread_ts))
                    .await
                {
                    tracing::warn!(
                        event_key = %key,
                        issue_key = %issue_key,
                        error = %format!("{error:#}"),
                        "ticket created but confirmation post failed"
                    );
                }
                tracing::info!(event_key = %key, issue_key = %issue_key, "ticket created");
                TriggerOutcome::Created {
                    issue_key,
                    issue_url,
                }
            }
            Err((stage, error)) => {
                let error = format!("{error:#}");
                tracing::warn!(
                    event_key = %key,
                    stage = stage.as_str(),
                    error = %error,
                    "ticket creation failed"
                );
                if let Err(post_error) = self
                    .posting
                    .post_message(&event.channel, TICKET_FAILURE_NOTICE, Some(thread_ts))
                    .await
                {
                    tracing::warn!(
                        event_key = %key,
                        error = %format!("{post_error:#}"),
                        "failure notice post failed"
                    );
                }
                TriggerOutcome::Failed { stage, error }
            }
        }
    }

    async fn create_ticket(
        &self,
        event: &TriggerEvent,
        thread_ts: &str,
    ) -> std::result::Result<(String, String), (TicketStage, anyhow::Error)> {
        let context = fetch_thread_context(self.history.as_ref(), &event.channel, thread_ts)
            .await
            .map_err(|error| (TicketStage::ThreadContext, error))?;
        let description = self
            .summarizer
            .summarize(&context)
            .await
            .and_then(|text| {
                let text = text.trim().to_string();
                if text.is_empty() {
                    bail!("summarizer returned an empty description");
                }
                Ok(text)
            })
            .map_err(|error| (TicketStage::Description, error))?;
        let permalink = self
            .history
            .permalink(&event.channel, thread_ts)
            .await
            .map_err(|error| (TicketStage::Permalink, error))?;

        let reporter = event.user.as_deref().unwrap_or("unknown user");
        let issue = NewIssue {
            project_key: self.config.project_key.clone(),
            issue_type: self.config.issue_type.clone(),
            summary: format!("Ticket created for message from {reporter}"),
            description: format!("{description}\n\nSlack Thread: {permalink}"),
        };
        let issue_key = self
            .tracker
            .create_issue(&issue)
            .await
            .map_err(|error| (TicketStage::IssueCreation, error))?;
        let issue_url = self.tracker.issue_url(&issue_key);
        Ok((issue_key, issue_url))
    }
}

/// Texts of every message in the thread, parent first, joined by newlines.
pub async fn fetch_thread_context(
    history: &dyn ChatHistory,
    channel: &str,
    thread_ts: &str,
) -> Result<String> {
    let mut texts = Vec::new();
    let mut cursor: Option<String> = None;
    for _ in 0..MAX_REPLY_PAGES {
        let page = history
            .thread_replies_page(channel, thread_ts, cursor.as_deref())
            .await
            .with_context(|| format!("failed to read thread {channel}/{thread_ts}"))?;
        let next = page.continuation().map(str::to_string);
        texts.extend(
            page.messages
                .into_iter()
                .map(|message| message.text)
                .filter(|text| !text.trim().is_empty()),
        );
        match next {
            Some(next) if Some(&next) != cursor.as_ref() => cursor = Some(next),
            _ => return Ok(texts.join("\n")),
        }
    }
    bail!("thread {channel}/{thread_ts} did not terminate after {MAX_REPLY_PAGES} pages")
}
