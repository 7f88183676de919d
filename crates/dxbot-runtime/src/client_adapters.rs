//! Collaborator implementations backed by the HTTP clients.

use anyhow::Result;
use async_trait::async_trait;
use dxbot_ai::OpenAiSummarizer;
use dxbot_jira::{JiraApiClient, JiraIssueDraft};
use dxbot_slack::{SlackApiClient, SlackApiError, SlackMessage, SlackMessagePage};

use crate::collaborators::{
    ChannelInfo, ChannelPage, ChannelSummary, ChatDirectory, ChatHistory, ChatMessage,
    ChatPosting, IssueSummary, IssueTracker, MembershipLookup, MessagePage, NewIssue, Summarizer,
};

const HISTORY_PAGE_LIMIT: usize = 100;

#[async_trait]
impl ChatDirectory for SlackApiClient {
    async fn list_channels_page(&self, cursor: Option<&str>) -> Result<ChannelPage> {
        let page = SlackApiClient::list_channels(self, cursor).await?;
        Ok(ChannelPage {
            channels: page
                .channels
                .into_iter()
                .map(|channel| ChannelSummary {
                    id: channel.id,
                    is_archived: channel.is_archived,
                    is_member: channel.is_member,
                })
                .collect(),
            next_cursor: page.next_cursor,
        })
    }

    async fn channel_info(&self, channel: &str) -> Result<ChannelInfo> {
        let info = SlackApiClient::channel_info(self, channel).await?;
        Ok(ChannelInfo {
            is_archived: info.is_archived,
            is_member: info.is_member.unwrap_or(false),
        })
    }

    async fn join_channel(&self, channel: &str) -> Result<()> {
        SlackApiClient::join_channel(self, channel).await
    }

    async fn channel_members(&self, channel: &str) -> Result<MembershipLookup> {
        match SlackApiClient::channel_members(self, channel).await {
            Ok(members) => Ok(MembershipLookup::Members(members)),
            Err(error)
                if error
                    .downcast_ref::<SlackApiError>()
                    .is_some_and(SlackApiError::is_channel_not_found) =>
            {
                Ok(MembershipLookup::ChannelNotFound)
            }
            Err(error) => Err(error),
        }
    }
}

#[async_trait]
impl ChatHistory for SlackApiClient {
    async fn history_page(
        &self,
        channel: &str,
        oldest: &str,
        cursor: Option<&str>,
    ) -> Result<MessagePage> {
        SlackApiClient::history(self, channel, oldest, HISTORY_PAGE_LIMIT, cursor)
            .await
            .map(message_page)
    }

    async fn thread_replies_page(
        &self,
        channel: &str,
        thread_ts: &str,
        cursor: Option<&str>,
    ) -> Result<MessagePage> {
        SlackApiClient::replies(self, channel, thread_ts, cursor)
            .await
            .map(message_page)
    }

    async fn permalink(&self, channel: &str, message_ts: &str) -> Result<String> {
        SlackApiClient::permalink(self, channel, message_ts).await
    }
}

#[async_trait]
impl ChatPosting for SlackApiClient {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<()> {
        SlackApiClient::post_message(self, channel, text, thread_ts).await?;
        Ok(())
    }
}

fn message_page(page: SlackMessagePage) -> MessagePage {
    MessagePage {
        messages: page.messages.into_iter().map(chat_message).collect(),
        next_cursor: page.next_cursor,
        has_more: page.has_more,
    }
}

fn chat_message(message: SlackMessage) -> ChatMessage {
    ChatMessage {
        ts: message.ts,
        text: message.text,
        user: message.user,
        thread_ts: message.thread_ts,
    }
}

#[async_trait]
impl IssueTracker for JiraApiClient {
    async fn create_issue(&self, issue: &NewIssue) -> Result<String> {
        let created = JiraApiClient::create_issue(
            self,
            &JiraIssueDraft {
                project_key: issue.project_key.clone(),
                issue_type: issue.issue_type.clone(),
                summary: issue.summary.clone(),
                description: issue.description.clone(),
            },
        )
        .await?;
        Ok(created.key)
    }

    fn issue_url(&self, key: &str) -> String {
        JiraApiClient::issue_url(self, key)
    }

    async fn search_issues(&self, jql: &str) -> Result<Vec<IssueSummary>> {
        let rows = JiraApiClient::search_issues(self, jql).await?;
        Ok(rows
            .into_iter()
            .map(|row| IssueSummary {
                key: row.key,
                summary: row.summary,
                url: row.url,
            })
            .collect())
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, thread_context: &str) -> Result<String> {
        Ok(OpenAiSummarizer::summarize(self, thread_context).await?)
    }
}
