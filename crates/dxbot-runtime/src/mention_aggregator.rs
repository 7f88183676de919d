//! Windowed scan of registered channels for threaded mentions of tracked people.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;

use crate::collaborators::{ChatHistory, ChatMessage};
use crate::tracked_persons::TrackedPersons;

const MAX_HISTORY_PAGES: usize = 1_000;

/// Person id to ordered, de-duplicated thread links.
pub type MentionMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionAggregation {
    pub mentions: MentionMap,
    pub channels_scanned: usize,
    pub channels_failed: Vec<String>,
}

impl MentionAggregation {
    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }
}

/// User ids referenced by `<@ID>` or `<@ID|label>` tokens, in text order.
pub fn extract_mention_ids(text: &str) -> Vec<&str> {
    let mut ids = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("<@") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('>') else {
            break;
        };
        let token = &after[..end];
        let id = token.split('|').next().unwrap_or_default();
        if !id.is_empty() && id.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            ids.push(id);
        }
        rest = &after[end + 1..];
    }
    ids
}

/// Tracked people mentioned in `text`. Matching is on whole ids, so `U1` does
/// not match a mention of `U12`.
pub fn mentioned_tracked_persons(text: &str, tracked: &TrackedPersons) -> Vec<String> {
    let mut seen = BTreeSet::new();
    extract_mention_ids(text)
        .into_iter()
        .filter(|id| tracked.contains(id))
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

/// Link to a thread derived from its root timestamp: `1700000000.123456`
/// becomes `.../p1700000000123456`.
pub fn thread_link(workspace_url: &str, channel: &str, thread_ts: &str) -> String {
    format!(
        "{}/archives/{channel}/p{}",
        workspace_url.trim_end_matches('/'),
        thread_ts.replace('.', "")
    )
}

/// Collects, per tracked person, links to threads in which they were mentioned
/// inside the window. Messages outside threads never contribute. A channel
/// whose history cannot be read is logged and skipped; links gathered from
/// its earlier pages are kept.
pub async fn aggregate_mentions(
    history: &dyn ChatHistory,
    channels: &BTreeSet<String>,
    tracked: &TrackedPersons,
    window_start_unix: u64,
    workspace_url: &str,
) -> MentionAggregation {
    let oldest = window_start_unix.to_string();
    let mut aggregation = MentionAggregation::default();

    for channel in channels {
        let mut messages = Vec::new();
        let outcome = read_window(history, channel, &oldest, &mut messages).await;
        if let Err(error) = outcome {
            tracing::warn!(
                channel = %channel,
                messages_read = messages.len(),
                error = %format!("{error:#}"),
                "history read failed; continuing with next channel"
            );
            aggregation.channels_failed.push(channel.clone());
        } else {
            aggregation.channels_scanned = aggregation.channels_scanned.saturating_add(1);
        }

        for message in &messages {
            let Some(thread_ts) = message.thread_ts.as_deref().filter(|ts| !ts.is_empty()) else {
                continue;
            };
            for person in mentioned_tracked_persons(&message.text, tracked) {
                let link = thread_link(workspace_url, channel, thread_ts);
                let links = aggregation.mentions.entry(person).or_default();
                if !links.contains(&link) {
                    links.push(link);
                }
            }
        }
    }

    tracing::info!(
        channels_scanned = aggregation.channels_scanned,
        channels_failed = aggregation.channels_failed.len(),
        people_mentioned = aggregation.mentions.len(),
        "mention aggregation finished"
    );
    aggregation
}

async fn read_window(
    history: &dyn ChatHistory,
    channel: &str,
    oldest: &str,
    messages: &mut Vec<ChatMessage>,
) -> Result<()> {
    let mut cursor: Option<String> = None;
    for _ in 0..MAX_HISTORY_PAGES {
        let page = history
            .history_page(channel, oldest, cursor.as_deref())
            .await?;
        let next = page.continuation().map(str::to_string);
        messages.extend(page.messages);
        match next {
            Some(next) if Some(&next) != cursor.as_ref() => cursor = Some(next),
            _ => return Ok(()),
        }
    }
    anyhow::bail!("history of {channel} did not terminate after {MAX_HISTORY_PAGES} pages")
}
