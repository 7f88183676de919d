//! Full workspace scan that derives the registry scope from channel membership.

use std::collections::BTreeSet;

use anyhow::{Context, Result};

use crate::collaborators::{ChannelSummary, ChatDirectory, MembershipLookup};
use crate::tracked_persons::TrackedPersons;

/// Upper bound on listing pages.
const MAX_LISTING_PAGES: usize = 10_000;

/// Walks `conversations.list` until the cursor runs out.
pub async fn list_all_channels(directory: &dyn ChatDirectory) -> Result<Vec<ChannelSummary>> {
    let mut channels = Vec::new();
    let mut cursor: Option<String> = None;
    for page_index in 0..MAX_LISTING_PAGES {
        let page = directory
            .list_channels_page(cursor.as_deref())
            .await
            .with_context(|| format!("failed to list channels (page {page_index})"))?;
        channels.extend(page.channels);
        match page.next_cursor.filter(|next| !next.is_empty()) {
            Some(next) if Some(&next) != cursor.as_ref() => cursor = Some(next),
            _ => return Ok(channels),
        }
    }
    anyhow::bail!("channel listing did not terminate after {MAX_LISTING_PAGES} pages")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyMember,
    Archived,
}

/// Joins `channel` unless it is archived or the bot is already a member.
pub async fn ensure_joined(directory: &dyn ChatDirectory, channel: &str) -> Result<JoinOutcome> {
    let info = directory
        .channel_info(channel)
        .await
        .with_context(|| format!("failed to read channel info for {channel}"))?;
    if info.is_archived {
        return Ok(JoinOutcome::Archived);
    }
    if info.is_member {
        return Ok(JoinOutcome::AlreadyMember);
    }
    directory
        .join_channel(channel)
        .await
        .with_context(|| format!("failed to join channel {channel}"))?;
    Ok(JoinOutcome::Joined)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeScan {
    pub channels: BTreeSet<String>,
    pub listed: usize,
    pub archived_skipped: usize,
    pub member_lookup_failures: usize,
    pub join_failures: usize,
}

/// Returns every non-archived channel containing at least one tracked person,
/// joining those the bot is not yet in. Per-channel failures skip that channel.
pub async fn scan_for_scope(
    directory: &dyn ChatDirectory,
    bot_user_id: &str,
    tracked: &TrackedPersons,
) -> Result<ScopeScan> {
    let listed = list_all_channels(directory).await?;
    let mut scan = ScopeScan {
        listed: listed.len(),
        ..ScopeScan::default()
    };

    for channel in listed {
        if channel.is_archived {
            scan.archived_skipped = scan.archived_skipped.saturating_add(1);
            continue;
        }

        let members = match directory.channel_members(&channel.id).await {
            Ok(MembershipLookup::Members(members)) => members,
            Ok(MembershipLookup::ChannelNotFound) => {
                tracing::debug!(channel = %channel.id, "channel vanished during scan");
                continue;
            }
            Err(error) => {
                scan.member_lookup_failures = scan.member_lookup_failures.saturating_add(1);
                tracing::warn!(
                    channel = %channel.id,
                    error = %format!("{error:#}"),
                    "member lookup failed; skipping channel"
                );
                continue;
            }
        };

        if !members.iter().any(|member| member == bot_user_id) {
            if let Err(error) = directory.join_channel(&channel.id).await {
                scan.join_failures = scan.join_failures.saturating_add(1);
                tracing::warn!(
                    channel = %channel.id,
                    error = %format!("{error:#}"),
                    "join failed; skipping channel"
                );
                continue;
            }
        }

        if tracked.any_present(&members) {
            scan.channels.insert(channel.id);
        }
    }

    tracing::info!(
        listed = scan.listed,
        in_scope = scan.channels.len(),
        archived_skipped = scan.archived_skipped,
        member_lookup_failures = scan.member_lookup_failures,
        join_failures = scan.join_failures,
        "membership scan finished"
    );
    Ok(scan)
}
