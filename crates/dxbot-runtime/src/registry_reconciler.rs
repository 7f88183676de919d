//! Incremental registry maintenance: join new channels, then prune channels
//! that no longer contain a tracked person.

use crate::channel_registry::ChannelRegistry;
use crate::collaborators::{ChatDirectory, MembershipLookup};
use crate::membership_scanner::{ensure_joined, list_all_channels, JoinOutcome};
use crate::tracked_persons::TrackedPersons;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub joined: Vec<String>,
    pub pruned: Vec<String>,
    /// Channels kept because their membership could not be confirmed this cycle.
    pub unconfirmed: Vec<String>,
    pub join_failures: usize,
    pub listing_failed: bool,
    pub saved: bool,
}

/// Runs both reconcile steps against `registry` and persists the result.
///
/// Step one adds every non-archived channel missing from the registry after
/// the bot has joined it. Step two re-checks membership of every registered
/// channel: channels that vanished or hold no tracked person are removed;
/// channels whose lookup failed are kept.
pub async fn reconcile(
    directory: &dyn ChatDirectory,
    registry: &mut ChannelRegistry,
    tracked: &TrackedPersons,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    match list_all_channels(directory).await {
        Ok(listed) => {
            for channel in listed {
                if channel.is_archived || registry.contains(&channel.id) {
                    continue;
                }
                let joined = match channel.is_member {
                    Some(true) => Ok(()),
                    Some(false) => directory.join_channel(&channel.id).await,
                    None => match ensure_joined(directory, &channel.id).await {
                        Ok(JoinOutcome::Archived) => continue,
                        Ok(JoinOutcome::Joined | JoinOutcome::AlreadyMember) => Ok(()),
                        Err(error) => Err(error),
                    },
                };
                match joined {
                    Ok(()) => {
                        registry.insert(channel.id.clone());
                        report.joined.push(channel.id);
                    }
                    Err(error) => {
                        report.join_failures = report.join_failures.saturating_add(1);
                        tracing::warn!(
                            channel = %channel.id,
                            error = %format!("{error:#}"),
                            "join during reconcile failed"
                        );
                    }
                }
            }
        }
        Err(error) => {
            report.listing_failed = true;
            tracing::warn!(
                error = %format!("{error:#}"),
                "channel listing failed; skipping join step"
            );
        }
    }

    let registered = registry.channels().iter().cloned().collect::<Vec<_>>();
    for channel in registered {
        match directory.channel_members(&channel).await {
            Ok(MembershipLookup::Members(members)) => {
                if !tracked.any_present(&members) {
                    registry.remove(&channel);
                    report.pruned.push(channel);
                }
            }
            Ok(MembershipLookup::ChannelNotFound) => {
                registry.remove(&channel);
                report.pruned.push(channel);
            }
            Err(error) => {
                tracing::warn!(
                    channel = %channel,
                    error = %format!("{error:#}"),
                    "member lookup failed; keeping channel"
                );
                report.unconfirmed.push(channel);
            }
        }
    }

    report.saved = registry.save_or_warn();
    tracing::info!(
        joined = report.joined.len(),
        pruned = report.pruned.len(),
        unconfirmed = report.unconfirmed.len(),
        registry_size = registry.len(),
        "registry reconcile finished"
    );
    report
}
