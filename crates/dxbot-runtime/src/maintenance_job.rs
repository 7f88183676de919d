//! Periodic registry maintenance and digest delivery.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{bail, Result};
use dxbot_core::current_unix_timestamp;
use tokio::sync::Mutex;

use crate::bridge_config::{BridgeCollaborators, BridgeConfig};
use crate::channel_registry::ChannelRegistry;
use crate::digest_rendering::{
    board_jql, render_board_digest, render_mention_digest, AssigneeIssues,
};
use crate::membership_scanner::scan_for_scope;
use crate::mention_aggregator::aggregate_mentions;
use crate::registry_reconciler::{reconcile, ReconcileReport};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub reconcile: ReconcileReport,
    pub registry_size: usize,
    pub people_mentioned: usize,
    pub history_failures: usize,
    pub mention_digest_posted: bool,
    pub board_digest_posted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaintenanceOutcome {
    Completed(MaintenanceReport),
    /// Another cycle held the registry.
    Skipped,
}

/// Owns the channel registry. The registry lock is also the cycle lock, so
/// two cycles never mutate it concurrently.
pub struct MaintenanceJob {
    config: Arc<BridgeConfig>,
    collaborators: BridgeCollaborators,
    registry: Mutex<ChannelRegistry>,
}

impl MaintenanceJob {
    pub fn new(config: Arc<BridgeConfig>, collaborators: BridgeCollaborators) -> Self {
        let registry = ChannelRegistry::load(config.registry_path.clone());
        Self {
            config,
            collaborators,
            registry: Mutex::new(registry),
        }
    }

    pub async fn registered_channels(&self) -> BTreeSet<String> {
        self.registry.lock().await.channels().clone()
    }

    #[cfg(test)]
    pub(crate) async fn registry_lock_for_test(
        &self,
    ) -> tokio::sync::MutexGuard<'_, ChannelRegistry> {
        self.registry.lock().await
    }

    /// Populates an empty registry from a full membership scan. A registry
    /// that already holds channels is left untouched.
    pub async fn initialize_registry(&self) -> Result<usize> {
        let mut registry = self.registry.lock().await;
        if !registry.is_empty() {
            tracing::info!(channels = registry.len(), "channel registry loaded");
            return Ok(registry.len());
        }
        let scan = scan_for_scope(
            self.collaborators.directory.as_ref(),
            &self.config.bot_user_id,
            &self.config.tracked_persons,
        )
        .await?;
        registry.replace(scan.channels);
        registry.save_or_warn();
        tracing::info!(channels = registry.len(), "channel registry bootstrapped");
        Ok(registry.len())
    }

    /// Reconcile, aggregate, then post both digests. Returns `Skipped` when a
    /// cycle is already running and an error when a digest could not be posted.
    pub async fn run_cycle(&self) -> Result<MaintenanceOutcome> {
        let Ok(mut registry) = self.registry.try_lock() else {
            tracing::info!("maintenance cycle already in flight; skipping");
            return Ok(MaintenanceOutcome::Skipped);
        };
        let started_unix = current_unix_timestamp();

        let reconcile_report = reconcile(
            self.collaborators.directory.as_ref(),
            &mut registry,
            &self.config.tracked_persons,
        )
        .await;
        let channels = registry.channels().clone();

        let window_seconds = self.config.mention_window_hours.saturating_mul(3_600);
        let aggregation = aggregate_mentions(
            self.collaborators.history.as_ref(),
            &channels,
            &self.config.tracked_persons,
            started_unix.saturating_sub(window_seconds),
            &self.config.workspace_url,
        )
        .await;

        let mut delivery_errors = Vec::new();
        let mut mention_digest_posted = false;
        if let Some(text) =
            render_mention_digest(&aggregation.mentions, self.config.mention_window_hours)
        {
            match self
                .collaborators
                .posting
                .post_message(&self.config.digest_channel, &text, None)
                .await
            {
                Ok(()) => mention_digest_posted = true,
                Err(error) => delivery_errors.push(format!("mention digest: {error:#}")),
            }
        }

        let mut board_digest_posted = false;
        if let Some(text) = self.build_board_digest().await {
            match self
                .collaborators
                .posting
                .post_message(&self.config.digest_channel, &text, None)
                .await
            {
                Ok(()) => board_digest_posted = true,
                Err(error) => delivery_errors.push(format!("board digest: {error:#}")),
            }
        }

        if !delivery_errors.is_empty() {
            bail!(
                "maintenance digest delivery failed: {}",
                delivery_errors.join("; ")
            );
        }

        Ok(MaintenanceOutcome::Completed(MaintenanceReport {
            reconcile: reconcile_report,
            registry_size: channels.len(),
            people_mentioned: aggregation.mentions.len(),
            history_failures: aggregation.channels_failed.len(),
            mention_digest_posted,
            board_digest_posted,
        }))
    }

    async fn build_board_digest(&self) -> Option<String> {
        if self.config.board_assignees.is_empty() {
            return None;
        }
        let mut sections = Vec::with_capacity(self.config.board_assignees.len());
        for assignee in &self.config.board_assignees {
            let jql = board_jql(&self.config.project_key, assignee);
            let issues = match self.collaborators.tracker.search_issues(&jql).await {
                Ok(issues) => issues,
                Err(error) => {
                    tracing::warn!(
                        assignee = %assignee,
                        error = %format!("{error:#}"),
                        "board search failed; rendering as empty"
                    );
                    Vec::new()
                }
            };
            sections.push(AssigneeIssues {
                assignee: assignee.clone(),
                issues,
            });
        }
        Some(render_board_digest(&self.config.project_key, &sections))
    }
}
