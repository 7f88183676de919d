use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::maintenance_job::{MaintenanceJob, MaintenanceOutcome};

/// Cron expression (seconds field first) evaluated in a fixed timezone.
#[derive(Debug, Clone)]
pub struct MaintenanceSchedule {
    expression: String,
    schedule: Schedule,
    timezone: Tz,
}

impl MaintenanceSchedule {
    pub fn parse(expression: &str, timezone: &str) -> Result<Self> {
        let schedule = Schedule::from_str(expression.trim())
            .with_context(|| format!("invalid cron expression '{expression}'"))?;
        let timezone: Tz = timezone
            .trim()
            .parse()
            .map_err(|error| anyhow!("invalid timezone '{timezone}': {error}"))?;
        Ok(Self {
            expression: expression.trim().to_string(),
            schedule,
            timezone,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// First occurrence strictly after `from`.
    pub fn next_after(&self, from: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let local = from.with_timezone(&self.timezone);
        self.schedule
            .after(&local)
            .next()
            .map(|next| next.with_timezone(&Utc))
            .ok_or_else(|| {
                anyhow!(
                    "cron expression '{}' has no future occurrence",
                    self.expression
                )
            })
    }
}

pub struct MaintenanceSchedulerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl MaintenanceSchedulerHandle {
    pub async fn shutdown(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// Spawns the loop that fires `job` at every occurrence of `schedule`.
pub fn start_maintenance_scheduler(
    job: Arc<MaintenanceJob>,
    schedule: MaintenanceSchedule,
) -> MaintenanceSchedulerHandle {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        run_maintenance_loop(job, schedule, shutdown_rx).await;
    });
    MaintenanceSchedulerHandle {
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    }
}

async fn run_maintenance_loop(
    job: Arc<MaintenanceJob>,
    schedule: MaintenanceSchedule,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    tracing::info!(
        cron = %schedule.expression(),
        timezone = %schedule.timezone(),
        "maintenance scheduler started"
    );
    loop {
        let now = Utc::now();
        let next = match schedule.next_after(now) {
            Ok(next) => next,
            Err(error) => {
                tracing::error!(error = %format!("{error:#}"), "maintenance scheduler stopped");
                return;
            }
        };
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        tracing::debug!(next_run = %next, "maintenance cycle scheduled");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                match job.run_cycle().await {
                    Ok(MaintenanceOutcome::Completed(report)) => tracing::info!(
                        joined = report.reconcile.joined.len(),
                        pruned = report.reconcile.pruned.len(),
                        registry_size = report.registry_size,
                        people_mentioned = report.people_mentioned,
                        mention_digest_posted = report.mention_digest_posted,
                        board_digest_posted = report.board_digest_posted,
                        "maintenance cycle completed"
                    ),
                    Ok(MaintenanceOutcome::Skipped) => {
                        tracing::info!("maintenance cycle skipped; previous cycle still running");
                    }
                    Err(error) => {
                        tracing::error!(error = %format!("{error:#}"), "maintenance cycle failed");
                    }
                }
            }
            _ = &mut shutdown_rx => {
                tracing::info!("maintenance scheduler stopping");
                return;
            }
        }
    }
}
