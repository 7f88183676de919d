use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;

use crate::bridge_config::{BridgeCollaborators, BridgeConfig};
use crate::maintenance_job::{MaintenanceJob, MaintenanceOutcome};
use crate::ticket_orchestrator::{
    TicketOrchestrator, TicketOrchestratorConfig, TriggerEvent, TriggerOutcome,
};

/// Long-lived service shared by the event endpoint and the scheduler.
pub struct BridgeService {
    orchestrator: TicketOrchestrator,
    maintenance: Arc<MaintenanceJob>,
}

impl BridgeService {
    pub fn new(config: BridgeConfig, collaborators: BridgeCollaborators) -> Self {
        let config = Arc::new(config);
        let orchestrator = TicketOrchestrator::new(
            TicketOrchestratorConfig {
                bot_user_id: config.bot_user_id.clone(),
                trigger_phrase: config.trigger_phrase.clone(),
                project_key: config.project_key.clone(),
                issue_type: config.issue_type.clone(),
            },
            Arc::clone(&collaborators.history),
            Arc::clone(&collaborators.posting),
            Arc::clone(&collaborators.summarizer),
            Arc::clone(&collaborators.tracker),
        );
        let maintenance = Arc::new(MaintenanceJob::new(config, collaborators));
        Self {
            orchestrator,
            maintenance,
        }
    }

    pub fn maintenance_job(&self) -> Arc<MaintenanceJob> {
        Arc::clone(&self.maintenance)
    }

    pub fn orchestrator(&self) -> &TicketOrchestrator {
        &self.orchestrator
    }

    pub async fn handle_event(&self, event: &TriggerEvent) -> TriggerOutcome {
        self.orchestrator.handle_trigger(event).await
    }

    pub async fn initialize_registry(&self) -> Result<usize> {
        self.maintenance.initialize_registry().await
    }

    /// Spawns the bootstrap scan. Maintenance cycles are skipped while it holds
    /// the registry.
    pub fn spawn_registry_bootstrap(self: &Arc<Self>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(error) = service.initialize_registry().await {
                tracing::warn!(
                    error = %format!("{error:#}"),
                    "registry bootstrap scan failed; next maintenance cycle will add channels"
                );
            }
        })
    }

    pub async fn run_maintenance_cycle(&self) -> Result<MaintenanceOutcome> {
        self.maintenance.run_cycle().await
    }
}
