//! Channel registry maintenance, mention digests and thread-to-ticket flow.

pub mod bridge_config;
pub mod bridge_service;
pub mod channel_registry;
pub mod client_adapters;
pub mod collaborators;
pub mod digest_rendering;
pub mod event_dedup;
pub mod maintenance_job;
pub mod maintenance_scheduler;
pub mod membership_scanner;
pub mod mention_aggregator;
pub mod registry_reconciler;
pub mod ticket_orchestrator;
pub mod tracked_persons;

pub use bridge_config::{BridgeCollaborators, BridgeConfig, REGISTRY_FILE_NAME};
pub use bridge_service::BridgeService;
pub use channel_registry::ChannelRegistry;
pub use collaborators::{
    ChannelInfo, ChannelPage, ChannelSummary, ChatDirectory, ChatHistory, ChatMessage,
    ChatPosting, IssueSummary, IssueTracker, MembershipLookup, MessagePage, NewIssue, Summarizer,
};
pub use event_dedup::EventDedupGuard;
pub use maintenance_job::{MaintenanceJob, MaintenanceOutcome, MaintenanceReport};
pub use maintenance_scheduler::{
    start_maintenance_scheduler, MaintenanceSchedule, MaintenanceSchedulerHandle,
};
pub use membership_scanner::{ensure_joined, list_all_channels, scan_for_scope, JoinOutcome};
pub use mention_aggregator::{aggregate_mentions, MentionAggregation, MentionMap};
pub use registry_reconciler::{reconcile, ReconcileReport};
pub use ticket_orchestrator::{
    TicketOrchestrator, TicketOrchestratorConfig, TicketStage, TriggerEvent, TriggerOutcome,
    TICKET_FAILURE_NOTICE,
};
pub use tracked_persons::TrackedPersons;

#[cfg(test)]
mod test_support;
