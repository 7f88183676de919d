use std::path::PathBuf;
use std::sync::Arc;

use crate::collaborators::{ChatDirectory, ChatHistory, ChatPosting, IssueTracker, Summarizer};
use crate::tracked_persons::TrackedPersons;

pub const REGISTRY_FILE_NAME: &str = "channels.json";

/// Runtime settings shared by the ticket flow and the maintenance job.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub bot_user_id: String,
    pub tracked_persons: TrackedPersons,
    pub trigger_phrase: String,
    pub registry_path: PathBuf,
    pub workspace_url: String,
    pub digest_channel: String,
    pub project_key: String,
    pub issue_type: String,
    pub board_assignees: Vec<String>,
    pub mention_window_hours: u64,
}

/// Outbound collaborators, injected once at startup.
#[derive(Clone)]
pub struct BridgeCollaborators {
    pub directory: Arc<dyn ChatDirectory>,
    pub history: Arc<dyn ChatHistory>,
    pub posting: Arc<dyn ChatPosting>,
    pub summarizer: Arc<dyn Summarizer>,
    pub tracker: Arc<dyn IssueTracker>,
}
