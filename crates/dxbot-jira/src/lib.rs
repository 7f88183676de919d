//! Jira REST client used by dxbot to file tickets and build the board digest.

pub mod jira_api_client;

pub use jira_api_client::{
    normalize_jira_base_url, JiraApiClient, JiraApiClientConfig, JiraCreatedIssue,
    JiraIssueDraft, JiraIssueSummary,
};
