use std::path::PathBuf;

use clap::Parser;

const DEFAULT_TRACKED_PERSONS: &[&str] = &[
    "U05RH3FBPTQ",
    "U07PVEA7J5A",
    "ULUGFQTC2",
    "U06MR2TUSJY",
    "U041G2SCBQS",
    "U07A1UKJA30",
    "U07GKDFDHL5",
];

fn default_tracked_persons() -> Vec<String> {
    DEFAULT_TRACKED_PERSONS
        .iter()
        .map(|id| id.to_string())
        .collect()
}

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "dxbot",
    about = "Slack to Jira bridge with channel registry maintenance and mention digests",
    version
)]
pub struct Cli {
    #[arg(
        long = "bind",
        env = "DXBOT_BIND",
        default_value = "0.0.0.0:3000",
        help = "HTTP listen address for the Slack events endpoint"
    )]
    pub bind: String,

    #[arg(
        long = "state-dir",
        env = "DXBOT_STATE_DIR",
        default_value = ".dxbot",
        help = "Directory holding the persisted channel registry"
    )]
    pub state_dir: PathBuf,

    #[arg(
        long = "slack-bot-token",
        env = "SLACK_BOT_TOKEN",
        hide_env_values = true,
        help = "Slack bot token for Web API (xoxb-...)"
    )]
    pub slack_bot_token: Option<String>,

    #[arg(
        long = "slack-bot-user-id",
        env = "BOT_USER_ID",
        help = "Bot user id; resolved with auth.test when omitted"
    )]
    pub slack_bot_user_id: Option<String>,

    #[arg(
        long = "slack-api-base",
        env = "DXBOT_SLACK_API_BASE",
        default_value = "https://slack.com/api",
        help = "Slack Web API base URL"
    )]
    pub slack_api_base: String,

    #[arg(
        long = "slack-workspace-url",
        env = "DXBOT_SLACK_WORKSPACE_URL",
        default_value = "https://yourworkspace.slack.com",
        help = "Workspace URL used to build thread links in the mention digest"
    )]
    pub slack_workspace_url: String,

    #[arg(
        long = "digest-channel",
        env = "SLACK_PRIVATE_CHANNEL_ID",
        help = "Channel receiving the mention and board digests"
    )]
    pub digest_channel: Option<String>,

    #[arg(
        long = "tracked-person",
        env = "DXBOT_TRACKED_PERSONS",
        value_delimiter = ',',
        default_values_t = default_tracked_persons(),
        help = "Slack user ids whose channel presence defines the registry scope"
    )]
    pub tracked_persons: Vec<String>,

    #[arg(
        long = "trigger-phrase",
        env = "DXBOT_TRIGGER_PHRASE",
        default_value = "create ticket",
        help = "Case-sensitive phrase that requests a ticket"
    )]
    pub trigger_phrase: String,

    #[arg(
        long = "jira-base-url",
        env = "JIRA_HOST",
        help = "Jira site host or URL"
    )]
    pub jira_base_url: Option<String>,

    #[arg(long = "jira-email", env = "JIRA_EMAIL", help = "Jira account email")]
    pub jira_email: Option<String>,

    #[arg(
        long = "jira-api-token",
        env = "JIRA_API_TOKEN",
        hide_env_values = true,
        help = "Jira API token"
    )]
    pub jira_api_token: Option<String>,

    #[arg(
        long = "jira-project",
        env = "DXBOT_JIRA_PROJECT",
        default_value = "DX",
        help = "Project key of created issues"
    )]
    pub jira_project: String,

    #[arg(
        long = "jira-issue-type",
        env = "DXBOT_JIRA_ISSUE_TYPE",
        default_value = "Task",
        help = "Issue type of created issues"
    )]
    pub jira_issue_type: String,

    #[arg(
        long = "board-assignee",
        env = "DXBOT_BOARD_ASSIGNEES",
        value_delimiter = ',',
        help = "Assignee emails listed in the board digest"
    )]
    pub board_assignees: Vec<String>,

    #[arg(
        long = "openai-api-base",
        env = "DXBOT_OPENAI_API_BASE",
        default_value = "https://api.openai.com/v1",
        help = "OpenAI-compatible API base URL"
    )]
    pub openai_api_base: String,

    #[arg(
        long = "openai-api-key",
        env = "OPENAI_API_KEY",
        hide_env_values = true,
        help = "API key for ticket description generation"
    )]
    pub openai_api_key: Option<String>,

    #[arg(
        long = "openai-model",
        env = "DXBOT_OPENAI_MODEL",
        default_value = "gpt-3.5-turbo",
        help = "Model used for ticket descriptions"
    )]
    pub openai_model: String,

    #[arg(
        long = "maintenance-cron",
        env = "DXBOT_MAINTENANCE_CRON",
        default_value = "0 22 14 * * *",
        help = "Cron expression (seconds first) of the daily maintenance job"
    )]
    pub maintenance_cron: String,

    #[arg(
        long = "maintenance-timezone",
        env = "DXBOT_MAINTENANCE_TIMEZONE",
        default_value = "UTC",
        help = "IANA timezone the maintenance cron is evaluated in"
    )]
    pub maintenance_timezone: String,

    #[arg(
        long = "mention-window-hours",
        env = "DXBOT_MENTION_WINDOW_HOURS",
        default_value_t = 24,
        value_parser = parse_positive_u64,
        help = "Trailing window scanned for mentions"
    )]
    pub mention_window_hours: u64,

    #[arg(
        long = "request-timeout-ms",
        env = "DXBOT_REQUEST_TIMEOUT_MS",
        default_value_t = 15_000,
        value_parser = parse_positive_u64,
        help = "Timeout for every outbound HTTP request"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "DXBOT_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize,
        help = "Attempts per outbound call on 429, 5xx or transport errors"
    )]
    pub retry_max_attempts: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "DXBOT_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        value_parser = parse_positive_u64,
        help = "Base delay of the exponential retry backoff"
    )]
    pub retry_base_delay_ms: u64,

    #[arg(
        long = "run-maintenance-once",
        env = "DXBOT_RUN_MAINTENANCE_ONCE",
        default_value_t = false,
        help = "Run one maintenance cycle and exit"
    )]
    pub run_maintenance_once: bool,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, DEFAULT_TRACKED_PERSONS};

    #[test]
    fn unit_defaults_match_documented_values() {
        let cli = Cli::try_parse_from(["dxbot"]).expect("parse");
        assert_eq!(cli.bind, "0.0.0.0:3000");
        assert_eq!(cli.trigger_phrase, "create ticket");
        assert_eq!(cli.jira_project, "DX");
        assert_eq!(cli.jira_issue_type, "Task");
        assert_eq!(cli.maintenance_cron, "0 22 14 * * *");
        assert_eq!(cli.mention_window_hours, 24);
        assert_eq!(cli.tracked_persons.len(), DEFAULT_TRACKED_PERSONS.len());
        assert!(cli.board_assignees.is_empty());
        assert!(!cli.run_maintenance_once);
    }

    #[test]
    fn functional_comma_separated_lists_and_flags_parse() {
        let cli = Cli::try_parse_from([
            "dxbot",
            "--tracked-person",
            "U1,U2",
            "--board-assignee",
            "dev@example.com,ops@example.com",
            "--run-maintenance-once",
        ])
        .expect("parse");
        assert_eq!(cli.tracked_persons, vec!["U1", "U2"]);
        assert_eq!(cli.board_assignees.len(), 2);
        assert!(cli.run_maintenance_once);
    }

    #[test]
    fn regression_zero_retry_attempts_is_rejected() {
        assert!(Cli::try_parse_from(["dxbot", "--retry-max-attempts", "0"]).is_err());
    }
}
