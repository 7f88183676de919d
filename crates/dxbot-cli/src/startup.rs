use std::sync::Arc;

use anyhow::{bail, Context, Result};
use dxbot_ai::{OpenAiSummarizer, OpenAiSummarizerConfig};
use dxbot_gateway::{run_slack_events_server, SlackEventsServerConfig};
use dxbot_jira::{JiraApiClient, JiraApiClientConfig};
use dxbot_runtime::{
    start_maintenance_scheduler, BridgeCollaborators, BridgeConfig, BridgeService,
    MaintenanceOutcome, MaintenanceSchedule, TrackedPersons, REGISTRY_FILE_NAME,
};
use dxbot_slack::{SlackApiClient, SlackApiClientConfig};

use crate::cli_args::Cli;

const DESCRIPTION_MAX_TOKENS: u32 = 1_000;

fn required_setting(value: Option<&str>, flag: &str) -> Result<String> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => Ok(value.to_string()),
        None => bail!("{flag} is required"),
    }
}

fn non_empty_values(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

pub(crate) async fn run_cli(cli: Cli) -> Result<()> {
    let slack_bot_token = required_setting(cli.slack_bot_token.as_deref(), "--slack-bot-token")?;
    let digest_channel = required_setting(cli.digest_channel.as_deref(), "--digest-channel")?;
    let jira_base_url = required_setting(cli.jira_base_url.as_deref(), "--jira-base-url")?;
    let jira_email = required_setting(cli.jira_email.as_deref(), "--jira-email")?;
    let jira_api_token = required_setting(cli.jira_api_token.as_deref(), "--jira-api-token")?;
    let openai_api_key = required_setting(cli.openai_api_key.as_deref(), "--openai-api-key")?;
    let trigger_phrase = required_setting(Some(cli.trigger_phrase.as_str()), "--trigger-phrase")?;
    let tracked_persons = TrackedPersons::new(&cli.tracked_persons);
    if tracked_persons.is_empty() {
        bail!("--tracked-person must name at least one user id");
    }
    let schedule = MaintenanceSchedule::parse(&cli.maintenance_cron, &cli.maintenance_timezone)
        .context("invalid --maintenance-cron/--maintenance-timezone")?;

    let slack = Arc::new(SlackApiClient::new(SlackApiClientConfig {
        api_base: cli.slack_api_base.clone(),
        bot_token: slack_bot_token,
        request_timeout_ms: cli.request_timeout_ms,
        retry_max_attempts: cli.retry_max_attempts,
        retry_base_delay_ms: cli.retry_base_delay_ms,
    })?);
    let jira = Arc::new(JiraApiClient::new(JiraApiClientConfig {
        base_url: jira_base_url,
        email: jira_email,
        api_token: jira_api_token,
        request_timeout_ms: cli.request_timeout_ms,
        retry_max_attempts: cli.retry_max_attempts,
        retry_base_delay_ms: cli.retry_base_delay_ms,
    })?);
    let summarizer = Arc::new(
        OpenAiSummarizer::new(OpenAiSummarizerConfig {
            api_base: cli.openai_api_base.clone(),
            api_key: openai_api_key,
            model: cli.openai_model.clone(),
            max_tokens: DESCRIPTION_MAX_TOKENS,
            request_timeout_ms: cli.request_timeout_ms,
            max_retries: cli.retry_max_attempts.saturating_sub(1),
            retry_base_delay_ms: cli.retry_base_delay_ms,
        })
        .context("failed to create summarizer client")?,
    );

    let bot_user_id = match cli
        .slack_bot_user_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        Some(id) => id.to_string(),
        None => slack
            .resolve_bot_user_id()
            .await
            .context("failed to resolve bot user id; pass --slack-bot-user-id")?,
    };

    std::fs::create_dir_all(&cli.state_dir)
        .with_context(|| format!("failed to create {}", cli.state_dir.display()))?;
    let config = BridgeConfig {
        bot_user_id,
        tracked_persons,
        trigger_phrase,
        registry_path: cli.state_dir.join(REGISTRY_FILE_NAME),
        workspace_url: cli.slack_workspace_url.trim_end_matches('/').to_string(),
        digest_channel,
        project_key: cli.jira_project.clone(),
        issue_type: cli.jira_issue_type.clone(),
        board_assignees: non_empty_values(&cli.board_assignees),
        mention_window_hours: cli.mention_window_hours,
    };
    tracing::info!(
        bot_user_id = %config.bot_user_id,
        tracked_persons = config.tracked_persons.len(),
        registry = %config.registry_path.display(),
        "dxbot starting"
    );

    let service = Arc::new(BridgeService::new(
        config,
        BridgeCollaborators {
            directory: slack.clone(),
            history: slack.clone(),
            posting: slack,
            summarizer,
            tracker: jira,
        },
    ));

    if cli.run_maintenance_once {
        if let Err(error) = service.initialize_registry().await {
            tracing::warn!(
                error = %format!("{error:#}"),
                "registry bootstrap scan failed; continuing with maintenance cycle"
            );
        }
        return match service.run_maintenance_cycle().await? {
            MaintenanceOutcome::Completed(report) => {
                tracing::info!(
                    joined = report.reconcile.joined.len(),
                    pruned = report.reconcile.pruned.len(),
                    registry_size = report.registry_size,
                    "maintenance cycle completed"
                );
                Ok(())
            }
            MaintenanceOutcome::Skipped => {
                tracing::info!("maintenance cycle skipped");
                Ok(())
            }
        };
    }

    let bootstrap = service.spawn_registry_bootstrap();
    let mut scheduler = start_maintenance_scheduler(service.maintenance_job(), schedule);
    let serve_result = run_slack_events_server(
        SlackEventsServerConfig {
            bind: cli.bind.clone(),
        },
        service,
        async {
            let _ = tokio::signal::ctrl_c().await;
        },
    )
    .await;
    scheduler.shutdown().await;
    bootstrap.abort();
    serve_result
}
