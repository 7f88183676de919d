use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dxbot_ai::{OpenAiSummarizer, OpenAiSummarizerConfig};
use dxbot_jira::{JiraApiClient, JiraApiClientConfig};
use dxbot_runtime::{
    BridgeCollaborators, BridgeConfig, BridgeService, MaintenanceOutcome, TrackedPersons,
    TriggerEvent, TriggerOutcome, REGISTRY_FILE_NAME,
};
use dxbot_slack::{SlackApiClient, SlackApiClientConfig};
use httpmock::prelude::*;
use serde_json::json;
use tempfile::tempdir;

fn build_service(
    server: &MockServer,
    state_dir: &Path,
    board_assignees: Vec<String>,
) -> BridgeService {
    let slack = Arc::new(
        SlackApiClient::new(SlackApiClientConfig {
            api_base: server.url("/api"),
            bot_token: "xoxb-test".to_string(),
            request_timeout_ms: 2_000,
            retry_max_attempts: 2,
            retry_base_delay_ms: 1,
        })
        .expect("slack client"),
    );
    let jira = Arc::new(
        JiraApiClient::new(JiraApiClientConfig {
            base_url: server.base_url(),
            email: "bot@example.com".to_string(),
            api_token: "jira-token".to_string(),
            request_timeout_ms: 2_000,
            retry_max_attempts: 2,
            retry_base_delay_ms: 1,
        })
        .expect("jira client"),
    );
    let summarizer = Arc::new(
        OpenAiSummarizer::new(OpenAiSummarizerConfig {
            api_base: server.url("/v1"),
            api_key: "sk-test".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 1_000,
            request_timeout_ms: 2_000,
            max_retries: 1,
            retry_base_delay_ms: 1,
        })
        .expect("summarizer"),
    );

    BridgeService::new(
        BridgeConfig {
            bot_user_id: "UBOT".to_string(),
            tracked_persons: TrackedPersons::new(["U1", "U2"]),
            trigger_phrase: "create ticket".to_string(),
            registry_path: state_dir.join(REGISTRY_FILE_NAME),
            workspace_url: "https://acme.slack.com".to_string(),
            digest_channel: "GDIGEST".to_string(),
            project_key: "DX".to_string(),
            issue_type: "Task".to_string(),
            board_assignees,
            mention_window_hours: 24,
        },
        BridgeCollaborators {
            directory: slack.clone(),
            history: slack.clone(),
            posting: slack,
            summarizer,
            tracker: jira,
        },
    )
}

fn trigger_event() -> TriggerEvent {
    serde_json::from_value(json!({
        "type": "message",
        "channel": "C1",
        "user": "U7",
        "text": "<@UBOT> create ticket",
        "ts": "100.3",
        "thread_ts": "100.1"
    }))
    .expect("event")
}

#[tokio::test]
async fn integration_trigger_event_creates_issue_and_replies_once() {
    let server = MockServer::start();
    let temp = tempdir().expect("tempdir");

    let replies = server.mock(|when, then| {
        when.method(GET)
            .path("/api/conversations.replies")
            .query_param("channel", "C1")
            .query_param("ts", "100.1")
            .header("authorization", "Bearer xoxb-test");
        then.status(200).json_body(json!({
            "ok": true,
            "messages": [
                {"ts": "100.1", "text": "checkout returns 502 since noon", "thread_ts": "100.1", "user": "U2"},
                {"ts": "100.3", "text": "<@UBOT> create ticket", "thread_ts": "100.1", "user": "U7"}
            ],
            "has_more": false,
            "response_metadata": {"next_cursor": ""}
        }));
    });
    let completion = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .body_includes("checkout returns 502 since noon");
        then.status(200).json_body(json!({
            "choices": [{"message": {"role": "assistant", "content": "Checkout returns 502 errors."}}]
        }));
    });
    let permalink = server.mock(|when, then| {
        when.method(GET)
            .path("/api/chat.getPermalink")
            .query_param("channel", "C1")
            .query_param("message_ts", "100.1");
        then.status(200).json_body(json!({
            "ok": true,
            "permalink": "https://acme.slack.com/archives/C1/p1001"
        }));
    });
    let create_issue = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/api/2/issue")
            .body_includes("Ticket created for message from U7")
            .body_includes("Checkout returns 502 errors.\\n\\nSlack Thread: https://acme.slack.com/archives/C1/p1001");
        then.status(201).json_body(json!({"id": "10042", "key": "DX-42"}));
    });
    let confirmation_text = format!(
        "Jira ticket created: <{}/browse/DX-42|DX-42>",
        server.base_url()
    );
    let confirmation = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat.postMessage")
            .body_includes("\"channel\":\"C1\"")
            .body_includes("\"thread_ts\":\"100.1\"")
            .body_includes(confirmation_text.as_str());
        then.status(200)
            .json_body(json!({"ok": true, "channel": "C1", "ts": "100.4"}));
    });

    let service = build_service(&server, temp.path(), Vec::new());
    let outcome = service.handle_event(&trigger_event()).await;
    assert_eq!(
        outcome,
        TriggerOutcome::Created {
            issue_key: "DX-42".to_string(),
            issue_url: format!("{}/browse/DX-42", server.base_url()),
        }
    );
    assert_eq!(
        service.handle_event(&trigger_event()).await,
        TriggerOutcome::Duplicate
    );

    replies.assert_calls(1);
    completion.assert_calls(1);
    permalink.assert_calls(1);
    create_issue.assert_calls(1);
    confirmation.assert_calls(1);
}

#[tokio::test]
async fn integration_bootstrap_then_maintenance_cycle_posts_both_digests() {
    let server = MockServer::start();
    let temp = tempdir().expect("tempdir");
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_secs();

    let list = server.mock(|when, then| {
        when.method(GET).path("/api/conversations.list");
        then.status(200).json_body(json!({
            "ok": true,
            "channels": [
                {"id": "C1", "name": "payments", "is_archived": false, "is_member": true},
                {"id": "C2", "name": "old-launch", "is_archived": true, "is_member": false}
            ],
            "response_metadata": {"next_cursor": ""}
        }));
    });
    let members = server.mock(|when, then| {
        when.method(GET)
            .path("/api/conversations.members")
            .query_param("channel", "C1");
        then.status(200).json_body(json!({
            "ok": true,
            "members": ["UBOT", "U1"],
            "response_metadata": {"next_cursor": ""}
        }));
    });
    let history = server.mock(|when, then| {
        when.method(GET)
            .path("/api/conversations.history")
            .query_param("channel", "C1")
            .query_param("inclusive", "true")
            .query_param_exists("oldest");
        then.status(200).json_body(json!({
            "ok": true,
            "messages": [
                {"ts": format!("{now}.000200"), "text": "<@U1> can you review?", "thread_ts": "500.1"},
                {"ts": format!("{now}.000100"), "text": "<@U1> standup moved"}
            ],
            "has_more": false
        }));
    });
    let mention_digest = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat.postMessage")
            .body_includes("\"channel\":\"GDIGEST\"")
            .body_includes("*Tracked Mentions (Last 24 Hours):*\\n<@U1>\\n    1. <https://acme.slack.com/archives/C1/p5001|View Thread>");
        then.status(200)
            .json_body(json!({"ok": true, "channel": "GDIGEST", "ts": "1.1"}));
    });
    let search = server.mock(|when, then| {
        when.method(GET)
            .path("/rest/api/2/search")
            .query_param("jql", "project = \"DX\" AND assignee = \"dev@example.com\"");
        then.status(200).json_body(json!({
            "issues": [{"key": "DX-7", "fields": {"summary": "Flaky checkout test"}}],
            "total": 1
        }));
    });
    let board_digest = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat.postMessage")
            .body_includes("*DX Board Tickets (In Progress):*\\ndev@example.com:\\n    1. *DX-7*: Flaky checkout test");
        then.status(200)
            .json_body(json!({"ok": true, "channel": "GDIGEST", "ts": "1.2"}));
    });

    let service = build_service(&server, temp.path(), vec!["dev@example.com".to_string()]);
    assert_eq!(service.initialize_registry().await.expect("bootstrap"), 1);
    let persisted =
        std::fs::read_to_string(temp.path().join(REGISTRY_FILE_NAME)).expect("registry");
    assert_eq!(
        serde_json::from_str::<Vec<String>>(&persisted).expect("json"),
        vec!["C1".to_string()]
    );

    let outcome = service.run_maintenance_cycle().await.expect("cycle");
    let MaintenanceOutcome::Completed(report) = outcome else {
        panic!("expected a completed cycle");
    };
    assert!(report.reconcile.joined.is_empty());
    assert!(report.reconcile.pruned.is_empty());
    assert_eq!(report.registry_size, 1);
    assert_eq!(report.people_mentioned, 1);
    assert!(report.mention_digest_posted);
    assert!(report.board_digest_posted);

    list.assert_calls(2);
    members.assert_calls(2);
    history.assert_calls(1);
    search.assert_calls(1);
    mention_digest.assert_calls(1);
    board_digest.assert_calls(1);
}
