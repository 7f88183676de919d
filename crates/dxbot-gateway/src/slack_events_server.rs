use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dxbot_runtime::{BridgeService, TriggerEvent, TriggerOutcome};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const SLACK_EVENTS_ENDPOINT: &str = "/slack/events";
pub const HEALTH_ENDPOINT: &str = "/healthz";

#[derive(Debug, Clone)]
pub struct SlackEventsServerConfig {
    pub bind: String,
}

pub struct SlackEventsServerState {
    service: Arc<BridgeService>,
}

impl SlackEventsServerState {
    pub fn new(service: Arc<BridgeService>) -> Self {
        Self { service }
    }
}

#[derive(Debug, Deserialize)]
struct SlackEventEnvelope {
    #[serde(rename = "type", default)]
    envelope_type: String,
    #[serde(default)]
    challenge: Option<String>,
    #[serde(default)]
    event: Option<Value>,
}

/// Binds `config.bind` and serves until `shutdown` resolves.
pub async fn run_slack_events_server<F>(
    config: SlackEventsServerConfig,
    service: Arc<BridgeService>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_addr = config
        .bind
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid --bind '{}'", config.bind))?;
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind slack events server on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound slack events server address")?;
    tracing::info!(
        endpoint = SLACK_EVENTS_ENDPOINT,
        addr = %local_addr,
        "slack events server listening"
    );

    let app = build_slack_events_router(Arc::new(SlackEventsServerState::new(service)));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("slack events server exited unexpectedly")
}

pub fn build_slack_events_router(state: Arc<SlackEventsServerState>) -> Router {
    Router::new()
        .route(SLACK_EVENTS_ENDPOINT, post(handle_slack_events))
        .route(HEALTH_ENDPOINT, get(handle_health))
        .with_state(state)
}

async fn handle_health() -> &'static str {
    "ok"
}

async fn handle_slack_events(
    State(state): State<Arc<SlackEventsServerState>>,
    body: Bytes,
) -> Response {
    let envelope = match serde_json::from_slice::<SlackEventEnvelope>(&body) {
        Ok(envelope) => envelope,
        Err(error) => {
            tracing::debug!(error = %error, "malformed slack event body");
            return (StatusCode::BAD_REQUEST, "Invalid JSON").into_response();
        }
    };

    match envelope.envelope_type.as_str() {
        "url_verification" => {
            let challenge = envelope.challenge.unwrap_or_default();
            (StatusCode::OK, Json(json!({ "challenge": challenge }))).into_response()
        }
        "event_callback" => {
            let Some(event) = envelope.event else {
                return (StatusCode::BAD_REQUEST, "Invalid request").into_response();
            };
            let has_text = event
                .get("text")
                .and_then(Value::as_str)
                .is_some_and(|text| !text.is_empty());
            if !has_text {
                return (StatusCode::BAD_REQUEST, "Empty text").into_response();
            }
            let event = match serde_json::from_value::<TriggerEvent>(event) {
                Ok(event) => event,
                Err(error) => {
                    tracing::debug!(error = %error, "unparseable slack event");
                    return (StatusCode::BAD_REQUEST, "Invalid request").into_response();
                }
            };
            dispatch_event(Arc::clone(&state.service), event);
            StatusCode::OK.into_response()
        }
        other => {
            tracing::debug!(envelope_type = %other, "unsupported slack envelope");
            (StatusCode::BAD_REQUEST, "Invalid request").into_response()
        }
    }
}

/// Hands the event to the ticket flow off the request path so the endpoint
/// acknowledges inside the provider's delivery deadline.
fn dispatch_event(service: Arc<BridgeService>, event: TriggerEvent) {
    tokio::spawn(async move {
        let key = event.dedup_key();
        match service.handle_event(&event).await {
            TriggerOutcome::Ignored | TriggerOutcome::Duplicate => {}
            TriggerOutcome::Created { issue_key, .. } => {
                tracing::info!(event_key = %key, issue_key = %issue_key, "slack event handled");
            }
            TriggerOutcome::Failed { stage, .. } => {
                tracing::warn!(event_key = %key, stage = stage.as_str(), "slack event failed");
            }
        }
    });
}
