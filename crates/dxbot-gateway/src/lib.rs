//! Inbound HTTP surface: the chat events endpoint and a health probe.

pub mod slack_events_server;

pub use slack_events_server::{
    build_slack_events_router, run_slack_events_server, SlackEventsServerConfig,
    SlackEventsServerState, HEALTH_ENDPOINT, SLACK_EVENTS_ENDPOINT,
};
