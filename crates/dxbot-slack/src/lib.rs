//! Slack Web API client used by the dxbot runtime.
//!
//! Wraps the handful of `conversations.*` and `chat.*` methods the bridge
//! needs, with per-request timeouts and retry on rate limits / server errors.
//! Single-page methods return the provider cursor untouched; callers own the
//! pagination loop. `conversations.members` is the exception and always
//! returns the complete member list.

pub mod slack_api_client;
pub mod slack_types;

pub use slack_api_client::{SlackApiClient, SlackApiClientConfig};
pub use slack_types::{
    SlackApiError, SlackChannel, SlackChannelPage, SlackMessage, SlackMessagePage,
    SlackPostedMessage,
};
