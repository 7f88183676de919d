use std::time::Duration;

use anyhow::{bail, Context, Result};
use dxbot_core::transport_helpers::{
    is_retryable_status, is_retryable_transport_error, parse_retry_after, retry_delay,
    truncate_for_error,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

const SEARCH_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone)]
pub struct JiraApiClientConfig {
    pub base_url: String,
    pub email: String,
    pub api_token: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraIssueDraft {
    pub project_key: String,
    pub issue_type: String,
    pub summary: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JiraCreatedIssue {
    pub key: String,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraIssueSummary {
    pub key: String,
    pub summary: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct JiraSearchResponse {
    #[serde(default)]
    issues: Vec<JiraSearchIssue>,
    #[serde(default)]
    total: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct JiraSearchIssue {
    key: String,
    #[serde(default)]
    fields: JiraSearchFields,
}

#[derive(Debug, Default, Deserialize)]
struct JiraSearchFields {
    #[serde(default)]
    summary: String,
}

/// Accepts `acme.atlassian.net` as well as a full URL and returns `https://...`
/// without a trailing slash.
pub fn normalize_jira_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

#[derive(Clone)]
pub struct JiraApiClient {
    http: reqwest::Client,
    base_url: String,
    email: String,
    api_token: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl JiraApiClient {
    pub fn new(config: JiraApiClientConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            bail!("jira base url cannot be empty");
        }
        if config.email.trim().is_empty() || config.api_token.trim().is_empty() {
            bail!("jira email and api token are required");
        }
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("dxbot-jira"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .context("failed to create jira api client")?;
        Ok(Self {
            http,
            base_url: normalize_jira_base_url(&config.base_url),
            email: config.email.trim().to_string(),
            api_token: config.api_token.trim().to_string(),
            retry_max_attempts: config.retry_max_attempts.max(1),
            retry_base_delay_ms: config.retry_base_delay_ms.max(1),
        })
    }

    pub fn issue_url(&self, key: &str) -> String {
        format!("{}/browse/{key}", self.base_url)
    }

    pub async fn create_issue(&self, draft: &JiraIssueDraft) -> Result<JiraCreatedIssue> {
        let payload = json!({
            "fields": {
                "project": { "key": draft.project_key },
                "summary": draft.summary,
                "description": draft.description,
                "issuetype": { "name": draft.issue_type },
            }
        });
        let created: JiraCreatedIssue = self
            .request_json("create issue", || {
                self.http
                    .post(format!("{}/rest/api/2/issue", self.base_url))
                    .basic_auth(&self.email, Some(&self.api_token))
                    .json(&payload)
            })
            .await?;
        if created.key.trim().is_empty() {
            bail!("jira create issue response missing key");
        }
        Ok(created)
    }

    /// Runs a JQL search, walking `startAt` until every match is collected.
    pub async fn search_issues(&self, jql: &str) -> Result<Vec<JiraIssueSummary>> {
        let mut rows = Vec::new();
        let mut start_at = 0_usize;
        loop {
            let start_value = start_at.to_string();
            let page_size = SEARCH_PAGE_SIZE.to_string();
            let page: JiraSearchResponse = self
                .request_json("search issues", || {
                    self.http
                        .get(format!("{}/rest/api/2/search", self.base_url))
                        .basic_auth(&self.email, Some(&self.api_token))
                        .query(&[
                            ("jql", jql),
                            ("fields", "key,summary"),
                            ("startAt", start_value.as_str()),
                            ("maxResults", page_size.as_str()),
                        ])
                })
                .await?;
            let chunk_len = page.issues.len();
            rows.extend(page.issues.into_iter().map(|issue| JiraIssueSummary {
                url: self.issue_url(&issue.key),
                key: issue.key,
                summary: issue.fields.summary,
            }));
            start_at = start_at.saturating_add(chunk_len);
            let exhausted = match page.total {
                Some(total) => start_at >= total,
                None => chunk_len < SEARCH_PAGE_SIZE,
            };
            if chunk_len == 0 || exhausted {
                break;
            }
        }
        Ok(rows)
    }

    async fn request_json<T, F>(&self, operation: &str, mut request_builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = request_builder()
                .header("x-dxbot-retry-attempt", attempt.saturating_sub(1).to_string())
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed = response
                            .json::<T>()
                            .await
                            .with_context(|| format!("failed to decode jira {operation}"))?;
                        return Ok(parsed);
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts && is_retryable_status(status.as_u16()) {
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }

                    bail!(
                        "jira api {operation} failed with status {}: {}",
                        status.as_u16(),
                        truncate_for_error(&body, 800)
                    );
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("jira api {operation} request failed"));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::{normalize_jira_base_url, JiraApiClient, JiraApiClientConfig, JiraIssueDraft};

    fn test_client(base_url: &str) -> JiraApiClient {
        JiraApiClient::new(JiraApiClientConfig {
            base_url: base_url.to_string(),
            email: "bot@example.com".to_string(),
            api_token: "token".to_string(),
            request_timeout_ms: 2_000,
            retry_max_attempts: 2,
            retry_base_delay_ms: 1,
        })
        .expect("client")
    }

    #[test]
    fn unit_normalize_jira_base_url_adds_scheme_and_strips_slash() {
        assert_eq!(
            normalize_jira_base_url("acme.atlassian.net/"),
            "https://acme.atlassian.net"
        );
        assert_eq!(
            normalize_jira_base_url("http://localhost:8080"),
            "http://localhost:8080"
        );
    }

    #[test]
    fn unit_issue_url_is_derived_from_host_and_key() {
        let client = test_client("acme.atlassian.net");
        assert_eq!(
            client.issue_url("DX-42"),
            "https://acme.atlassian.net/browse/DX-42"
        );
    }

    #[tokio::test]
    async fn functional_create_issue_posts_fields_with_basic_auth() {
        let server = MockServer::start();
        let create = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/api/2/issue")
                .header_exists("authorization")
                .body_includes("\"key\":\"DX\"")
                .body_includes("\"name\":\"Task\"")
                .body_includes("Slack Thread: https://acme.slack.com/archives/C1/p1001");
            then.status(201)
                .json_body(json!({"id": "10001", "key": "DX-42", "self": "ignored"}));
        });

        let client = test_client(&server.base_url());
        let created = client
            .create_issue(&JiraIssueDraft {
                project_key: "DX".to_string(),
                issue_type: "Task".to_string(),
                summary: "Ticket created for message from U1".to_string(),
                description: "Broken build\n\nSlack Thread: https://acme.slack.com/archives/C1/p1001"
                    .to_string(),
            })
            .await
            .expect("create issue");
        assert_eq!(created.key, "DX-42");
        assert_eq!(created.id.as_deref(), Some("10001"));
        create.assert_calls(1);
    }

    #[tokio::test]
    async fn regression_create_issue_reports_validation_errors_without_retry() {
        let server = MockServer::start();
        let create = server.mock(|when, then| {
            when.method(POST).path("/rest/api/2/issue");
            then.status(400)
                .json_body(json!({"errorMessages": [], "errors": {"project": "invalid"}}));
        });

        let client = test_client(&server.base_url());
        let error = client
            .create_issue(&JiraIssueDraft {
                project_key: "NOPE".to_string(),
                issue_type: "Task".to_string(),
                summary: "s".to_string(),
                description: "d".to_string(),
            })
            .await
            .expect_err("400");
        assert!(error.to_string().contains("status 400"));
        create.assert_calls(1);
    }

    #[tokio::test]
    async fn functional_search_issues_walks_pages_and_builds_urls() {
        let server = MockServer::start();
        let jql = "project = \"DX\" AND assignee = \"dev@example.com\"";
        let issues_first_page = (0..50)
            .map(|index| json!({"key": format!("DX-{index}"), "fields": {"summary": "task"}}))
            .collect::<Vec<_>>();
        let first = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/api/2/search")
                .query_param("jql", jql)
                .query_param("startAt", "0");
            then.status(200)
                .json_body(json!({"issues": issues_first_page, "total": 51}));
        });
        let second = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/api/2/search")
                .query_param("startAt", "50");
            then.status(200).json_body(json!({
                "issues": [{"key": "DX-99", "fields": {"summary": "last one"}}],
                "total": 51
            }));
        });

        let client = test_client(&server.base_url());
        let rows = client.search_issues(jql).await.expect("search");
        assert_eq!(rows.len(), 51);
        assert_eq!(rows[50].key, "DX-99");
        assert_eq!(rows[50].summary, "last one");
        assert_eq!(rows[50].url, format!("{}/browse/DX-99", server.base_url()));
        first.assert_calls(1);
        second.assert_calls(1);
    }
}
