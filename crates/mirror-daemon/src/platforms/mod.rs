//! HTTP clients for the native platforms and the mirrored service.
//!
//! Each client is a thin bearer-token REST wrapper: it builds requests,
//! retries transient failures with bounded backoff, and hands payloads to
//! the normalization adapters. Token acquisition and refresh are outside
//! the daemon; every client is constructed with a ready-to-use token.

pub mod alexa;
pub mod google;
pub mod microsoft;
pub mod todoist;

use crate::retry::{with_backoff, RetryConfig};
use mirror_core::{RemoteSource, SourceKind};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

/// Shared request plumbing for one platform endpoint.
pub(crate) struct Http {
    client: reqwest::Client,
    base_url: String,
    token: String,
    retry: RetryConfig,
}

impl Http {
    pub(crate) fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            retry: RetryConfig::default(),
        }
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one request with retries. Returns the parsed body, or `None`
    /// for responses without one (204s, empty 200s).
    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>, String> {
        let url = if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{path}", self.base_url)
        };

        with_backoff(&self.retry, path, || {
            let request = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(&self.token);
            let request = match body {
                Some(json) => request.json(json),
                None => request,
            };
            let url = url.clone();
            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|e| format!("request to {url} failed: {e}"))?;
                let status = response.status();
                let text = response
                    .text()
                    .await
                    .map_err(|e| format!("reading response from {url} failed: {e}"))?;

                if !status.is_success() {
                    return Err(format!("{url} returned {status}: {}", text.trim()));
                }
                if text.trim().is_empty() {
                    return Ok(None);
                }
                serde_json::from_str(&text)
                    .map(Some)
                    .map_err(|e| format!("invalid JSON from {url}: {e}"))
            }
        })
        .await
    }

    pub(crate) async fn get(&self, path: &str) -> Result<Value, String> {
        Ok(self
            .request(Method::GET, path, None)
            .await?
            .unwrap_or(Value::Null))
    }

    pub(crate) async fn post(&self, path: &str, body: &Value) -> Result<Option<Value>, String> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub(crate) async fn patch(&self, path: &str, body: &Value) -> Result<Option<Value>, String> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), String> {
        self.request(Method::DELETE, path, None).await?;
        Ok(())
    }
}

/// Build the client for one configured source. Clients needing startup
/// calls (the Graph profile fetch) make them here.
pub async fn build_source(
    kind: SourceKind,
    base_url: Option<&str>,
    token: String,
) -> Arc<dyn RemoteSource> {
    match kind {
        SourceKind::GoogleTasks => Arc::new(google::GoogleTasksClient::new(
            base_url.unwrap_or(google::DEFAULT_BASE_URL),
            token,
        )),
        SourceKind::AlexaReminders => Arc::new(alexa::AlexaRemindersClient::new(
            base_url.unwrap_or(alexa::REMINDERS_BASE_URL),
            token,
        )),
        SourceKind::AlexaShopping => Arc::new(alexa::AlexaShoppingClient::new(
            base_url.unwrap_or(alexa::LISTS_BASE_URL),
            token,
        )),
        SourceKind::MicrosoftTodo => {
            let client = microsoft::MicrosoftTodoClient::new(
                base_url.unwrap_or(microsoft::DEFAULT_BASE_URL),
                token,
            );
            client.load_profile().await;
            Arc::new(client)
        }
    }
}
