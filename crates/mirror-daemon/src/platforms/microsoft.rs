//! Microsoft Graph To-Do REST client.
//!
//! The only bi-directional platform. Mappings address lists by display
//! name; the client resolves names to Graph list IDs once and caches them.

use super::Http;
use crate::normalize;
use async_trait::async_trait;
use mirror_core::{RemoteSource, Result, SourceFields, SourceItem, SyncError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://graph.microsoft.com/v1.0/me/todo";

pub struct MicrosoftTodoClient {
    http: Http,
    list_ids: Mutex<HashMap<String, String>>,
    user: OnceLock<String>,
}

impl MicrosoftTodoClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: Http::new(base_url, token),
            list_ids: Mutex::new(HashMap::new()),
            user: OnceLock::new(),
        }
    }

    /// Fetch the signed-in user's display name, for assignment filtering.
    /// A failure here degrades filtering, not syncing, so it only warns.
    pub async fn load_profile(&self) {
        let profile_url = self
            .http
            .base_url()
            .trim_end_matches("/todo")
            .to_string();
        match self.http.get(&profile_url).await {
            Ok(profile) => {
                if let Some(name) = profile
                    .get("displayName")
                    .or_else(|| profile.get("userPrincipalName"))
                    .and_then(Value::as_str)
                {
                    let _ = self.user.set(name.to_string());
                }
            }
            Err(e) => warn!(error = %e, "could not load graph profile"),
        }
    }

    /// Resolve a list display name (or raw ID) to its Graph list ID.
    async fn resolve_list_id(&self, list: &str) -> Result<String> {
        if let Some(id) = self.list_ids.lock().unwrap().get(list) {
            return Ok(id.clone());
        }

        let payload = self.http.get("/lists").await.map_err(SyncError::Source)?;
        let lists = payload
            .get("value")
            .and_then(Value::as_array)
            .ok_or_else(|| SyncError::Source("malformed list collection".into()))?;

        let id = lists
            .iter()
            .find(|entry| {
                entry.get("displayName").and_then(Value::as_str) == Some(list)
                    || entry.get("id").and_then(Value::as_str) == Some(list)
            })
            .and_then(|entry| entry.get("id"))
            .and_then(Value::as_str)
            .ok_or_else(|| SyncError::Source(format!("todo list {list} not found")))?
            .to_string();

        self.list_ids
            .lock()
            .unwrap()
            .insert(list.to_string(), id.clone());
        Ok(id)
    }

    fn fields_body(fields: &SourceFields) -> Value {
        let mut body = json!({
            "title": fields.title,
            "body": {
                "content": fields.notes.clone().unwrap_or_default(),
                "contentType": "text",
            },
        });
        if let Some(due) = &fields.due {
            body["dueDateTime"] = json!({"dateTime": due, "timeZone": "UTC"});
        }
        body
    }
}

#[async_trait]
impl RemoteSource for MicrosoftTodoClient {
    async fn list_items(&self, list_id: &str, include_completed: bool) -> Result<Vec<SourceItem>> {
        let graph_id = self.resolve_list_id(list_id).await?;
        let mut path = format!("/lists/{graph_id}/tasks?$top=100");
        if !include_completed {
            path.push_str("&$filter=status%20ne%20'completed'");
        }
        let payload = self.http.get(&path).await.map_err(SyncError::Source)?;
        Ok(normalize::microsoft::parse_items(&payload, list_id))
    }

    async fn create_item(&self, list_id: &str, fields: &SourceFields) -> Result<String> {
        let graph_id = self.resolve_list_id(list_id).await?;
        let created = self
            .http
            .post(&format!("/lists/{graph_id}/tasks"), &Self::fields_body(fields))
            .await
            .map_err(SyncError::Source)?
            .ok_or_else(|| SyncError::Source("create returned no body".into()))?;
        created
            .get("id")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| SyncError::Source("create response missing id".into()))
    }

    async fn update_item(&self, list_id: &str, id: &str, fields: &SourceFields) -> Result<()> {
        let graph_id = self.resolve_list_id(list_id).await?;
        self.http
            .patch(&format!("/lists/{graph_id}/tasks/{id}"), &Self::fields_body(fields))
            .await
            .map_err(SyncError::Source)?;
        Ok(())
    }

    async fn set_completion(&self, list_id: &str, id: &str, completed: bool) -> Result<()> {
        let graph_id = self.resolve_list_id(list_id).await?;
        let status = if completed { "completed" } else { "notStarted" };
        self.http
            .patch(
                &format!("/lists/{graph_id}/tasks/{id}"),
                &json!({"status": status}),
            )
            .await
            .map_err(SyncError::Source)?;
        Ok(())
    }

    async fn delete_item(&self, list_id: &str, id: &str) -> Result<()> {
        let graph_id = self.resolve_list_id(list_id).await?;
        self.http
            .delete(&format!("/lists/{graph_id}/tasks/{id}"))
            .await
            .map_err(SyncError::Source)
    }

    fn authenticated_user(&self) -> Option<String> {
        self.user.get().cloned()
    }
}
