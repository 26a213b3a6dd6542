//! Google Tasks REST client.

use super::Http;
use crate::normalize;
use async_trait::async_trait;
use mirror_core::{RemoteSource, Result, SourceFields, SourceItem, SyncError};
use serde_json::{json, Value};

pub const DEFAULT_BASE_URL: &str = "https://tasks.googleapis.com/tasks/v1";

pub struct GoogleTasksClient {
    http: Http,
}

impl GoogleTasksClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self { http: Http::new(base_url, token) }
    }

    fn fields_body(fields: &SourceFields) -> Value {
        json!({
            "title": fields.title,
            "notes": fields.notes,
            "due": fields.due,
        })
    }
}

#[async_trait]
impl RemoteSource for GoogleTasksClient {
    async fn list_items(&self, list_id: &str, include_completed: bool) -> Result<Vec<SourceItem>> {
        // Completed tasks are also "hidden", so both flags are needed.
        let path = format!(
            "/lists/{list_id}/tasks?maxResults=100&showCompleted={include_completed}&showHidden={include_completed}"
        );
        let payload = self.http.get(&path).await.map_err(SyncError::Source)?;
        Ok(normalize::google::parse_items(&payload, list_id))
    }

    async fn create_item(&self, list_id: &str, fields: &SourceFields) -> Result<String> {
        let body = Self::fields_body(fields);
        let created = self
            .http
            .post(&format!("/lists/{list_id}/tasks"), &body)
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
        let body = Self::fields_body(fields);
        self.http
            .patch(&format!("/lists/{list_id}/tasks/{id}"), &body)
            .await
            .map_err(SyncError::Source)?;
        Ok(())
    }

    async fn set_completion(&self, list_id: &str, id: &str, completed: bool) -> Result<()> {
        let status = if completed { "completed" } else { "needsAction" };
        self.http
            .patch(&format!("/lists/{list_id}/tasks/{id}"), &json!({"status": status}))
            .await
            .map_err(SyncError::Source)?;
        Ok(())
    }

    async fn delete_item(&self, list_id: &str, id: &str) -> Result<()> {
        self.http
            .delete(&format!("/lists/{list_id}/tasks/{id}"))
            .await
            .map_err(SyncError::Source)
    }

    fn authenticated_user(&self) -> Option<String> {
        None
    }
}
