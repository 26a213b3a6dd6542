//! Alexa reminders and shopping-list REST clients.
//!
//! Both are one-way sources: the reconciler reads them and (when a mapping
//! sets `delete_after_sync`) deletes from them, nothing else. The remaining
//! write operations fail loudly so a misconfigured bi-directional mapping
//! cannot silently mangle Alexa state.

use super::Http;
use crate::normalize;
use async_trait::async_trait;
use mirror_core::{RemoteSource, Result, SourceFields, SourceItem, SyncError};

pub const REMINDERS_BASE_URL: &str = "https://api.amazonalexa.com/v1/alerts/reminders";
pub const LISTS_BASE_URL: &str = "https://api.amazonalexa.com/v2/householdlists";

fn unsupported(operation: &str) -> SyncError {
    SyncError::Source(format!("alexa does not support {operation}"))
}

pub struct AlexaRemindersClient {
    http: Http,
}

impl AlexaRemindersClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self { http: Http::new(base_url, token) }
    }
}

#[async_trait]
impl RemoteSource for AlexaRemindersClient {
    async fn list_items(&self, list_id: &str, include_completed: bool) -> Result<Vec<SourceItem>> {
        // The reminders endpoint has no list concept; one logical list,
        // filtered client-side.
        let payload = self.http.get("").await.map_err(SyncError::Source)?;
        let mut items = normalize::alexa::parse_reminders(&payload, list_id);
        if !include_completed {
            items.retain(|item| !item.status.is_completed());
        }
        Ok(items)
    }

    async fn create_item(&self, _list_id: &str, _fields: &SourceFields) -> Result<String> {
        Err(unsupported("creating reminders"))
    }

    async fn update_item(&self, _list_id: &str, _id: &str, _fields: &SourceFields) -> Result<()> {
        Err(unsupported("updating reminders"))
    }

    async fn set_completion(&self, _list_id: &str, _id: &str, _completed: bool) -> Result<()> {
        Err(unsupported("completing reminders"))
    }

    async fn delete_item(&self, _list_id: &str, id: &str) -> Result<()> {
        self.http.delete(&format!("/{id}")).await.map_err(SyncError::Source)
    }

    fn authenticated_user(&self) -> Option<String> {
        None
    }
}

pub struct AlexaShoppingClient {
    http: Http,
}

impl AlexaShoppingClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self { http: Http::new(base_url, token) }
    }
}

#[async_trait]
impl RemoteSource for AlexaShoppingClient {
    async fn list_items(&self, list_id: &str, include_completed: bool) -> Result<Vec<SourceItem>> {
        // Active and completed items live under separate status segments.
        let payload = self
            .http
            .get(&format!("/{list_id}/active"))
            .await
            .map_err(SyncError::Source)?;
        let mut items = normalize::alexa::parse_shopping_items(&payload, list_id);

        if include_completed {
            let completed = self
                .http
                .get(&format!("/{list_id}/completed"))
                .await
                .map_err(SyncError::Source)?;
            items.extend(normalize::alexa::parse_shopping_items(&completed, list_id));
        }
        Ok(items)
    }

    async fn create_item(&self, _list_id: &str, _fields: &SourceFields) -> Result<String> {
        Err(unsupported("creating shopping items"))
    }

    async fn update_item(&self, _list_id: &str, _id: &str, _fields: &SourceFields) -> Result<()> {
        Err(unsupported("updating shopping items"))
    }

    async fn set_completion(&self, _list_id: &str, _id: &str, _completed: bool) -> Result<()> {
        Err(unsupported("completing shopping items"))
    }

    async fn delete_item(&self, list_id: &str, id: &str) -> Result<()> {
        self.http
            .delete(&format!("/{list_id}/items/{id}"))
            .await
            .map_err(SyncError::Source)
    }

    fn authenticated_user(&self) -> Option<String> {
        None
    }
}
