//! Todoist REST v2 client, the mirrored service every source lands in.

use super::Http;
use async_trait::async_trait;
use mirror_core::{ContainerRef, MirrorFields, MirrorService, MirrorTask, Result, SyncError};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub const DEFAULT_BASE_URL: &str = "https://api.todoist.com/rest/v2";

pub struct TodoistClient {
    http: Http,
    project_ids: Mutex<HashMap<String, String>>,
}

impl TodoistClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self { http: Http::new(base_url, token), project_ids: Mutex::new(HashMap::new()) }
    }

    async fn fetch_tasks(&self, container_id: &str) -> Result<Vec<Value>> {
        let payload = self
            .http
            .get(&format!("/tasks?project_id={container_id}"))
            .await
            .map_err(SyncError::Mirror)?;
        payload
            .as_array()
            .cloned()
            .ok_or_else(|| SyncError::Mirror("malformed task collection".into()))
    }

    /// Content fields only; labels deliberately stay out of this body.
    fn fields_map(fields: &MirrorFields) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("content".into(), json!(fields.content));
        body.insert(
            "description".into(),
            json!(fields.description.clone().unwrap_or_default()),
        );
        match &fields.due {
            // Datetimes and bare dates go through different parameters.
            Some(due) if due.contains('T') => {
                body.insert("due_datetime".into(), json!(due));
            }
            Some(due) => {
                body.insert("due_date".into(), json!(due));
            }
            None => {}
        }
        body
    }

    fn create_body(fields: &MirrorFields) -> Value {
        let mut body = Self::fields_map(fields);
        if !fields.labels.is_empty() {
            body.insert("labels".into(), json!(fields.labels));
        }
        if let Some(project_id) = &fields.container_id {
            body.insert("project_id".into(), json!(project_id));
        }
        if let Some(parent_id) = &fields.parent_id {
            body.insert("parent_id".into(), json!(parent_id));
        }
        Value::Object(body)
    }

    fn update_body(fields: &MirrorFields) -> Value {
        let mut body = Self::fields_map(fields);
        if fields.due.is_none() {
            // "no date" clears a previously set date.
            body.insert("due_string".into(), json!("no date"));
        }
        Value::Object(body)
    }
}

fn parse_task(raw: &Value) -> Option<MirrorTask> {
    let id = raw.get("id").and_then(Value::as_str)?;
    let content = raw.get("content").and_then(Value::as_str)?;

    let description = raw
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    let due = raw.get("due").and_then(|due| {
        due.get("datetime")
            .or_else(|| due.get("date"))
            .and_then(Value::as_str)
            .map(String::from)
    });

    let labels = raw
        .get("labels")
        .and_then(Value::as_array)
        .map(|labels| {
            labels
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Some(MirrorTask {
        id: id.to_string(),
        content: content.to_string(),
        description,
        due,
        completed: raw.get("is_completed").and_then(Value::as_bool).unwrap_or(false),
        labels,
        parent_id: raw.get("parent_id").and_then(Value::as_str).map(String::from),
    })
}

#[async_trait]
impl MirrorService for TodoistClient {
    async fn resolve_container_id(&self, container: &ContainerRef) -> Result<String> {
        let key = match container {
            ContainerRef::Inbox => "inbox".to_string(),
            ContainerRef::Named(name) => name.clone(),
        };
        if let Some(id) = self.project_ids.lock().unwrap().get(&key) {
            return Ok(id.clone());
        }

        let payload = self.http.get("/projects").await.map_err(SyncError::Mirror)?;
        let projects = payload
            .as_array()
            .ok_or_else(|| SyncError::Mirror("malformed project collection".into()))?;

        let id = projects
            .iter()
            .find(|project| match container {
                ContainerRef::Inbox => project
                    .get("is_inbox_project")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                ContainerRef::Named(name) => {
                    project.get("name").and_then(Value::as_str) == Some(name)
                }
            })
            .and_then(|project| project.get("id"))
            .and_then(Value::as_str)
            .ok_or_else(|| SyncError::Mirror(format!("project {key} not found")))?
            .to_string();

        self.project_ids.lock().unwrap().insert(key, id.clone());
        Ok(id)
    }

    async fn list_items(&self, container_id: &str) -> Result<Vec<MirrorTask>> {
        Ok(self
            .fetch_tasks(container_id)
            .await?
            .iter()
            .filter_map(parse_task)
            .collect())
    }

    async fn list_item_ids(&self, container_id: &str) -> Result<HashSet<String>> {
        Ok(self
            .fetch_tasks(container_id)
            .await?
            .iter()
            .filter_map(|raw| raw.get("id").and_then(Value::as_str))
            .map(String::from)
            .collect())
    }

    async fn create_task(&self, fields: &MirrorFields) -> Result<String> {
        let created = self
            .http
            .post("/tasks", &Self::create_body(fields))
            .await
            .map_err(SyncError::Mirror)?
            .ok_or_else(|| SyncError::Mirror("create returned no body".into()))?;
        created
            .get("id")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| SyncError::Mirror("create response missing id".into()))
    }

    async fn update_task(&self, id: &str, fields: &MirrorFields) -> Result<()> {
        self.http
            .post(&format!("/tasks/{id}"), &Self::update_body(fields))
            .await
            .map_err(SyncError::Mirror)?;
        Ok(())
    }

    async fn set_labels(&self, id: &str, labels: &[String]) -> Result<()> {
        self.http
            .post(&format!("/tasks/{id}"), &json!({"labels": labels}))
            .await
            .map_err(SyncError::Mirror)?;
        Ok(())
    }

    async fn set_completion(&self, id: &str, completed: bool) -> Result<()> {
        let action = if completed { "close" } else { "reopen" };
        self.http
            .post(&format!("/tasks/{id}/{action}"), &json!({}))
            .await
            .map_err(SyncError::Mirror)?;
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        self.http
            .delete(&format!("/tasks/{id}"))
            .await
            .map_err(SyncError::Mirror)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_task_shapes() {
        let raw = json!({
            "id": "t1",
            "content": "Buy milk",
            "description": "2%",
            "due": {"date": "2024-01-15", "datetime": "2024-01-15T09:00:00Z"},
            "is_completed": false,
            "labels": ["grocery"],
            "parent_id": "t0"
        });

        let task = parse_task(&raw).unwrap();
        assert_eq!(task.id, "t1");
        // Datetime wins over the bare date when both are present.
        assert_eq!(task.due.as_deref(), Some("2024-01-15T09:00:00Z"));
        assert_eq!(task.labels, vec!["grocery".to_string()]);
        assert_eq!(task.parent_id.as_deref(), Some("t0"));

        let minimal = parse_task(&json!({"id": "t2", "content": "Bare"})).unwrap();
        assert!(minimal.description.is_none());
        assert!(minimal.due.is_none());
        assert!(!minimal.completed);

        assert!(parse_task(&json!({"content": "no id"})).is_none());
    }

    #[test]
    fn test_body_due_routing() {
        let datetime = TodoistClient::update_body(&MirrorFields {
            content: "a".into(),
            due: Some("2024-01-15T09:00:00Z".into()),
            ..Default::default()
        });
        assert_eq!(datetime["due_datetime"], json!("2024-01-15T09:00:00Z"));
        assert!(datetime.get("due_date").is_none());

        let date = TodoistClient::update_body(&MirrorFields {
            content: "a".into(),
            due: Some("2024-01-15".into()),
            ..Default::default()
        });
        assert_eq!(date["due_date"], json!("2024-01-15"));

        // Only an update clears a date; a create simply omits the field.
        let cleared = TodoistClient::update_body(&MirrorFields {
            content: "a".into(),
            ..Default::default()
        });
        assert_eq!(cleared["due_string"], json!("no date"));
    }

    #[test]
    fn test_create_body_composition() {
        let body = TodoistClient::create_body(&MirrorFields {
            content: "a".into(),
            labels: vec!["grocery".into()],
            container_id: Some("p1".into()),
            parent_id: Some("t0".into()),
            ..Default::default()
        });
        assert!(body.get("due_string").is_none());
        assert_eq!(body["labels"], json!(["grocery"]));
        assert_eq!(body["project_id"], json!("p1"));
        assert_eq!(body["parent_id"], json!("t0"));

        let bare = TodoistClient::create_body(&MirrorFields {
            content: "a".into(),
            ..Default::default()
        });
        assert!(bare.get("labels").is_none());
        assert!(bare.get("project_id").is_none());
    }
}
