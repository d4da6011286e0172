//! Remote backend: one HTTP document per entity.
//!
//! Wire contract:
//! - `GET {base}/{collection}` returns `{"documents":[{"id":..,"data":{..}}]}`.
//! - `PUT {base}/{collection}/{id}` replaces the whole document (upsert).
//! - `PATCH {base}/{collection}/{id}` merges the given fields.
//! - `DELETE {base}/{collection}/{id}`; a 404 counts as already deleted.
//!
//! Document bodies never carry `id`; it lives in the path.

use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{Duration, Instant};

use super::{Collection, StoreError, StoreResult, TaskStore};
use crate::model::catalog::{sort_sections, Label, Project, Section};
use crate::model::defaults::{default_labels, default_projects};
use crate::model::task::Task;

const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Document>,
}

#[derive(Debug, Deserialize)]
struct Document {
    id: String,
    #[serde(default)]
    data: Map<String, Value>,
}

/// HTTP document-store client.
pub struct RemoteStore {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl RemoteStore {
    /// Builds a client for `base_url`. A blank `auth_token` is ignored.
    pub fn new(
        base_url: &str,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> StoreResult<Self> {
        let base_url = Url::parse(base_url.trim())
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| StoreError::InvalidBaseUrl(base_url.to_string()))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            auth_token: auth_token.filter(|token| !token.trim().is_empty()),
        })
    }

    /// Merges `fields` into an existing task document.
    ///
    /// Unlike `save_task`, fields absent from `fields` are left untouched
    /// on the server.
    pub async fn update_task_fields(&self, id: &str, fields: Map<String, Value>) -> StoreResult<()> {
        let url = self.url(&[Collection::Tasks.name(), id]);
        let request = self.request(Method::PATCH, url).json(&Value::Object(fields));
        self.send(request, Collection::Tasks, "patch").await?;
        Ok(())
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(
        &self,
        request: RequestBuilder,
        collection: Collection,
        op: &'static str,
    ) -> StoreResult<Response> {
        let started_at = Instant::now();
        let response = request.send().await.map_err(|err| {
            error!(
                "event=remote_request module=store status=error backend=remote op={op} collection={} duration_ms={} error_code=transport error={err}",
                collection.name(),
                started_at.elapsed().as_millis()
            );
            StoreError::Http(err)
        })?;

        let status = response.status();
        if status.is_success() || (op == "delete" && status == StatusCode::NOT_FOUND) {
            debug!(
                "event=remote_request module=store status=ok backend=remote op={op} collection={} http_status={} duration_ms={}",
                collection.name(),
                status.as_u16(),
                started_at.elapsed().as_millis()
            );
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        error!(
            "event=remote_request module=store status=error backend=remote op={op} collection={} http_status={} duration_ms={}",
            collection.name(),
            status.as_u16(),
            started_at.elapsed().as_millis()
        );
        Err(StoreError::Status {
            collection: collection.name(),
            status: status.as_u16(),
            message,
        })
    }

    async fn list<T: DeserializeOwned>(&self, collection: Collection) -> StoreResult<Vec<T>> {
        let request = self.request(Method::GET, self.url(&[collection.name()]));
        let response = self.send(request, collection, "list").await?;
        let listing: ListResponse = response.json().await?;

        let mut items = Vec::with_capacity(listing.documents.len());
        for document in listing.documents {
            let mut data = document.data;
            data.insert("id".to_string(), Value::String(document.id.clone()));
            match serde_json::from_value(Value::Object(data)) {
                Ok(item) => items.push(item),
                Err(err) => warn!(
                    "event=remote_document_skipped module=store status=error backend=remote collection={} document_id={} error={err}",
                    collection.name(),
                    document.id
                ),
            }
        }
        Ok(items)
    }

    async fn put<T: Serialize>(&self, collection: Collection, id: &str, item: &T) -> StoreResult<()> {
        let body = document_body(item)?;
        let request = self
            .request(Method::PUT, self.url(&[collection.name(), id]))
            .json(&body);
        self.send(request, collection, "put").await?;
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
        let request = self.request(Method::DELETE, self.url(&[collection.name(), id]));
        self.send(request, collection, "delete").await?;
        Ok(())
    }
}

/// Serialized entity with its `id` stripped.
fn document_body<T: Serialize>(item: &T) -> StoreResult<Value> {
    let mut value = serde_json::to_value(item)?;
    if let Value::Object(fields) = &mut value {
        fields.remove("id");
    }
    Ok(value)
}

#[async_trait]
impl TaskStore for RemoteStore {
    fn backend(&self) -> &'static str {
        "remote"
    }

    async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        self.list(Collection::Tasks).await
    }

    async fn save_task(&self, task: &Task) -> StoreResult<()> {
        self.put(Collection::Tasks, &task.id, task).await
    }

    async fn delete_task(&self, id: &str) -> StoreResult<()> {
        self.delete(Collection::Tasks, id).await
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let projects: Vec<Project> = self.list(Collection::Projects).await?;
        if projects.is_empty() {
            return Ok(default_projects());
        }
        Ok(projects)
    }

    async fn save_project(&self, project: &Project) -> StoreResult<()> {
        self.put(Collection::Projects, &project.id, project).await
    }

    async fn list_sections(&self, project_id: Option<&str>) -> StoreResult<Vec<Section>> {
        let mut sections: Vec<Section> = self.list(Collection::Sections).await?;
        if let Some(project_id) = project_id {
            sections.retain(|section| section.project_id == project_id);
        }
        sort_sections(&mut sections);
        Ok(sections)
    }

    async fn save_section(&self, section: &Section) -> StoreResult<()> {
        self.put(Collection::Sections, &section.id, section).await
    }

    async fn delete_section(&self, id: &str) -> StoreResult<()> {
        self.delete(Collection::Sections, id).await
    }

    async fn list_labels(&self) -> StoreResult<Vec<Label>> {
        let labels: Vec<Label> = self.list(Collection::Labels).await?;
        if labels.is_empty() {
            return Ok(default_labels());
        }
        Ok(labels)
    }

    async fn save_label(&self, label: &Label) -> StoreResult<()> {
        self.put(Collection::Labels, &label.id, label).await
    }
}
