//! Storage port and its interchangeable backends.
//!
//! # Responsibility
//! - Define the single CRUD contract every backend implements.
//! - Select the configured backend so call sites never branch per backend.
//!
//! # Invariants
//! - Saves are upserts keyed by identifier.
//! - `list_sections` is sorted by ascending `order`, ties in stored sequence.
//! - `list_labels` never returns an empty set; defaults stand in.
//! - A backend is a durable mirror only; the board owns the live state.

use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use crate::config::StorageConfig;
use crate::db::DbError;
use crate::model::catalog::{Label, Project, Section};
use crate::model::task::{Task, TaskId};

pub mod local;
pub mod outbox;
pub mod remote;

pub use local::LocalStore;
pub use outbox::{Outbox, QueuedWrite};
pub use remote::RemoteStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence failures surfaced by any backend.
#[derive(Debug)]
pub enum StoreError {
    /// SQLite bootstrap or query failure (local backend).
    Db(DbError),
    /// Entity could not be encoded for storage.
    Encode(serde_json::Error),
    /// Transport-level failure talking to the remote document store.
    Http(reqwest::Error),
    /// Remote store answered with a non-success status.
    Status {
        collection: &'static str,
        status: u16,
        message: String,
    },
    /// Remote base URL cannot carry document paths.
    InvalidBaseUrl(String),
    /// A previous holder of the local connection panicked.
    LockPoisoned,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode entity: {err}"),
            Self::Http(err) => write!(f, "remote store request failed: {err}"),
            Self::Status {
                collection,
                status,
                message,
            } => write!(
                f,
                "remote store rejected `{collection}` request with status {status}: {message}"
            ),
            Self::InvalidBaseUrl(url) => write!(f, "invalid remote store url `{url}`"),
            Self::LockPoisoned => write!(f, "local store connection lock poisoned"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::Http(err) => Some(err),
            Self::Status { .. } | Self::InvalidBaseUrl(_) | Self::LockPoisoned => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

/// The four persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Tasks,
    Projects,
    Sections,
    Labels,
}

impl Collection {
    /// Collection name used in logs and remote paths.
    pub fn name(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Projects => "projects",
            Self::Sections => "sections",
            Self::Labels => "labels",
        }
    }

    /// Key of the local slot holding this collection.
    pub fn slot_key(self) -> &'static str {
        match self {
            Self::Tasks => "doit_tasks",
            Self::Projects => "doit_projects",
            Self::Sections => "doit_sections",
            Self::Labels => "doit_labels",
        }
    }
}

/// Storage contract shared by the local and remote backends.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Short backend name for diagnostics.
    fn backend(&self) -> &'static str;

    async fn list_tasks(&self) -> StoreResult<Vec<Task>>;
    async fn save_task(&self, task: &Task) -> StoreResult<()>;
    async fn delete_task(&self, id: &str) -> StoreResult<()>;

    /// Deletes several tasks. Backends override this when a batch is cheaper.
    async fn delete_tasks(&self, ids: &[TaskId]) -> StoreResult<()> {
        for id in ids {
            self.delete_task(id).await?;
        }
        Ok(())
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>>;
    async fn save_project(&self, project: &Project) -> StoreResult<()>;

    /// Lists sections, optionally restricted to one project.
    async fn list_sections(&self, project_id: Option<&str>) -> StoreResult<Vec<Section>>;
    async fn save_section(&self, section: &Section) -> StoreResult<()>;
    async fn delete_section(&self, id: &str) -> StoreResult<()>;

    async fn list_labels(&self) -> StoreResult<Vec<Label>>;
    async fn save_label(&self, label: &Label) -> StoreResult<()>;
}

/// Opens the backend named by configuration.
pub fn open_store(config: &StorageConfig) -> StoreResult<Arc<dyn TaskStore>> {
    match config {
        StorageConfig::Local { path } => {
            let store = match path {
                Some(path) => LocalStore::open(path)?,
                None => LocalStore::in_memory()?,
            };
            Ok(Arc::new(store))
        }
        StorageConfig::Remote {
            base_url,
            auth_token,
            timeout_secs,
            ..
        } => Ok(Arc::new(RemoteStore::new(
            base_url,
            auth_token.clone(),
            Duration::from_secs(*timeout_secs),
        )?)),
    }
}

/// Opens the outbox that goes with the configured backend.
///
/// A local file keeps its outbox in the same file. A remote backend needs an
/// explicit `outbox_path`. Without a file there is nothing to outlive the
/// process, so `None` is returned.
pub fn open_outbox(config: &StorageConfig) -> StoreResult<Option<Outbox>> {
    let path = match config {
        StorageConfig::Local { path } => path.as_ref(),
        StorageConfig::Remote { outbox_path, .. } => outbox_path.as_ref(),
    };
    path.map(Outbox::open).transpose()
}

/// Records addressable by identifier.
pub(crate) trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Task {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Project {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Section {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Label {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Replaces the item with the same key in place, or appends it.
pub(crate) fn upsert<T: Keyed>(items: &mut Vec<T>, item: T) {
    match items.iter().position(|existing| existing.key() == item.key()) {
        Some(index) => items[index] = item,
        None => items.push(item),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_replaces_in_place_and_appends_new() {
        let mut tasks = vec![Task::with_id("a", "one"), Task::with_id("b", "two")];
        upsert(&mut tasks, Task::with_id("a", "uno"));
        upsert(&mut tasks, Task::with_id("c", "three"));

        let contents: Vec<_> = tasks.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, ["uno", "two", "three"]);
    }
}
