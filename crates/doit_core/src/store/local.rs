//! Local backend: one SQLite key-value slot per collection.
//!
//! # Responsibility
//! - Persist each collection as a single JSON blob.
//! - Provide the synchronous API the async port delegates to.
//!
//! # Invariants
//! - Writes are whole-collection read-modify-write inside one immediate
//!   transaction.
//! - An absent slot yields the seeded defaults; an unparseable slot is
//!   logged and treated as absent.

use async_trait::async_trait;
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::{upsert, Collection, Keyed, StoreError, StoreResult, TaskStore};
use crate::db::{open_db, open_db_in_memory};
use crate::model::catalog::{sort_sections, Label, Project, Section};
use crate::model::defaults::{default_labels, default_projects, default_sections};
use crate::model::task::{Task, TaskId};

/// SQLite-backed slot store.
pub struct LocalStore {
    conn: Mutex<Connection>,
}

impl LocalStore {
    /// Opens (or creates) a store file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens a throwaway store that lives as long as this value.
    pub fn in_memory() -> StoreResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn load_tasks(&self) -> StoreResult<Vec<Task>> {
        let conn = self.lock()?;
        Ok(read_collection(&conn, Collection::Tasks)?.unwrap_or_default())
    }

    pub fn upsert_task(&self, task: &Task) -> StoreResult<()> {
        self.modify(Collection::Tasks, Vec::new, |tasks: &mut Vec<Task>| {
            upsert(tasks, task.clone())
        })
    }

    pub fn remove_task(&self, id: &str) -> StoreResult<()> {
        self.modify(Collection::Tasks, Vec::new, |tasks: &mut Vec<Task>| {
            tasks.retain(|task| task.id != id)
        })
    }

    /// Removes every listed task in a single slot write.
    pub fn remove_tasks(&self, ids: &[TaskId]) -> StoreResult<()> {
        self.modify(Collection::Tasks, Vec::new, |tasks: &mut Vec<Task>| {
            tasks.retain(|task| !ids.contains(&task.id))
        })
    }

    pub fn load_projects(&self) -> StoreResult<Vec<Project>> {
        let conn = self.lock()?;
        Ok(read_collection(&conn, Collection::Projects)?.unwrap_or_else(default_projects))
    }

    pub fn upsert_project(&self, project: &Project) -> StoreResult<()> {
        self.modify(Collection::Projects, default_projects, |projects| {
            upsert(projects, project.clone())
        })
    }

    pub fn load_sections(&self, project_id: Option<&str>) -> StoreResult<Vec<Section>> {
        let conn = self.lock()?;
        let mut sections: Vec<Section> =
            read_collection(&conn, Collection::Sections)?.unwrap_or_else(default_sections);
        if let Some(project_id) = project_id {
            sections.retain(|section| section.project_id == project_id);
        }
        sort_sections(&mut sections);
        Ok(sections)
    }

    pub fn upsert_section(&self, section: &Section) -> StoreResult<()> {
        self.modify(Collection::Sections, default_sections, |sections| {
            upsert(sections, section.clone())
        })
    }

    pub fn remove_section(&self, id: &str) -> StoreResult<()> {
        self.modify(
            Collection::Sections,
            default_sections,
            |sections: &mut Vec<Section>| sections.retain(|section| section.id != id),
        )
    }

    pub fn load_labels(&self) -> StoreResult<Vec<Label>> {
        let conn = self.lock()?;
        let labels: Vec<Label> = read_collection(&conn, Collection::Labels)?.unwrap_or_default();
        if labels.is_empty() {
            return Ok(default_labels());
        }
        Ok(labels)
    }

    pub fn upsert_label(&self, label: &Label) -> StoreResult<()> {
        self.modify(Collection::Labels, default_labels, |labels| {
            upsert(labels, label.clone())
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn modify<T, F>(&self, collection: Collection, seed: fn() -> Vec<T>, apply: F) -> StoreResult<()>
    where
        T: Serialize + DeserializeOwned + Keyed,
        F: FnOnce(&mut Vec<T>),
    {
        let conn = self.lock()?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
        let mut items = read_collection(&tx, collection)?.unwrap_or_else(seed);
        apply(&mut items);
        write_collection(&tx, collection, &items)?;
        tx.commit()?;
        debug!(
            "event=slot_write module=store backend=local collection={} count={}",
            collection.name(),
            items.len()
        );
        Ok(())
    }
}

#[async_trait]
impl TaskStore for LocalStore {
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        self.load_tasks()
    }

    async fn save_task(&self, task: &Task) -> StoreResult<()> {
        self.upsert_task(task)
    }

    async fn delete_task(&self, id: &str) -> StoreResult<()> {
        self.remove_task(id)
    }

    async fn delete_tasks(&self, ids: &[TaskId]) -> StoreResult<()> {
        self.remove_tasks(ids)
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        self.load_projects()
    }

    async fn save_project(&self, project: &Project) -> StoreResult<()> {
        self.upsert_project(project)
    }

    async fn list_sections(&self, project_id: Option<&str>) -> StoreResult<Vec<Section>> {
        self.load_sections(project_id)
    }

    async fn save_section(&self, section: &Section) -> StoreResult<()> {
        self.upsert_section(section)
    }

    async fn delete_section(&self, id: &str) -> StoreResult<()> {
        self.remove_section(id)
    }

    async fn list_labels(&self) -> StoreResult<Vec<Label>> {
        self.load_labels()
    }

    async fn save_label(&self, label: &Label) -> StoreResult<()> {
        self.upsert_label(label)
    }
}

fn read_slot(conn: &Connection, key: &str) -> StoreResult<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM kv_slots WHERE key = ?1;",
            [key],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(value)
}

fn read_collection<T: DeserializeOwned>(
    conn: &Connection,
    collection: Collection,
) -> StoreResult<Option<Vec<T>>> {
    let Some(raw) = read_slot(conn, collection.slot_key())? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(items) => Ok(Some(items)),
        Err(err) => {
            warn!(
                "event=slot_parse module=store status=error backend=local collection={} error={err}",
                collection.name()
            );
            Ok(None)
        }
    }
}

fn write_collection<T: Serialize>(
    conn: &Connection,
    collection: Collection,
    items: &[T],
) -> StoreResult<()> {
    let raw = serde_json::to_string(items)?;
    conn.execute(
        "INSERT INTO kv_slots (key, value, updated_at)
         VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
         ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at;",
        params![collection.slot_key(), raw],
    )?;
    Ok(())
}
