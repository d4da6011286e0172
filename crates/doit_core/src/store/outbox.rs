//! Durable queue of writes the board could not mirror yet.
//!
//! # Responsibility
//! - Keep unconfirmed writes, with the entity snapshot needed to replay them,
//!   across process restarts.
//!
//! # Invariants
//! - At most one row per `(op, entity_id)`; the table is replaced as a whole.
//! - A row that no longer decodes is logged and dropped on load.

use log::{debug, warn};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::{StoreError, StoreResult};
use crate::db::{open_db, open_db_in_memory};
use crate::model::catalog::{Project, Section};
use crate::model::task::{SectionId, Task, TaskId};

/// An unconfirmed write and what it needs to be replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueuedWrite {
    SaveTask(Task),
    DeleteTask(TaskId),
    SaveProject(Project),
    SaveSection(Section),
    DeleteSection(SectionId),
}

impl QueuedWrite {
    pub fn op(&self) -> &'static str {
        match self {
            Self::SaveTask(_) => "save_task",
            Self::DeleteTask(_) => "delete_task",
            Self::SaveProject(_) => "save_project",
            Self::SaveSection(_) => "save_section",
            Self::DeleteSection(_) => "delete_section",
        }
    }

    pub fn entity_id(&self) -> &str {
        match self {
            Self::SaveTask(task) => &task.id,
            Self::SaveProject(project) => &project.id,
            Self::SaveSection(section) => &section.id,
            Self::DeleteTask(id) | Self::DeleteSection(id) => id,
        }
    }

    fn payload(&self) -> StoreResult<Option<String>> {
        let raw = match self {
            Self::SaveTask(task) => serde_json::to_string(task)?,
            Self::SaveProject(project) => serde_json::to_string(project)?,
            Self::SaveSection(section) => serde_json::to_string(section)?,
            Self::DeleteTask(_) | Self::DeleteSection(_) => return Ok(None),
        };
        Ok(Some(raw))
    }

    fn decode(op: &str, entity_id: String, payload: Option<&str>) -> Option<Self> {
        match op {
            "save_task" => snapshot(payload).map(Self::SaveTask),
            "delete_task" => Some(Self::DeleteTask(entity_id)),
            "save_project" => snapshot(payload).map(Self::SaveProject),
            "save_section" => snapshot(payload).map(Self::SaveSection),
            "delete_section" => Some(Self::DeleteSection(entity_id)),
            _ => None,
        }
    }
}

fn snapshot<T: DeserializeOwned>(payload: Option<&str>) -> Option<T> {
    serde_json::from_str(payload?).ok()
}

/// SQLite-backed outbox. May share a file with [`super::LocalStore`].
pub struct Outbox {
    conn: Mutex<Connection>,
}

impl Outbox {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn in_memory() -> StoreResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Queued writes in the order they were first recorded.
    pub fn load(&self) -> StoreResult<Vec<QueuedWrite>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT op, entity_id, payload FROM write_outbox ORDER BY seq;",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;

        let mut writes = Vec::new();
        for row in rows {
            let (op, entity_id, payload) = row?;
            match QueuedWrite::decode(&op, entity_id.clone(), payload.as_deref()) {
                Some(write) => writes.push(write),
                None => warn!(
                    "event=outbox_load module=store status=error op={op} entity_id={entity_id} reason=undecodable"
                ),
            }
        }
        Ok(writes)
    }

    /// Makes `writes` the complete queue.
    pub fn replace(&self, writes: &[QueuedWrite]) -> StoreResult<()> {
        let conn = self.lock()?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM write_outbox;", [])?;
        for (position, write) in writes.iter().enumerate() {
            tx.execute(
                "INSERT OR REPLACE INTO write_outbox (op, entity_id, payload, seq)
                 VALUES (?1, ?2, ?3, ?4);",
                params![write.op(), write.entity_id(), write.payload()?, position as i64],
            )?;
        }
        tx.commit()?;
        debug!(
            "event=outbox_write module=store status=ok queued={}",
            writes.len()
        );
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_round_trips_snapshots_in_order() {
        let outbox = Outbox::in_memory().unwrap();
        let writes = vec![
            QueuedWrite::SaveTask(Task::with_id("t-1", "draft")),
            QueuedWrite::DeleteSection("s-1".to_string()),
            QueuedWrite::DeleteTask("t-0".to_string()),
        ];
        outbox.replace(&writes).unwrap();
        assert_eq!(outbox.load().unwrap(), writes);

        outbox.replace(&writes[1..]).unwrap();
        assert_eq!(outbox.load().unwrap(), writes[1..]);
    }

    #[test]
    fn undecodable_rows_are_dropped() {
        let outbox = Outbox::in_memory().unwrap();
        {
            let conn = outbox.lock().unwrap();
            conn.execute_batch(
                "INSERT INTO write_outbox (op, entity_id, payload, seq)
                 VALUES ('save_task', 't-1', '{not json', 0),
                        ('rename_task', 't-2', NULL, 1),
                        ('delete_task', 't-3', NULL, 2);",
            )
            .unwrap();
        }

        assert_eq!(
            outbox.load().unwrap(),
            [QueuedWrite::DeleteTask("t-3".to_string())]
        );
    }
}
