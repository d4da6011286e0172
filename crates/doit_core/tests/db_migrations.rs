use doit_core::db::migrations::latest_version;
use doit_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;
use std::error::Error;

#[test]
fn fresh_database_has_slots_and_outbox() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(latest_version(), 2);
    assert_eq!(schema_version(&conn), 2);
    assert_eq!(table_names(&conn), ["kv_slots", "write_outbox"]);
}

#[test]
fn version_one_file_upgrades_and_keeps_its_slots() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doit.db");

    let legacy = Connection::open(&path).unwrap();
    legacy
        .execute_batch(include_str!("../src/db/migrations/0001_kv_slots.sql"))
        .unwrap();
    legacy
        .execute_batch(
            "INSERT INTO kv_slots (key, value) VALUES ('doit_tasks', '[]');
             PRAGMA user_version = 1;",
        )
        .unwrap();
    drop(legacy);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), 2);
    assert_eq!(table_names(&conn), ["kv_slots", "write_outbox"]);
    let tasks: String = conn
        .query_row(
            "SELECT value FROM kv_slots WHERE key = 'doit_tasks';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(tasks, "[]");
}

#[test]
fn reopening_leaves_outbox_rows_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doit.db");

    let first = open_db(&path).unwrap();
    first
        .execute(
            "INSERT INTO write_outbox (op, entity_id, seq) VALUES ('delete_task', 't-1', 0);",
            [],
        )
        .unwrap();
    drop(first);

    let second = open_db(&path).unwrap();
    let queued: i64 = second
        .query_row("SELECT COUNT(*) FROM write_outbox;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(queued, 1);
}

#[test]
fn file_from_a_newer_build_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    assert!(err.source().is_none());
    match err {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn table_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name;")
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}
