use doit_core::{Priority, RemoteStore, Section, StoreError, Task, TaskStore};
use mockito::Matcher;
use serde_json::{json, Map, Value};
use std::time::Duration;

fn store_for(server: &mockito::ServerGuard, token: Option<&str>) -> RemoteStore {
    RemoteStore::new(
        &format!("{}/api", server.url()),
        token.map(str::to_string),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn list_tasks_merges_ids_and_skips_malformed_documents() {
    let mut server = mockito::Server::new_async().await;
    let listing = json!({
        "documents": [
            {
                "id": "t-1",
                "data": {
                    "content": "Pay rent",
                    "priority": 4,
                    "isCompleted": false,
                    "projectId": "inbox",
                    "labels": [],
                    "createdAt": 1_700_000_000_000_i64
                }
            },
            { "id": "t-2", "data": { "priority": "high" } }
        ]
    });
    let mock = server
        .mock("GET", "/api/tasks")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(listing.to_string())
        .create_async()
        .await;

    let tasks = store_for(&server, None).list_tasks().await.unwrap();

    mock.assert_async().await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, "t-1");
    assert_eq!(tasks[0].priority, Priority::Urgent);
}

#[tokio::test]
async fn save_task_puts_full_document_without_id() {
    let mut server = mockito::Server::new_async().await;
    let task = Task::with_id("t-9", "Write report");
    let mock = server
        .mock("PUT", "/api/tasks/t-9")
        .match_header("authorization", "Bearer secret")
        .match_body(Matcher::PartialJson(json!({
            "content": "Write report",
            "projectId": "inbox",
            "isCompleted": false,
            "priority": 1
        })))
        .with_status(200)
        .create_async()
        .await;

    store_for(&server, Some("secret"))
        .save_task(&task)
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn update_task_fields_sends_patch() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PATCH", "/api/tasks/t-1")
        .match_body(Matcher::Json(json!({ "isCompleted": true })))
        .with_status(204)
        .create_async()
        .await;

    let mut fields = Map::new();
    fields.insert("isCompleted".to_string(), Value::Bool(true));
    store_for(&server, None)
        .update_task_fields("t-1", fields)
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn delete_treats_missing_document_as_done() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("DELETE", "/api/tasks/gone")
        .with_status(404)
        .create_async()
        .await;

    store_for(&server, None).delete_task("gone").await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn non_success_status_surfaces_as_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("PUT", "/api/sections/s-1")
        .with_status(503)
        .with_body("maintenance")
        .create_async()
        .await;

    let section = Section {
        id: "s-1".to_string(),
        project_id: "inbox".to_string(),
        name: "Later".to_string(),
        order: 3,
    };
    let err = store_for(&server, None)
        .save_section(&section)
        .await
        .unwrap_err();
    match err {
        StoreError::Status {
            collection,
            status,
            message,
        } => {
            assert_eq!(collection, "sections");
            assert_eq!(status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn empty_collections_fall_back_to_defaults_and_sections_sort() {
    let mut server = mockito::Server::new_async().await;
    let empty = json!({ "documents": [] }).to_string();
    server
        .mock("GET", "/api/labels")
        .with_status(200)
        .with_body(&empty)
        .create_async()
        .await;
    server
        .mock("GET", "/api/projects")
        .with_status(200)
        .with_body(&empty)
        .create_async()
        .await;
    server
        .mock("GET", "/api/sections")
        .with_status(200)
        .with_body(
            json!({
                "documents": [
                    { "id": "b", "data": { "projectId": "inbox", "name": "B", "order": 2 } },
                    { "id": "a1", "data": { "projectId": "inbox", "name": "A1", "order": 1 } },
                    { "id": "w", "data": { "projectId": "work", "name": "W", "order": 0 } },
                    { "id": "a2", "data": { "projectId": "inbox", "name": "A2", "order": 1 } }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let store = store_for(&server, None);
    let labels = store.list_labels().await.unwrap();
    assert_eq!(labels.len(), 2);
    assert_eq!(labels[0].name, "Urgent");

    let projects = store.list_projects().await.unwrap();
    assert!(projects.iter().any(|project| project.id == "inbox"));

    let ids: Vec<_> = store
        .list_sections(Some("inbox"))
        .await
        .unwrap()
        .into_iter()
        .map(|section| section.id)
        .collect();
    assert_eq!(ids, ["a1", "a2", "b"]);
}
