use chrono::NaiveDate;
use doit_core::config::AiConfig;
use doit_core::{DueDate, GeminiAssistant, OfflineAssistant, Priority, TaskAssistant};
use mockito::Matcher;
use serde_json::json;
use std::time::Duration;

const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
}

fn assistant_for(server: &mockito::ServerGuard) -> GeminiAssistant {
    GeminiAssistant::new(
        Some("test-key".to_string()),
        "gemini-2.5-flash",
        &server.url(),
        Duration::from_secs(5),
    )
}

fn reply_with_text(text: &str) -> String {
    json!({
        "candidates": [
            { "content": { "role": "model", "parts": [{ "text": text }] } }
        ]
    })
    .to_string()
}

#[tokio::test]
async fn missing_credential_returns_raw_input() {
    let assistant = GeminiAssistant::from_config(&AiConfig::default());
    assert!(!assistant.is_enabled());

    let parsed = assistant
        .parse_natural_language("buy milk tomorrow", today())
        .await;
    assert_eq!(parsed.content, "buy milk tomorrow");
    assert_eq!(parsed.priority, Priority::Normal);
    assert!(parsed.due_string.is_none());
    assert!(parsed.due_date.is_none());
    assert!(parsed.description.is_none());

    assert!(assistant.generate_subtasks("buy milk").await.is_empty());
    assert!(OfflineAssistant.generate_subtasks("buy milk").await.is_empty());
}

#[tokio::test]
async fn structured_reply_becomes_parsed_task() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", GENERATE_PATH)
        .match_header("x-goog-api-key", "test-key")
        .match_body(Matcher::PartialJson(json!({
            "generationConfig": { "responseMimeType": "application/json" }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(reply_with_text(
            r#"{"content":"Buy milk","priority":3,"dueString":"tomorrow","dueDate":"2026-03-11"}"#,
        ))
        .create_async()
        .await;

    let parsed = assistant_for(&server)
        .parse_natural_language("buy milk tomorrow p2", today())
        .await;

    mock.assert_async().await;
    assert_eq!(parsed.content, "Buy milk");
    assert_eq!(parsed.priority, Priority::High);
    assert_eq!(parsed.due_string.as_deref(), Some("tomorrow"));
    assert_eq!(
        parsed.due_date,
        Some(DueDate::Day(NaiveDate::from_ymd_opt(2026, 3, 11).unwrap()))
    );
}

#[tokio::test]
async fn prompt_carries_reference_date() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", GENERATE_PATH)
        .match_body(Matcher::Regex("2026-03-10".to_string()))
        .with_status(200)
        .with_body(reply_with_text(r#"{"content":"x","priority":1}"#))
        .create_async()
        .await;

    assistant_for(&server)
        .parse_natural_language("x", today())
        .await;
    mock.assert_async().await;
}

#[tokio::test]
async fn unusable_replies_fall_back() {
    let cases = [
        (200, reply_with_text("not json at all")),
        (200, reply_with_text(r#"{"content":"   ","priority":2}"#)),
        (200, reply_with_text(r#"{"content":"x","dueDate":"someday"}"#)),
        (200, json!({ "candidates": [] }).to_string()),
        (500, "boom".to_string()),
    ];

    for (status, body) in cases {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", GENERATE_PATH)
            .with_status(status)
            .with_body(body)
            .create_async()
            .await;

        let parsed = assistant_for(&server)
            .parse_natural_language("call the dentist", today())
            .await;
        assert_eq!(parsed.content, "call the dentist");
        assert_eq!(parsed.priority, Priority::Normal);
        assert!(parsed.due_date.is_none());
    }
}

#[tokio::test]
async fn subtask_titles_are_trimmed_and_failures_are_empty() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", GENERATE_PATH)
        .with_status(200)
        .with_body(reply_with_text(r#"[" Draft outline ","","Collect data","Review"]"#))
        .create_async()
        .await;

    let titles = assistant_for(&server).generate_subtasks("Write report").await;
    assert_eq!(titles, ["Draft outline", "Collect data", "Review"]);

    let mut broken = mockito::Server::new_async().await;
    broken
        .mock("POST", GENERATE_PATH)
        .with_status(200)
        .with_body(reply_with_text(r#"{"not":"a list"}"#))
        .create_async()
        .await;
    assert!(assistant_for(&broken)
        .generate_subtasks("Write report")
        .await
        .is_empty());
}
