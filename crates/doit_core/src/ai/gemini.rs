//! Gemini `generateContent` client.
//!
//! Both operations ask for a JSON reply constrained by a response schema and
//! read the text of the first candidate part.

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, info, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use super::error::AiError;
use super::{clean_titles, ParsedTask, TaskAssistant};
use crate::config::AiConfig;
use crate::model::task::{DueDate, Priority};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParseReply {
    content: String,
    #[serde(default)]
    priority: Option<i64>,
    #[serde(default)]
    due_string: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Hosted-model assistant. Without a credential every call falls back at once.
pub struct GeminiAssistant {
    client: Option<Client>,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl GeminiAssistant {
    pub fn new(
        api_key: Option<String>,
        model: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Self {
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        let client = match Client::builder().timeout(timeout).build() {
            Ok(client) => Some(client),
            Err(err) => {
                warn!("event=ai_client_init module=ai status=error error={err}");
                None
            }
        };
        Self {
            client,
            api_key,
            model: model.to_string(),
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                base_url.trim().trim_end_matches('/'),
                model
            ),
        }
    }

    pub fn from_config(config: &AiConfig) -> Self {
        Self::new(
            config.credential().map(str::to_string),
            &config.model,
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Whether calls will reach the network.
    pub fn is_enabled(&self) -> bool {
        self.client.is_some() && self.api_key.is_some()
    }

    async fn generate<T: DeserializeOwned>(
        &self,
        prompt: String,
        schema: Value,
    ) -> Result<Option<T>, AiError> {
        let (Some(client), Some(api_key)) = (&self.client, &self.api_key) else {
            return Ok(None);
        };

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            },
        });
        let response = client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AiError::Status(status.as_u16()));
        }

        let reply: GenerateResponse = response.json().await?;
        let text = reply
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or(AiError::EmptyReply)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    async fn try_parse(&self, text: &str, today: NaiveDate) -> Result<Option<ParsedTask>, AiError> {
        let Some(reply) = self.generate::<ParseReply>(parse_prompt(text, today), parse_schema()).await?
        else {
            return Ok(None);
        };
        validate_parse_reply(reply).map(Some)
    }
}

#[async_trait]
impl TaskAssistant for GeminiAssistant {
    async fn parse_natural_language(&self, text: &str, today: NaiveDate) -> ParsedTask {
        let started_at = Instant::now();
        match self.try_parse(text, today).await {
            Ok(Some(parsed)) => {
                info!(
                    "event=ai_parse module=ai status=ok model={} has_due={} duration_ms={}",
                    self.model,
                    parsed.due_date.is_some() || parsed.due_string.is_some(),
                    started_at.elapsed().as_millis()
                );
                parsed
            }
            Ok(None) => {
                debug!("event=ai_parse module=ai status=fallback reason=missing_credential");
                ParsedTask::fallback(text)
            }
            Err(err) => {
                warn!(
                    "event=ai_parse module=ai status=fallback reason={} model={} duration_ms={} error={err}",
                    err.reason(),
                    self.model,
                    started_at.elapsed().as_millis()
                );
                ParsedTask::fallback(text)
            }
        }
    }

    async fn generate_subtasks(&self, content: &str) -> Vec<String> {
        let started_at = Instant::now();
        let schema = json!({ "type": "ARRAY", "items": { "type": "STRING" } });
        match self.generate::<Vec<String>>(subtask_prompt(content), schema).await {
            Ok(Some(titles)) => {
                let titles = clean_titles(titles);
                info!(
                    "event=ai_subtasks module=ai status=ok model={} count={} duration_ms={}",
                    self.model,
                    titles.len(),
                    started_at.elapsed().as_millis()
                );
                titles
            }
            Ok(None) => {
                debug!("event=ai_subtasks module=ai status=fallback reason=missing_credential");
                Vec::new()
            }
            Err(err) => {
                warn!(
                    "event=ai_subtasks module=ai status=fallback reason={} model={} duration_ms={} error={err}",
                    err.reason(),
                    self.model,
                    started_at.elapsed().as_millis()
                );
                Vec::new()
            }
        }
    }
}

fn parse_prompt(input: &str, today: NaiveDate) -> String {
    format!(
        "Parse this task input into structured data: \"{input}\".\n\
         Current reference date is {}.\n\
         Extract the core task content, any due date/time mentions, and priority \
         (p1=Urgent/4, p2=High/3, p3=Medium/2, p4=Low/1).\n\
         Convert any relative date (tomorrow, next friday) into an ISO 8601 date \
         (YYYY-MM-DD) in the 'dueDate' field.\n\
         If no priority is specified, use 1 (P4).",
        today.format("%Y-%m-%d")
    )
}

fn parse_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "content": {
                "type": "STRING",
                "description": "The main task action text, excluding date and priority keywords"
            },
            "priority": {
                "type": "INTEGER",
                "description": "4 for P1 (Urgent), 3 for P2, 2 for P3, 1 for P4"
            },
            "dueString": {
                "type": "STRING",
                "description": "The date/time text extracted from the input, if any"
            },
            "dueDate": {
                "type": "STRING",
                "description": "ISO 8601 date (YYYY-MM-DD)"
            },
            "description": {
                "type": "STRING",
                "description": "Any extra details mentioned"
            }
        },
        "required": ["content", "priority"]
    })
}

fn subtask_prompt(content: &str) -> String {
    format!(
        "Break down the following task into 3-5 smaller, actionable subtasks: \"{content}\". \
         Return only the subtask titles as a JSON string array."
    )
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn validate_parse_reply(reply: ParseReply) -> Result<ParsedTask, AiError> {
    let content = reply.content.trim().to_string();
    if content.is_empty() {
        return Err(AiError::BlankContent);
    }
    let due_date = non_blank(reply.due_date)
        .map(|raw| raw.parse::<DueDate>())
        .transpose()?;

    Ok(ParsedTask {
        content,
        priority: reply
            .priority
            .map(Priority::from_wire_lossy)
            .unwrap_or_else(Priority::lowest),
        due_string: non_blank(reply.due_string),
        due_date,
        description: non_blank(reply.description),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(json: &str) -> ParseReply {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn reply_maps_priority_and_calendar_date() {
        let parsed = validate_parse_reply(reply(
            r#"{"content":" Buy milk ","priority":4,"dueString":"tomorrow","dueDate":"2026-03-11"}"#,
        ))
        .unwrap();
        assert_eq!(parsed.content, "Buy milk");
        assert_eq!(parsed.priority, Priority::Urgent);
        assert_eq!(parsed.due_string.as_deref(), Some("tomorrow"));
        assert_eq!(
            parsed.due_date,
            Some(DueDate::Day(NaiveDate::from_ymd_opt(2026, 3, 11).unwrap()))
        );
        assert!(parsed.description.is_none());
    }

    #[test]
    fn unknown_or_missing_priority_is_lowest() {
        let parsed = validate_parse_reply(reply(r#"{"content":"x","priority":9}"#)).unwrap();
        assert_eq!(parsed.priority, Priority::Normal);
        let parsed = validate_parse_reply(reply(r#"{"content":"x"}"#)).unwrap();
        assert_eq!(parsed.priority, Priority::Normal);
    }

    #[test]
    fn blank_content_and_bad_date_are_rejected() {
        assert!(matches!(
            validate_parse_reply(reply(r#"{"content":"  ","priority":1}"#)),
            Err(AiError::BlankContent)
        ));
        assert!(matches!(
            validate_parse_reply(reply(r#"{"content":"x","dueDate":"next friday"}"#)),
            Err(AiError::DueDate(_))
        ));
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let assistant = GeminiAssistant::new(
            None,
            "gemini-2.5-flash",
            "http://localhost:1234/",
            Duration::from_secs(1),
        );
        assert_eq!(
            assistant.endpoint,
            "http://localhost:1234/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert!(!assistant.is_enabled());
    }
}
