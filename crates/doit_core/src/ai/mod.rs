//! Optional AI enrichment for task capture.
//!
//! # Responsibility
//! - Turn free text into structured task fields.
//! - Propose short subtask titles for an existing task.
//!
//! # Invariants
//! - Assistant calls never fail from the caller's perspective: any problem
//!   degrades to [`ParsedTask::fallback`] or an empty title list.
//! - A missing credential short-circuits before any network I/O.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::model::task::{DueDate, Priority};

mod error;
pub mod gemini;

pub use gemini::GeminiAssistant;

/// Structured fields extracted from a capture line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTask {
    pub content: String,
    pub priority: Priority,
    pub due_string: Option<String>,
    pub due_date: Option<DueDate>,
    pub description: Option<String>,
}

impl ParsedTask {
    /// Raw input kept as content, lowest priority, nothing else.
    pub fn fallback(input: &str) -> Self {
        Self {
            content: input.to_string(),
            priority: Priority::lowest(),
            due_string: None,
            due_date: None,
            description: None,
        }
    }
}

#[async_trait]
pub trait TaskAssistant: Send + Sync {
    /// Parses `text` relative to `today`.
    async fn parse_natural_language(&self, text: &str, today: NaiveDate) -> ParsedTask;

    /// Returns candidate subtask titles, or nothing.
    async fn generate_subtasks(&self, content: &str) -> Vec<String>;
}

/// Assistant used when no AI service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineAssistant;

#[async_trait]
impl TaskAssistant for OfflineAssistant {
    async fn parse_natural_language(&self, text: &str, _today: NaiveDate) -> ParsedTask {
        ParsedTask::fallback(text)
    }

    async fn generate_subtasks(&self, _content: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Trims titles and drops blank ones.
pub(crate) fn clean_titles(titles: Vec<String>) -> Vec<String> {
    titles
        .into_iter()
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .collect()
}
