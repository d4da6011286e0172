//! Task domain model.
//!
//! # Responsibility
//! - Define the task record shared by every projection and backend.
//! - Own the priority scale and the due-date representation.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `parent_id`, when set, names another task in the same collection.
//! - `due_string` and `due_date` are independent; neither is derived from
//!   the other.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

use super::defaults::INBOX_PROJECT_ID;

pub type TaskId = String;
pub type ProjectId = String;
pub type SectionId = String;
pub type LabelId = String;

/// Generates a fresh opaque identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Four-level urgency scale.
///
/// Declaration order is ascending urgency, so `Ord` compares by urgency.
/// Persisted as the integers `1..=4` (`P4 = 1`, `P1 = 4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    /// P4, the default.
    Normal,
    /// P3.
    Medium,
    /// P2.
    High,
    /// P1.
    Urgent,
}

impl Priority {
    /// Every level, most urgent first (Filters page order).
    pub const ALL: [Priority; 4] = [
        Priority::Urgent,
        Priority::High,
        Priority::Medium,
        Priority::Normal,
    ];

    pub fn lowest() -> Self {
        Priority::Normal
    }

    /// Short user-facing label (`P1`..`P4`).
    pub fn label(self) -> &'static str {
        match self {
            Priority::Urgent => "P1",
            Priority::High => "P2",
            Priority::Medium => "P3",
            Priority::Normal => "P4",
        }
    }

    /// Maps a wire value, treating anything unknown as the lowest level.
    pub fn from_wire_lossy(value: i64) -> Self {
        u8::try_from(value)
            .ok()
            .and_then(|value| Priority::try_from(value).ok())
            .unwrap_or_else(Priority::lowest)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::lowest()
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        match value {
            Priority::Normal => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Urgent => 4,
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::Normal),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::High),
            4 => Ok(Priority::Urgent),
            other => Err(format!("priority must be within 1..=4, got {other}")),
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Priority {
    type Err = String;

    /// Accepts `p1`..`p4` (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "p1" => Ok(Priority::Urgent),
            "p2" => Ok(Priority::High),
            "p3" => Ok(Priority::Medium),
            "p4" => Ok(Priority::Normal),
            other => Err(format!("unknown priority `{other}`; expected p1|p2|p3|p4")),
        }
    }
}

/// Machine-readable due date.
///
/// Either a bare calendar day (`YYYY-MM-DD`) or an instant in RFC 3339 form.
/// Both forms round-trip through their string representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueDate {
    Day(NaiveDate),
    Instant(DateTime<FixedOffset>),
}

impl DueDate {
    /// Calendar day in local time.
    pub fn calendar_day(&self) -> NaiveDate {
        self.calendar_day_in(&Local)
    }

    /// Calendar day as observed in `tz`. Bare days are zone-independent.
    pub fn calendar_day_in<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        match self {
            DueDate::Day(day) => *day,
            DueDate::Instant(instant) => instant.with_timezone(tz).date_naive(),
        }
    }

    /// Whether this due date lands on `day` in local time.
    pub fn falls_on(&self, day: NaiveDate) -> bool {
        self.calendar_day() == day
    }
}

impl From<NaiveDate> for DueDate {
    fn from(value: NaiveDate) -> Self {
        DueDate::Day(value)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for DueDate {
    fn from(value: DateTime<Tz>) -> Self {
        DueDate::Instant(value.fixed_offset())
    }
}

impl Display for DueDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DueDate::Day(day) => write!(f, "{}", day.format("%Y-%m-%d")),
            DueDate::Instant(instant) => {
                f.write_str(&instant.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
        }
    }
}

/// Rejected due-date text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueDateParseError(pub String);

impl Display for DueDateParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid due date `{}`; expected YYYY-MM-DD or RFC 3339",
            self.0
        )
    }
}

impl Error for DueDateParseError {}

impl FromStr for DueDate {
    type Err = DueDateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(day) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Ok(DueDate::Day(day));
        }
        DateTime::parse_from_rfc3339(trimmed)
            .map(DueDate::Instant)
            .map_err(|_| DueDateParseError(trimmed.to_string()))
    }
}

impl Serialize for DueDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DueDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

/// Validation failures for task records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyContent,
    EmptyProject,
    SelfParent(TaskId),
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyContent => write!(f, "task content must not be blank"),
            Self::EmptyProject => write!(f, "task project must not be blank"),
            Self::SelfParent(id) => write!(f, "task cannot be its own parent: {id}"),
        }
    }
}

impl Error for TaskValidationError {}

/// A single to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    /// Human label such as "Today at 17:00". Free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DueDate>,
    #[serde(default)]
    pub is_completed: bool,
    pub project_id: ProjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<SectionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
    #[serde(default)]
    pub labels: Vec<LabelId>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Task {
    /// Creates an open inbox task with a generated ID and default fields.
    pub fn new(content: impl Into<String>) -> Self {
        Self::with_id(new_id(), content)
    }

    /// Creates an open inbox task with a caller-provided ID.
    ///
    /// Used by import paths and tests where identity already exists.
    pub fn with_id(id: impl Into<TaskId>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            description: None,
            priority: Priority::lowest(),
            due_string: None,
            due_date: None,
            is_completed: false,
            project_id: INBOX_PROJECT_ID.to_string(),
            section_id: None,
            parent_id: None,
            labels: Vec::new(),
            created_at: now_epoch_ms(),
        }
    }

    /// Checks record-local invariants.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.content.trim().is_empty() {
            return Err(TaskValidationError::EmptyContent);
        }
        if self.project_id.trim().is_empty() {
            return Err(TaskValidationError::EmptyProject);
        }
        if self.parent_id.as_deref() == Some(self.id.as_str()) {
            return Err(TaskValidationError::SelfParent(self.id.clone()));
        }
        Ok(())
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// `due_string` mentions "today" (case-insensitive).
    pub fn due_string_says_today(&self) -> bool {
        self.due_string
            .as_deref()
            .is_some_and(|label| label.to_lowercase().contains("today"))
    }

    /// `due_date` lands on `day` in local time.
    pub fn is_due_on(&self, day: NaiveDate) -> bool {
        self.due_date.is_some_and(|due| due.falls_on(day))
    }

    pub fn has_label(&self, label_id: &str) -> bool {
        self.labels.iter().any(|label| label == label_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_orders_by_urgency_and_uses_wire_integers() {
        assert!(Priority::Urgent > Priority::High);
        assert!(Priority::Medium > Priority::Normal);
        assert_eq!(serde_json::to_string(&Priority::Urgent).unwrap(), "4");
        assert_eq!(
            serde_json::from_str::<Priority>("1").unwrap(),
            Priority::Normal
        );
        assert!(serde_json::from_str::<Priority>("9").is_err());
    }

    #[test]
    fn lossy_wire_mapping_falls_back_to_lowest() {
        assert_eq!(Priority::from_wire_lossy(3), Priority::High);
        assert_eq!(Priority::from_wire_lossy(0), Priority::Normal);
        assert_eq!(Priority::from_wire_lossy(-2), Priority::Normal);
        assert_eq!(Priority::from_wire_lossy(400), Priority::Normal);
    }

    #[test]
    fn due_date_accepts_day_and_instant_forms() {
        let day: DueDate = "2026-10-19".parse().unwrap();
        assert_eq!(
            day,
            DueDate::Day(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap())
        );
        assert_eq!(day.to_string(), "2026-10-19");

        let instant: DueDate = "2026-10-19T08:30:00.000Z".parse().unwrap();
        assert_eq!(instant.to_string(), "2026-10-19T08:30:00Z");

        let precise: DueDate = "2026-10-19T08:30:00.123456+02:00".parse().unwrap();
        assert_eq!(precise.to_string(), "2026-10-19T08:30:00.123456+02:00");
        assert_eq!(
            instant.calendar_day_in(&Utc),
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
        );

        assert!("next friday".parse::<DueDate>().is_err());
    }

    #[test]
    fn task_serializes_with_camel_case_fields() {
        let mut task = Task::with_id("t1", "write report");
        task.parent_id = Some("p".to_string());
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["projectId"], "inbox");
        assert_eq!(value["parentId"], "p");
        assert_eq!(value["isCompleted"], false);
        assert_eq!(value["priority"], 1);
        assert!(value.get("dueDate").is_none());
    }

    #[test]
    fn validate_rejects_blank_content_and_self_parent() {
        let mut task = Task::with_id("t1", "   ");
        assert_eq!(task.validate(), Err(TaskValidationError::EmptyContent));

        task.content = "ok".to_string();
        task.parent_id = Some("t1".to_string());
        assert_eq!(
            task.validate(),
            Err(TaskValidationError::SelfParent("t1".to_string()))
        );
    }

    #[test]
    fn due_string_heuristic_is_case_insensitive() {
        let mut task = Task::new("call mom");
        task.due_string = Some("Today at 5pm".to_string());
        assert!(task.due_string_says_today());
        task.due_string = Some("Tomorrow".to_string());
        assert!(!task.due_string_says_today());
    }
}
