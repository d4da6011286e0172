//! Merges an AI parse with the explicit picks of the capture form.
//!
//! Explicit picks always win: a chosen priority, a chosen date (which also
//! rewrites the human label), and a typed description.

use chrono::{DateTime, FixedOffset, NaiveDate};

use super::board::NewTask;
use crate::ai::ParsedTask;
use crate::model::task::{DueDate, Priority, ProjectId, SectionId};

/// A date chosen in the picker, optionally with a time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickedDue {
    pub at: DateTime<FixedOffset>,
    pub has_time: bool,
}

/// Everything the user set by hand next to the free-text input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureOverrides {
    pub priority: Option<Priority>,
    pub due: Option<PickedDue>,
    pub description: Option<String>,
    pub project_id: Option<ProjectId>,
    pub section_id: Option<SectionId>,
}

/// `Today`, `Tomorrow` or `MMM d`, plus ` at HH:mm` when a time was picked.
pub fn due_label(picked: &PickedDue, today: NaiveDate) -> String {
    let day = picked.at.date_naive();
    let mut label = if day == today {
        "Today".to_string()
    } else if today.succ_opt() == Some(day) {
        "Tomorrow".to_string()
    } else {
        day.format("%b %-d").to_string()
    };
    if picked.has_time {
        label.push_str(&format!(" at {}", picked.at.format("%H:%M")));
    }
    label
}

pub fn compose_task(parsed: ParsedTask, overrides: CaptureOverrides, today: NaiveDate) -> NewTask {
    let (due_string, due_date) = match overrides.due {
        Some(picked) => (Some(due_label(&picked, today)), Some(DueDate::from(picked.at))),
        None => (parsed.due_string, parsed.due_date),
    };
    let description = overrides
        .description
        .filter(|text| !text.trim().is_empty())
        .or(parsed.description);

    NewTask {
        content: parsed.content,
        description,
        project_id: overrides.project_id,
        section_id: overrides.section_id,
        priority: overrides.priority.unwrap_or(parsed.priority),
        due_string,
        due_date,
        parent_id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn picked(d: u32, hour: u32, minute: u32, has_time: bool) -> PickedDue {
        let offset = FixedOffset::east_opt(0).unwrap();
        PickedDue {
            at: offset.with_ymd_and_hms(2026, 3, d, hour, minute, 0).unwrap(),
            has_time,
        }
    }

    #[test]
    fn label_uses_relative_words_then_month_day() {
        let today = day(2026, 3, 10);
        assert_eq!(due_label(&picked(10, 0, 0, false), today), "Today");
        assert_eq!(due_label(&picked(11, 9, 5, true), today), "Tomorrow at 09:05");
        assert_eq!(due_label(&picked(20, 0, 0, false), today), "Mar 20");
    }

    #[test]
    fn picks_override_parsed_fields() {
        let today = day(2026, 3, 10);
        let parsed = ParsedTask {
            content: "Call mom".to_string(),
            priority: Priority::High,
            due_string: Some("next week".to_string()),
            due_date: Some(DueDate::Day(day(2026, 3, 17))),
            description: Some("parsed".to_string()),
        };
        let overrides = CaptureOverrides {
            priority: Some(Priority::Urgent),
            due: Some(picked(10, 17, 0, true)),
            description: Some("typed".to_string()),
            ..CaptureOverrides::default()
        };

        let draft = compose_task(parsed, overrides, today);
        assert_eq!(draft.priority, Priority::Urgent);
        assert_eq!(draft.due_string.as_deref(), Some("Today at 17:00"));
        assert_eq!(draft.due_date, Some(DueDate::from(picked(10, 17, 0, true).at)));
        assert_eq!(draft.description.as_deref(), Some("typed"));
    }

    #[test]
    fn parsed_fields_survive_without_picks() {
        let parsed = ParsedTask {
            content: "Pay rent".to_string(),
            priority: Priority::Medium,
            due_string: Some("friday".to_string()),
            due_date: None,
            description: Some("landlord".to_string()),
        };
        let overrides = CaptureOverrides {
            description: Some("   ".to_string()),
            ..CaptureOverrides::default()
        };

        let draft = compose_task(parsed, overrides, day(2026, 3, 10));
        assert_eq!(draft.priority, Priority::Medium);
        assert_eq!(draft.due_string.as_deref(), Some("friday"));
        assert_eq!(draft.description.as_deref(), Some("landlord"));
    }
}
