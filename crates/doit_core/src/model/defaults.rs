//! Seed data used when a backend has nothing persisted yet.

use super::catalog::{Label, Project, Section, ViewStyle};

/// Reserved project every unassigned task belongs to.
pub const INBOX_PROJECT_ID: &str = "inbox";

pub fn inbox_project() -> Project {
    Project {
        id: INBOX_PROJECT_ID.to_string(),
        name: "Inbox".to_string(),
        color: "#808080".to_string(),
        is_favorite: false,
        view_style: ViewStyle::List,
    }
}

pub fn default_projects() -> Vec<Project> {
    vec![
        inbox_project(),
        Project {
            id: "personal".to_string(),
            name: "Personal".to_string(),
            color: "#DC4C3E".to_string(),
            is_favorite: true,
            view_style: ViewStyle::List,
        },
        Project {
            id: "work".to_string(),
            name: "Work".to_string(),
            color: "#4169E1".to_string(),
            is_favorite: true,
            view_style: ViewStyle::Board,
        },
    ]
}

pub fn default_labels() -> Vec<Label> {
    vec![
        Label {
            id: "urgent".to_string(),
            name: "Urgent".to_string(),
            color: "#DC4C3E".to_string(),
        },
        Label {
            id: "marketing".to_string(),
            name: "Marketing".to_string(),
            color: "#E8A87C".to_string(),
        },
    ]
}

pub fn default_sections() -> Vec<Section> {
    vec![
        Section {
            id: "bot".to_string(),
            project_id: INBOX_PROJECT_ID.to_string(),
            name: "Bot Management".to_string(),
            order: 0,
        },
        Section {
            id: "general".to_string(),
            project_id: INBOX_PROJECT_ID.to_string(),
            name: "General".to_string(),
            order: 1,
        },
    ]
}
