//! Project, section and label records.

use serde::{Deserialize, Serialize};

use super::task::{new_id, LabelId, ProjectId, SectionId};

/// Layout hint for a project. `Board` is stored but no behavior reads it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewStyle {
    #[default]
    List,
    Board,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    /// Display color, `#RRGGBB`.
    pub color: String,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub view_style: ViewStyle,
}

impl Project {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            color: color.into(),
            is_favorite: false,
            view_style: ViewStyle::List,
        }
    }
}

/// Named group of tasks inside one project.
///
/// Sections display in ascending `order`; equal orders keep insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: SectionId,
    pub project_id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub order: i64,
}

impl Section {
    pub fn new(project_id: impl Into<ProjectId>, name: impl Into<String>, order: i64) -> Self {
        Self {
            id: new_id(),
            project_id: project_id.into(),
            name: name.into(),
            order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: LabelId,
    pub name: String,
    pub color: String,
}

/// Stable sort by `order`; ties keep their relative input sequence.
pub fn sort_sections(sections: &mut [Section]) {
    sections.sort_by_key(|section| section.order);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_sections_is_stable_for_equal_orders() {
        let mut sections = vec![
            Section::new("inbox", "c", 2),
            Section::new("inbox", "a1", 1),
            Section::new("inbox", "a2", 1),
            Section::new("inbox", "z", 0),
        ];
        sort_sections(&mut sections);
        let names: Vec<_> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["z", "a1", "a2", "c"]);
    }

    #[test]
    fn view_style_defaults_to_list_when_missing() {
        let project: Project =
            serde_json::from_str(r##"{"id":"p","name":"P","color":"#000000"}"##).unwrap();
        assert_eq!(project.view_style, ViewStyle::List);
        assert!(!project.is_favorite);
    }
}
