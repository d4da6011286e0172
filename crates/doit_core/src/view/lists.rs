//! List pages: Inbox, Today, Project, and the Filters drill-downs.

use chrono::NaiveDate;
use std::collections::HashSet;

use crate::model::catalog::Section;
use crate::model::defaults::INBOX_PROJECT_ID;
use crate::model::task::{Priority, Task};

/// Tasks of one section, in list order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionGroup<'a> {
    pub section: &'a Section,
    pub tasks: Vec<&'a Task>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboxView<'a> {
    /// Shown first.
    pub unsectioned: Vec<&'a Task>,
    /// One group per inbox section, by ascending `order`.
    pub sections: Vec<SectionGroup<'a>>,
    /// Tasks whose `section_id` names a section that no longer exists.
    pub orphaned: Vec<&'a Task>,
}

/// Root tasks of one page plus how many are still open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskList<'a> {
    pub tasks: Vec<&'a Task>,
    pub open_count: usize,
}

impl<'a> TaskList<'a> {
    fn from_tasks(tasks: Vec<&'a Task>) -> Self {
        let open_count = tasks.iter().filter(|task| !task.is_completed).count();
        Self { tasks, open_count }
    }
}

pub fn inbox<'a>(
    tasks: &'a [Task],
    sections: impl IntoIterator<Item = &'a Section>,
) -> InboxView<'a> {
    let mut inbox_sections: Vec<&Section> = sections
        .into_iter()
        .filter(|section| section.project_id == INBOX_PROJECT_ID)
        .collect();
    inbox_sections.sort_by_key(|section| section.order);
    let known: HashSet<&str> = inbox_sections
        .iter()
        .copied()
        .map(|section| section.id.as_str())
        .collect();

    let roots = || {
        tasks
            .iter()
            .filter(|task| task.project_id == INBOX_PROJECT_ID && task.is_root())
    };

    InboxView {
        unsectioned: roots().filter(|task| task.section_id.is_none()).collect(),
        sections: inbox_sections
            .into_iter()
            .map(|section| SectionGroup {
                section,
                tasks: roots()
                    .filter(|task| task.section_id.as_deref() == Some(section.id.as_str()))
                    .collect(),
            })
            .collect(),
        orphaned: roots()
            .filter(|task| {
                task.section_id
                    .as_deref()
                    .is_some_and(|id| !known.contains(id))
            })
            .collect(),
    }
}

/// Root tasks labelled "today" or dated `today`, each once.
pub fn today(tasks: &[Task], today: NaiveDate) -> TaskList<'_> {
    TaskList::from_tasks(
        tasks
            .iter()
            .filter(|task| task.is_root())
            .filter(|task| task.due_string_says_today() || task.is_due_on(today))
            .collect(),
    )
}

pub fn project<'a>(tasks: &'a [Task], project_id: &str) -> TaskList<'a> {
    TaskList::from_tasks(
        tasks
            .iter()
            .filter(|task| task.is_root() && task.project_id == project_id)
            .collect(),
    )
}

/// Open tasks of one priority, subtasks included.
pub fn by_priority(tasks: &[Task], priority: Priority) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|task| !task.is_completed && task.priority == priority)
        .collect()
}

pub fn by_label<'a>(tasks: &'a [Task], label_id: &str) -> Vec<&'a Task> {
    tasks.iter().filter(|task| task.has_label(label_id)).collect()
}

/// Case-insensitive match on content or description. A blank query matches nothing.
pub fn search<'a>(tasks: &'a [Task], query: &str) -> Vec<&'a Task> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    tasks
        .iter()
        .filter(|task| {
            task.content.to_lowercase().contains(&needle)
                || task
                    .description
                    .as_deref()
                    .is_some_and(|text| text.to_lowercase().contains(&needle))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str) -> Task {
        Task::with_id(id, id)
    }

    #[test]
    fn inbox_groups_unsectioned_first_then_by_order() {
        let late = Section {
            id: "late".to_string(),
            project_id: INBOX_PROJECT_ID.to_string(),
            name: "Late".to_string(),
            order: 5,
        };
        let early = Section {
            id: "early".to_string(),
            project_id: INBOX_PROJECT_ID.to_string(),
            name: "Early".to_string(),
            order: 1,
        };
        let mut in_late = task("a");
        in_late.section_id = Some("late".to_string());
        let loose = task("b");
        let mut orphan = task("c");
        orphan.section_id = Some("deleted".to_string());
        let mut sub = task("d");
        sub.parent_id = Some("b".to_string());
        let tasks = vec![in_late, loose, orphan, sub];
        let sections = vec![late, early];

        let view = inbox(&tasks, &sections);
        assert_eq!(view.unsectioned.len(), 1);
        assert_eq!(view.unsectioned[0].id, "b");
        let names: Vec<_> = view.sections.iter().map(|g| g.section.id.as_str()).collect();
        assert_eq!(names, ["early", "late"]);
        assert!(view.sections[0].tasks.is_empty());
        assert_eq!(view.sections[1].tasks[0].id, "a");
        assert_eq!(view.orphaned.len(), 1);
        assert_eq!(view.orphaned[0].id, "c");
    }

    #[test]
    fn search_matches_description_and_ignores_blank_query() {
        let mut with_notes = task("a");
        with_notes.content = "Write report".to_string();
        with_notes.description = Some("Quarterly NUMBERS".to_string());
        let tasks = vec![with_notes, task("b")];

        assert_eq!(search(&tasks, "numbers").len(), 1);
        assert_eq!(search(&tasks, "REPORT").len(), 1);
        assert!(search(&tasks, "   ").is_empty());
    }

    #[test]
    fn project_counts_only_open_roots() {
        let mut done = task("a");
        done.project_id = "work".to_string();
        done.is_completed = true;
        let mut open = task("b");
        open.project_id = "work".to_string();
        let mut child = task("c");
        child.project_id = "work".to_string();
        child.parent_id = Some("b".to_string());
        let tasks = vec![done, open, child];

        let list = project(&tasks, "work");
        assert_eq!(list.tasks.len(), 2);
        assert_eq!(list.open_count, 1);
    }
}
