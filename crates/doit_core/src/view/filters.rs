//! Filters & Labels page.

use crate::model::catalog::Label;
use crate::model::task::{Priority, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityCount {
    pub priority: Priority,
    /// Incomplete tasks at this level, subtasks included.
    pub open: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiltersView<'a> {
    /// P1 first.
    pub priorities: Vec<PriorityCount>,
    /// Labels as stored; no task association is derived.
    pub labels: &'a [Label],
}

pub fn filters<'a>(tasks: &[Task], labels: &'a [Label]) -> FiltersView<'a> {
    let priorities = Priority::ALL
        .iter()
        .map(|&priority| PriorityCount {
            priority,
            open: tasks
                .iter()
                .filter(|task| !task.is_completed && task.priority == priority)
                .count(),
        })
        .collect();
    FiltersView { priorities, labels }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::defaults::default_labels;

    #[test]
    fn counts_open_tasks_per_level_in_urgency_order() {
        let mut urgent = Task::with_id("a", "a");
        urgent.priority = Priority::Urgent;
        let mut urgent_done = Task::with_id("b", "b");
        urgent_done.priority = Priority::Urgent;
        urgent_done.is_completed = true;
        let normal = Task::with_id("c", "c");
        let labels = default_labels();

        let view = filters(&[urgent, urgent_done, normal], &labels);
        let counts: Vec<_> = view
            .priorities
            .iter()
            .map(|count| (count.priority.label(), count.open))
            .collect();
        assert_eq!(counts, [("P1", 1), ("P2", 0), ("P3", 0), ("P4", 1)]);
        assert_eq!(view.labels.len(), 2);
    }
}
