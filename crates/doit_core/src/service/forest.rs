//! Parent/child index over a flat task list.
//!
//! # Responsibility
//! - Build the parent -> children adjacency once per board update.
//! - Answer descendant and pre-order walk queries without recursion.
//!
//! # Invariants
//! - Every traversal keeps a visited set, so a malformed parent chain
//!   terminates instead of looping.
//! - Children keep the order they have in the source list.
//! - A task whose parent is missing from the list is treated as a root.

use std::collections::{HashMap, HashSet};

use crate::model::task::{Task, TaskId};

/// Deepest level `walk` descends to.
pub const MAX_TREE_DEPTH: usize = 64;

/// One row of a rendered subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeRow<'a> {
    /// 0 for the walk root.
    pub depth: usize,
    pub task: &'a Task,
}

#[derive(Debug, Clone, Default)]
pub struct TaskForest {
    index: HashMap<TaskId, usize>,
    children: HashMap<TaskId, Vec<TaskId>>,
    roots: Vec<TaskId>,
}

impl TaskForest {
    pub fn build(tasks: &[Task]) -> Self {
        let index: HashMap<TaskId, usize> = tasks
            .iter()
            .enumerate()
            .map(|(position, task)| (task.id.clone(), position))
            .collect();

        let mut children: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
        let mut roots = Vec::new();
        for task in tasks {
            match task.parent_id.as_ref().filter(|parent| index.contains_key(*parent)) {
                Some(parent) => children
                    .entry(parent.clone())
                    .or_default()
                    .push(task.id.clone()),
                None => roots.push(task.id.clone()),
            }
        }

        Self {
            index,
            children,
            roots,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn roots(&self) -> &[TaskId] {
        &self.roots
    }

    /// Direct children of `id`, in list order.
    pub fn children_of(&self, id: &str) -> &[TaskId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `id` followed by every transitive child, depth-first, each once.
    ///
    /// Empty when `id` is unknown.
    pub fn descendants_of(&self, id: &str) -> Vec<TaskId> {
        let Some((root, _)) = self.index.get_key_value(id) else {
            return Vec::new();
        };

        let mut visited: HashSet<&str> = HashSet::new();
        let mut order = Vec::new();
        let mut stack: Vec<&str> = vec![root.as_str()];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            order.push(current.to_string());
            // Reverse so the first child is visited first.
            for child in self.children_of(current).iter().rev() {
                if !visited.contains(child.as_str()) {
                    stack.push(child.as_str());
                }
            }
        }
        order
    }

    /// Whether attaching `task_id` under `candidate_parent` would form a cycle.
    pub fn would_create_cycle(&self, task_id: &str, candidate_parent: &str) -> bool {
        task_id == candidate_parent
            || self
                .descendants_of(task_id)
                .iter()
                .any(|id| id == candidate_parent)
    }

    /// Pre-order rows of the subtree under `root_id`, capped at
    /// [`MAX_TREE_DEPTH`].
    ///
    /// `tasks` must be the list this forest was built from.
    pub fn walk<'a>(&self, tasks: &'a [Task], root_id: &str) -> Vec<TreeRow<'a>> {
        let mut rows = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<(&str, usize)> = vec![(root_id, 0)];

        while let Some((current, depth)) = stack.pop() {
            let Some(task) = self.index.get(current).and_then(|&at| tasks.get(at)) else {
                continue;
            };
            if !visited.insert(task.id.as_str()) {
                continue;
            }
            rows.push(TreeRow { depth, task });
            if depth >= MAX_TREE_DEPTH {
                continue;
            }
            for child in self.children_of(current).iter().rev() {
                stack.push((child.as_str(), depth + 1));
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, parent: Option<&str>) -> Task {
        let mut task = Task::with_id(id, id);
        task.parent_id = parent.map(str::to_string);
        task
    }

    #[test]
    fn descendants_are_depth_first_and_include_self() {
        let tasks = vec![
            task("a", None),
            task("b", Some("a")),
            task("c", Some("b")),
            task("d", Some("a")),
            task("e", None),
        ];
        let forest = TaskForest::build(&tasks);
        assert_eq!(forest.descendants_of("a"), ["a", "b", "c", "d"]);
        assert_eq!(forest.descendants_of("e"), ["e"]);
        assert!(forest.descendants_of("missing").is_empty());
        assert_eq!(forest.roots(), ["a", "e"]);
    }

    #[test]
    fn cyclic_parent_chain_terminates() {
        let tasks = vec![task("x", Some("y")), task("y", Some("x"))];
        let forest = TaskForest::build(&tasks);

        let descendants = forest.descendants_of("x");
        assert_eq!(descendants, ["x", "y"]);

        let rows = forest.walk(&tasks, "x");
        assert_eq!(rows.len(), 2);
        assert!(forest.roots().is_empty());
    }

    #[test]
    fn dangling_parent_is_treated_as_root() {
        let tasks = vec![task("orphan", Some("gone"))];
        let forest = TaskForest::build(&tasks);
        assert_eq!(forest.roots(), ["orphan"]);
    }

    #[test]
    fn walk_reports_depths_in_pre_order() {
        let tasks = vec![
            task("a", None),
            task("b", Some("a")),
            task("c", Some("b")),
            task("d", Some("a")),
        ];
        let forest = TaskForest::build(&tasks);
        let rows: Vec<_> = forest
            .walk(&tasks, "a")
            .into_iter()
            .map(|row| (row.task.id.as_str(), row.depth))
            .collect();
        assert_eq!(rows, [("a", 0), ("b", 1), ("c", 2), ("d", 1)]);
    }

    #[test]
    fn walk_stops_at_depth_limit() {
        let mut tasks = vec![task("t0", None)];
        for level in 1..=(MAX_TREE_DEPTH + 5) {
            tasks.push(task(&format!("t{level}"), Some(&format!("t{}", level - 1))));
        }
        let forest = TaskForest::build(&tasks);
        let rows = forest.walk(&tasks, "t0");
        assert_eq!(rows.len(), MAX_TREE_DEPTH + 1);
        assert_eq!(rows.last().unwrap().depth, MAX_TREE_DEPTH);
    }

    #[test]
    fn cycle_check_covers_self_and_descendants() {
        let tasks = vec![task("a", None), task("b", Some("a")), task("c", None)];
        let forest = TaskForest::build(&tasks);
        assert!(forest.would_create_cycle("a", "a"));
        assert!(forest.would_create_cycle("a", "b"));
        assert!(!forest.would_create_cycle("b", "c"));
    }
}
