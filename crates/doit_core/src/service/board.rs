//! The single owned store object for a session.
//!
//! # Responsibility
//! - Hold the task/project/section/label collections in memory.
//! - Apply every mutation in memory first, then mirror it with exactly one
//!   persistence call per touched entity.
//! - Keep the [`TaskForest`] index current after every structural change.
//!
//! # Invariants
//! - Validation happens before any state change; a rejected mutation leaves
//!   both memory and storage untouched.
//! - A failed persistence call never rolls back memory. The write is queued
//!   in `pending_writes`, a [`SyncNotice`] is raised, and `flush_pending`
//!   retries it.
//! - With an [`Outbox`] attached, the queue and the entity snapshots it needs
//!   are written through on every change, and replayed by the next load.
//! - A subtask always lives in its parent's project.
//! - The reserved inbox project is always present after `load`.

use log::{debug, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use chrono::NaiveDate;

use super::capture::{compose_task, CaptureOverrides};
use super::forest::TaskForest;
use crate::ai::TaskAssistant;
use crate::model::catalog::{sort_sections, Label, Project, Section};
use crate::model::defaults::{inbox_project, INBOX_PROJECT_ID};
use crate::model::task::{
    DueDate, Priority, ProjectId, SectionId, Task, TaskId, TaskValidationError,
};
use crate::store::{upsert, Outbox, QueuedWrite, StoreError, StoreResult, TaskStore};

/// Fields accepted when creating a task. Everything but `content` defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub content: String,
    pub description: Option<String>,
    /// Defaults to the parent's project, then to the inbox.
    pub project_id: Option<ProjectId>,
    pub section_id: Option<SectionId>,
    pub priority: Priority,
    pub due_string: Option<String>,
    pub due_date: Option<DueDate>,
    pub parent_id: Option<TaskId>,
}

impl NewTask {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

/// A storage write that has not been confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PendingWrite {
    SaveTask(TaskId),
    DeleteTask(TaskId),
    SaveProject(ProjectId),
    SaveSection(SectionId),
    DeleteSection(SectionId),
}

impl PendingWrite {
    pub fn op(&self) -> &'static str {
        match self {
            Self::SaveTask(_) => "save_task",
            Self::DeleteTask(_) => "delete_task",
            Self::SaveProject(_) => "save_project",
            Self::SaveSection(_) => "save_section",
            Self::DeleteSection(_) => "delete_section",
        }
    }

    pub fn entity_id(&self) -> &str {
        match self {
            Self::SaveTask(id)
            | Self::DeleteTask(id)
            | Self::SaveProject(id)
            | Self::SaveSection(id)
            | Self::DeleteSection(id) => id,
        }
    }

    /// The save this write makes obsolete, if any.
    fn supersedes(&self) -> Option<PendingWrite> {
        match self {
            Self::DeleteTask(id) => Some(Self::SaveTask(id.clone())),
            Self::DeleteSection(id) => Some(Self::SaveSection(id.clone())),
            _ => None,
        }
    }
}

impl From<&QueuedWrite> for PendingWrite {
    fn from(value: &QueuedWrite) -> Self {
        match value {
            QueuedWrite::SaveTask(task) => Self::SaveTask(task.id.clone()),
            QueuedWrite::DeleteTask(id) => Self::DeleteTask(id.clone()),
            QueuedWrite::SaveProject(project) => Self::SaveProject(project.id.clone()),
            QueuedWrite::SaveSection(section) => Self::SaveSection(section.id.clone()),
            QueuedWrite::DeleteSection(id) => Self::DeleteSection(id.clone()),
        }
    }
}

/// Non-fatal persistence failure surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncNotice {
    pub write: PendingWrite,
    pub message: String,
}

impl Display for SyncNotice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} not saved yet: {}",
            self.write.op(),
            self.write.entity_id(),
            self.message
        )
    }
}

/// Rejected board mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    Validation(TaskValidationError),
    TaskNotFound(TaskId),
    ParentNotFound(TaskId),
    ProjectNotFound(ProjectId),
    SectionNotFound(SectionId),
    CycleDetected { task_id: TaskId, parent_id: TaskId },
    /// A subtask was placed outside its parent's project.
    ProjectMismatch {
        parent_id: TaskId,
        parent_project: ProjectId,
        project_id: ProjectId,
    },
    BlankName,
}

impl Display for BoardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent task not found: {id}"),
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::SectionNotFound(id) => write!(f, "section not found: {id}"),
            Self::CycleDetected { task_id, parent_id } => write!(
                f,
                "cannot move task {task_id} under {parent_id}: it is the task or one of its subtasks"
            ),
            Self::ProjectMismatch {
                parent_id,
                parent_project,
                project_id,
            } => write!(
                f,
                "subtask of {parent_id} must stay in project {parent_project}, not {project_id}"
            ),
            Self::BlankName => write!(f, "name must not be blank"),
        }
    }
}

impl Error for BoardError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaskValidationError> for BoardError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

pub struct TaskBoard {
    store: Arc<dyn TaskStore>,
    tasks: Vec<Task>,
    projects: Vec<Project>,
    sections: Vec<Section>,
    labels: Vec<Label>,
    forest: TaskForest,
    pending: Vec<PendingWrite>,
    notices: Vec<SyncNotice>,
    outbox: Option<Arc<Outbox>>,
}

impl TaskBoard {
    /// Reads all four collections from `store` once. Failed writes are only
    /// kept for the lifetime of the board.
    pub async fn load(store: Arc<dyn TaskStore>) -> StoreResult<Self> {
        Self::load_inner(store, None).await
    }

    /// Like [`TaskBoard::load`], then replays the writes left in `outbox` by
    /// an earlier session on top of what `store` returned. They stay queued
    /// until `flush_pending` gets them through.
    pub async fn load_with_outbox(
        store: Arc<dyn TaskStore>,
        outbox: Arc<Outbox>,
    ) -> StoreResult<Self> {
        Self::load_inner(store, Some(outbox)).await
    }

    async fn load_inner(
        store: Arc<dyn TaskStore>,
        outbox: Option<Arc<Outbox>>,
    ) -> StoreResult<Self> {
        let tasks = store.list_tasks().await?;
        let projects = store.list_projects().await?;
        let sections = store.list_sections(None).await?;
        let labels = store.list_labels().await?;

        let mut board = Self {
            forest: TaskForest::default(),
            store,
            tasks,
            projects,
            sections,
            labels,
            pending: Vec::new(),
            notices: Vec::new(),
            outbox,
        };
        if let Some(outbox) = board.outbox.clone() {
            let queued = outbox.load()?;
            if !queued.is_empty() {
                info!(
                    "event=outbox_replay module=board status=ok queued={}",
                    queued.len()
                );
            }
            for write in queued {
                board.replay(write);
            }
        }
        sort_sections(&mut board.sections);
        board.rebuild_forest();

        if board.project(INBOX_PROJECT_ID).is_none() {
            warn!("event=board_load module=board status=repair reason=missing_inbox");
            board.projects.insert(0, inbox_project());
            board
                .persist(PendingWrite::SaveProject(INBOX_PROJECT_ID.to_string()))
                .await;
        }

        info!(
            "event=board_load module=board status=ok backend={} tasks={} projects={} sections={} labels={}",
            board.store.backend(),
            board.tasks.len(),
            board.projects.len(),
            board.sections.len(),
            board.labels.len()
        );
        Ok(board)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|project| project.id == id)
    }

    /// Sections in display order, optionally limited to one project.
    pub fn sections(&self, project_id: Option<&str>) -> Vec<&Section> {
        self.sections
            .iter()
            .filter(|section| project_id.map_or(true, |id| section.project_id == id))
            .collect()
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn forest(&self) -> &TaskForest {
        &self.forest
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.is_completed).count()
    }

    /// Writes that failed and still await `flush_pending`.
    pub fn pending_writes(&self) -> &[PendingWrite] {
        &self.pending
    }

    /// Drains the notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<SyncNotice> {
        std::mem::take(&mut self.notices)
    }

    pub async fn add_task(&mut self, draft: NewTask) -> Result<Task, BoardError> {
        let content = draft.content.trim();
        if content.is_empty() {
            return Err(TaskValidationError::EmptyContent.into());
        }

        let project_id = match &draft.parent_id {
            Some(parent_id) => {
                let parent_project = self
                    .task(parent_id)
                    .map(|parent| parent.project_id.clone())
                    .ok_or_else(|| BoardError::ParentNotFound(parent_id.clone()))?;
                match draft.project_id {
                    Some(project_id) if project_id != parent_project => {
                        return Err(BoardError::ProjectMismatch {
                            parent_id: parent_id.clone(),
                            parent_project,
                            project_id,
                        });
                    }
                    _ => parent_project,
                }
            }
            None => draft
                .project_id
                .unwrap_or_else(|| INBOX_PROJECT_ID.to_string()),
        };
        self.require_project(&project_id)?;
        if let Some(section_id) = &draft.section_id {
            self.require_section(section_id, &project_id)?;
        }

        let mut task = Task::new(content);
        task.description = draft.description.filter(|text| !text.trim().is_empty());
        task.priority = draft.priority;
        task.due_string = draft.due_string;
        task.due_date = draft.due_date;
        task.project_id = project_id;
        task.section_id = draft.section_id;
        task.parent_id = draft.parent_id;

        self.tasks.push(task.clone());
        self.rebuild_forest();
        info!(
            "event=task_add module=board status=ok task_id={} project_id={} is_subtask={}",
            task.id,
            task.project_id,
            task.parent_id.is_some()
        );
        self.persist(PendingWrite::SaveTask(task.id.clone())).await;
        Ok(task)
    }

    /// Replaces a task wholesale after validating it.
    pub async fn update_task(&mut self, task: Task) -> Result<(), BoardError> {
        task.validate()?;
        let position = self
            .tasks
            .iter()
            .position(|existing| existing.id == task.id)
            .ok_or_else(|| BoardError::TaskNotFound(task.id.clone()))?;
        self.require_project(&task.project_id)?;

        if let Some(parent_id) = &task.parent_id {
            let parent_project = self
                .task(parent_id)
                .map(|parent| parent.project_id.clone())
                .ok_or_else(|| BoardError::ParentNotFound(parent_id.clone()))?;
            if parent_project != task.project_id {
                return Err(BoardError::ProjectMismatch {
                    parent_id: parent_id.clone(),
                    parent_project,
                    project_id: task.project_id.clone(),
                });
            }
            if self.forest.would_create_cycle(&task.id, parent_id) {
                return Err(BoardError::CycleDetected {
                    task_id: task.id.clone(),
                    parent_id: parent_id.clone(),
                });
            }
        }
        // An unchanged dangling section is kept; only new assignments are checked.
        if task.section_id != self.tasks[position].section_id {
            if let Some(section_id) = &task.section_id {
                self.require_section(section_id, &task.project_id)?;
            }
        }

        let reparented = task.parent_id != self.tasks[position].parent_id;
        let id = task.id.clone();
        self.tasks[position] = task;
        if reparented {
            self.rebuild_forest();
        }
        debug!("event=task_update module=board status=ok task_id={id} reparented={reparented}");
        self.persist(PendingWrite::SaveTask(id)).await;
        Ok(())
    }

    /// Flips completion and returns the new state.
    pub async fn toggle_task(&mut self, id: &str) -> Result<bool, BoardError> {
        let task = self
            .edit_task(id, |task| task.is_completed = !task.is_completed)
            .await?;
        Ok(task.is_completed)
    }

    pub async fn set_priority(&mut self, id: &str, priority: Priority) -> Result<(), BoardError> {
        self.edit_task(id, |task| task.priority = priority).await?;
        Ok(())
    }

    /// Sets both due fields as given; they are not reconciled.
    pub async fn set_due(
        &mut self,
        id: &str,
        due_string: Option<String>,
        due_date: Option<DueDate>,
    ) -> Result<(), BoardError> {
        self.edit_task(id, |task| {
            task.due_string = due_string;
            task.due_date = due_date;
        })
        .await?;
        Ok(())
    }

    /// Removes `id` and every transitive subtask. Returns the removed ids.
    pub async fn delete_task(&mut self, id: &str) -> Result<Vec<TaskId>, BoardError> {
        if !self.forest.contains(id) {
            return Err(BoardError::TaskNotFound(id.to_string()));
        }
        let doomed = self.forest.descendants_of(id);
        let doomed_set: HashSet<&str> = doomed.iter().map(String::as_str).collect();
        self.tasks
            .retain(|task| !doomed_set.contains(task.id.as_str()));
        self.rebuild_forest();
        info!(
            "event=task_delete module=board status=ok task_id={id} removed={}",
            doomed.len()
        );

        let queue_changed = match self.store.delete_tasks(&doomed).await {
            Ok(()) => doomed.iter().fold(false, |changed, removed| {
                self.settle(&PendingWrite::DeleteTask(removed.clone())) || changed
            }),
            Err(err) => {
                for removed in &doomed {
                    self.record_failure(PendingWrite::DeleteTask(removed.clone()), &err);
                }
                true
            }
        };
        if queue_changed {
            self.write_outbox();
        }
        Ok(doomed)
    }

    /// Creates one open, lowest-priority subtask per non-blank title.
    pub async fn add_subtasks(
        &mut self,
        parent_id: &str,
        titles: &[String],
    ) -> Result<Vec<Task>, BoardError> {
        let project_id = self
            .task(parent_id)
            .map(|parent| parent.project_id.clone())
            .ok_or_else(|| BoardError::ParentNotFound(parent_id.to_string()))?;

        let created: Vec<Task> = titles
            .iter()
            .map(|title| title.trim())
            .filter(|title| !title.is_empty())
            .map(|title| {
                let mut task = Task::new(title);
                task.project_id = project_id.clone();
                task.parent_id = Some(parent_id.to_string());
                task
            })
            .collect();
        self.tasks.extend(created.iter().cloned());
        self.rebuild_forest();
        info!(
            "event=subtasks_add module=board status=ok parent_id={parent_id} count={}",
            created.len()
        );

        for task in &created {
            self.persist(PendingWrite::SaveTask(task.id.clone())).await;
        }
        Ok(created)
    }

    /// Appends a section after the last one of `project_id`.
    pub async fn add_section(&mut self, project_id: &str, name: &str) -> Result<Section, BoardError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BoardError::BlankName);
        }
        self.require_project(project_id)?;

        let order = self
            .sections
            .iter()
            .filter(|section| section.project_id == project_id)
            .map(|section| section.order)
            .max()
            .map_or(0, |last| last + 1);
        let section = Section::new(project_id, name, order);
        self.sections.push(section.clone());
        sort_sections(&mut self.sections);
        info!(
            "event=section_add module=board status=ok section_id={} project_id={project_id} order={order}",
            section.id
        );
        self.persist(PendingWrite::SaveSection(section.id.clone())).await;
        Ok(section)
    }

    /// Removes a section. Its tasks keep their `section_id`.
    pub async fn delete_section(&mut self, id: &str) -> Result<Section, BoardError> {
        let position = self
            .sections
            .iter()
            .position(|section| section.id == id)
            .ok_or_else(|| BoardError::SectionNotFound(id.to_string()))?;
        let section = self.sections.remove(position);
        let orphaned = self
            .tasks
            .iter()
            .filter(|task| task.section_id.as_deref() == Some(id))
            .count();
        info!("event=section_delete module=board status=ok section_id={id} orphaned_tasks={orphaned}");
        self.persist(PendingWrite::DeleteSection(id.to_string())).await;
        Ok(section)
    }

    pub async fn add_project(&mut self, name: &str, color: &str) -> Result<Project, BoardError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BoardError::BlankName);
        }
        let project = Project::new(name, color.trim());
        self.projects.push(project.clone());
        info!(
            "event=project_add module=board status=ok project_id={}",
            project.id
        );
        self.persist(PendingWrite::SaveProject(project.id.clone())).await;
        Ok(project)
    }

    /// Parses `input` with `assistant`, applies the form picks, then adds.
    pub async fn quick_add(
        &mut self,
        assistant: &dyn TaskAssistant,
        input: &str,
        overrides: CaptureOverrides,
        today: NaiveDate,
    ) -> Result<Task, BoardError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TaskValidationError::EmptyContent.into());
        }
        let parsed = assistant.parse_natural_language(input, today).await;
        self.add_task(compose_task(parsed, overrides, today)).await
    }

    /// Asks `assistant` for subtask titles and adds them under `parent_id`.
    pub async fn suggest_subtasks(
        &mut self,
        assistant: &dyn TaskAssistant,
        parent_id: &str,
    ) -> Result<Vec<Task>, BoardError> {
        let content = self
            .task(parent_id)
            .map(|parent| parent.content.clone())
            .ok_or_else(|| BoardError::TaskNotFound(parent_id.to_string()))?;
        let titles = assistant.generate_subtasks(&content).await;
        self.add_subtasks(parent_id, &titles).await
    }

    /// Retries every queued write. Returns how many are still pending.
    pub async fn flush_pending(&mut self) -> usize {
        let queued = std::mem::take(&mut self.pending);
        let attempted = queued.len();
        for write in queued {
            self.persist(write).await;
        }
        self.write_outbox();
        info!(
            "event=flush_pending module=board status=ok attempted={attempted} remaining={}",
            self.pending.len()
        );
        self.pending.len()
    }

    async fn edit_task(
        &mut self,
        id: &str,
        edit: impl FnOnce(&mut Task),
    ) -> Result<Task, BoardError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| BoardError::TaskNotFound(id.to_string()))?;
        edit(task);
        let snapshot = task.clone();
        self.persist(PendingWrite::SaveTask(snapshot.id.clone())).await;
        Ok(snapshot)
    }

    fn require_project(&self, id: &str) -> Result<(), BoardError> {
        match self.project(id) {
            Some(_) => Ok(()),
            None => Err(BoardError::ProjectNotFound(id.to_string())),
        }
    }

    fn require_section(&self, id: &str, project_id: &str) -> Result<(), BoardError> {
        let known = self
            .sections
            .iter()
            .any(|section| section.id == id && section.project_id == project_id);
        if known {
            Ok(())
        } else {
            Err(BoardError::SectionNotFound(id.to_string()))
        }
    }

    fn rebuild_forest(&mut self) {
        self.forest = TaskForest::build(&self.tasks);
    }

    /// Mirrors the current in-memory state of one entity into storage.
    async fn persist(&mut self, write: PendingWrite) {
        let store = Arc::clone(&self.store);
        let result = match &write {
            PendingWrite::SaveTask(id) => match self.task(id) {
                Some(task) => store.save_task(task).await,
                None => Ok(()),
            },
            PendingWrite::DeleteTask(id) => store.delete_task(id).await,
            PendingWrite::SaveProject(id) => match self.project(id) {
                Some(project) => store.save_project(project).await,
                None => Ok(()),
            },
            PendingWrite::SaveSection(id) => {
                match self.sections.iter().find(|section| &section.id == id) {
                    Some(section) => store.save_section(section).await,
                    None => Ok(()),
                }
            }
            PendingWrite::DeleteSection(id) => store.delete_section(id).await,
        };

        let queue_changed = match result {
            Ok(()) => self.settle(&write),
            Err(err) => {
                self.record_failure(write, &err);
                true
            }
        };
        if queue_changed {
            self.write_outbox();
        }
    }

    /// Drops `write` and whatever it supersedes from the queue. Returns
    /// whether anything was removed.
    fn settle(&mut self, write: &PendingWrite) -> bool {
        let superseded = write.supersedes();
        let before = self.pending.len();
        self.pending
            .retain(|queued| queued != write && Some(queued) != superseded.as_ref());
        self.pending.len() != before
    }

    fn record_failure(&mut self, write: PendingWrite, err: &StoreError) {
        warn!(
            "event=persist module=board status=error backend={} op={} entity_id={} error={err}",
            self.store.backend(),
            write.op(),
            write.entity_id()
        );
        if let Some(superseded) = write.supersedes() {
            self.pending.retain(|queued| *queued != superseded);
        }
        if !self.pending.contains(&write) {
            self.pending.push(write.clone());
        }
        self.notices.push(SyncNotice {
            write,
            message: err.to_string(),
        });
    }

    /// Applies a write recorded by an earlier session and queues it again.
    fn replay(&mut self, write: QueuedWrite) {
        let pending = PendingWrite::from(&write);
        match write {
            QueuedWrite::SaveTask(task) => upsert(&mut self.tasks, task),
            QueuedWrite::DeleteTask(id) => self.tasks.retain(|task| task.id != id),
            QueuedWrite::SaveProject(project) => upsert(&mut self.projects, project),
            QueuedWrite::SaveSection(section) => upsert(&mut self.sections, section),
            QueuedWrite::DeleteSection(id) => self.sections.retain(|section| section.id != id),
        }
        if let Some(superseded) = pending.supersedes() {
            self.pending.retain(|queued| *queued != superseded);
        }
        if !self.pending.contains(&pending) {
            self.pending.push(pending);
        }
    }

    /// Mirrors the pending queue into the outbox, if one is attached.
    fn write_outbox(&self) {
        let Some(outbox) = &self.outbox else {
            return;
        };
        let snapshots: Vec<QueuedWrite> = self
            .pending
            .iter()
            .filter_map(|write| self.snapshot(write))
            .collect();
        if let Err(err) = outbox.replace(&snapshots) {
            warn!(
                "event=outbox_write module=board status=error queued={} error={err}",
                snapshots.len()
            );
        }
    }

    fn snapshot(&self, write: &PendingWrite) -> Option<QueuedWrite> {
        match write {
            PendingWrite::SaveTask(id) => self.task(id).cloned().map(QueuedWrite::SaveTask),
            PendingWrite::DeleteTask(id) => Some(QueuedWrite::DeleteTask(id.clone())),
            PendingWrite::SaveProject(id) => {
                self.project(id).cloned().map(QueuedWrite::SaveProject)
            }
            PendingWrite::SaveSection(id) => self
                .sections
                .iter()
                .find(|section| &section.id == id)
                .cloned()
                .map(QueuedWrite::SaveSection),
            PendingWrite::DeleteSection(id) => Some(QueuedWrite::DeleteSection(id.clone())),
        }
    }
}
