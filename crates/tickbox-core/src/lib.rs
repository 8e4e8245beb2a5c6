//! Domain types & pure transition logic for the tickbox task store.

/// Millisecond clock helpers.
pub mod clock;
/// Transition requests.
pub mod event;
/// List filters.
pub mod filter;
/// Identifier types.
pub mod id;
/// Task entity and edit payloads.
pub mod task;
pub mod view;

use std::collections::HashSet;
use std::sync::Arc;

pub use crate::event::TodoEvent;
pub use crate::filter::{Filter, FilterParseError};
pub use crate::id::{InvalidTaskId, TaskId};
pub use crate::task::{DescriptionPatch, Task, TaskEditData, TaskError, TaskName};
pub use crate::view::{Page, Progress, TaskStats, TextMatcher};

/// Canonical store state: ordered tasks, active filter and edit-mode marker.
///
/// The task list is shared copy-on-write: a transition rebuilds the list only
/// when it changes tasks, and untouched tasks keep their allocation.
#[derive(Debug, Clone)]
pub struct TodoState {
    tasks: Arc<[Arc<Task>]>,
    filter: Filter,
    editing_task_id: Option<TaskId>,
}

impl Default for TodoState {
    fn default() -> Self {
        Self {
            tasks: Arc::from(Vec::new()),
            filter: Filter::default(),
            editing_task_id: None,
        }
    }
}

impl TodoState {
    /// Build a state from seed tasks; later tasks reusing an earlier id are dropped.
    #[must_use]
    pub fn new(tasks: impl IntoIterator<Item = Task>, filter: Filter) -> Self {
        let mut seen = HashSet::new();
        let tasks: Vec<Arc<Task>> = tasks
            .into_iter()
            .filter(|task| seen.insert(task.id().clone()))
            .map(Arc::new)
            .collect();
        Self {
            tasks: tasks.into(),
            filter,
            editing_task_id: None,
        }
    }

    /// Tasks in display order.
    #[must_use]
    pub fn tasks(&self) -> &[Arc<Task>] {
        &self.tasks
    }

    /// Shared handle to the task list; pointer-stable across filter-only changes.
    #[must_use]
    pub const fn tasks_handle(&self) -> &Arc<[Arc<Task>]> {
        &self.tasks
    }

    /// Active filter.
    #[must_use]
    pub const fn filter(&self) -> Filter {
        self.filter
    }

    /// Task currently in edit mode.
    #[must_use]
    pub const fn editing_task_id(&self) -> Option<&TaskId> {
        self.editing_task_id.as_ref()
    }

    /// Look up a task by id.
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<&Arc<Task>> {
        self.tasks.iter().find(|task| task.id() == id)
    }

    fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id() == id)
    }

    /// Tasks matching the active filter, in list order.
    #[must_use]
    pub fn filtered_tasks(&self) -> Vec<Arc<Task>> {
        self.tasks_where(|task| self.filter.matches(task))
    }

    /// Incomplete tasks.
    #[must_use]
    pub fn active_tasks(&self) -> Vec<Arc<Task>> {
        self.tasks_where(|task| !task.completed())
    }

    /// Completed tasks.
    #[must_use]
    pub fn completed_tasks(&self) -> Vec<Arc<Task>> {
        self.tasks_where(Task::completed)
    }

    /// Tasks satisfying `predicate`, in list order.
    pub fn tasks_where(&self, mut predicate: impl FnMut(&Task) -> bool) -> Vec<Arc<Task>> {
        self.tasks
            .iter()
            .filter(|task| predicate(task))
            .cloned()
            .collect()
    }

    /// Counts and completion ratio.
    #[must_use]
    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.tasks)
    }

    /// Completion progress.
    #[must_use]
    pub fn progress(&self) -> Progress {
        let stats = self.stats();
        Progress::new(stats.completed, stats.total)
    }

    /// Apply `event`, returning the next state or `None` when nothing changes.
    ///
    /// Events naming unknown ids or out-of-range indices, and events that would
    /// leave the state as it is, are no-ops.
    #[must_use]
    pub fn apply(&self, event: &TodoEvent) -> Option<Self> {
        match event {
            TodoEvent::TaskAdded { task } => {
                if self.position(task.id()).is_some() {
                    return None;
                }
                let mut tasks = self.tasks.to_vec();
                tasks.push(Arc::new(task.clone()));
                Some(self.with_tasks(tasks))
            }
            TodoEvent::TaskToggled { id, at } => {
                let idx = self.position(id)?;
                let current = &self.tasks[idx];
                Some(self.replace_at(idx, current.with_completed(!current.completed(), *at)))
            }
            TodoEvent::TaskRenamed { id, name, at } => {
                let idx = self.position(id)?;
                Some(self.replace_at(idx, self.tasks[idx].with_name(name.clone(), *at)))
            }
            TodoEvent::TaskEdited {
                id,
                name,
                description,
                at,
            } => {
                let idx = self.position(id)?;
                let edited = self.tasks[idx].with_edit(name.clone(), description.as_ref(), *at);
                let mut next = self.replace_at(idx, edited);
                if next.editing_task_id.as_ref() == Some(id) {
                    next.editing_task_id = None;
                }
                Some(next)
            }
            TodoEvent::TaskDeleted { id } => {
                let idx = self.position(id)?;
                let mut tasks = self.tasks.to_vec();
                tasks.remove(idx);
                Some(self.with_tasks(tasks))
            }
            TodoEvent::CompletedCleared => {
                if !self.tasks.iter().any(|task| task.completed()) {
                    return None;
                }
                Some(self.with_tasks(self.active_tasks()))
            }
            TodoEvent::AllCleared => {
                if self.tasks.is_empty() {
                    return None;
                }
                Some(self.with_tasks(Vec::new()))
            }
            TodoEvent::FilterSet { filter } => {
                if self.filter == *filter {
                    return None;
                }
                Some(Self {
                    filter: *filter,
                    ..self.clone()
                })
            }
            TodoEvent::AllToggled { completed, at } => {
                if self.tasks.is_empty() {
                    return None;
                }
                let target =
                    completed.unwrap_or_else(|| self.tasks.iter().any(|task| !task.completed()));
                let tasks = self
                    .tasks
                    .iter()
                    .map(|task| Arc::new(task.with_completed(target, *at)))
                    .collect();
                Some(self.with_tasks(tasks))
            }
            TodoEvent::TasksImported { tasks: incoming } => {
                let mut seen: HashSet<&TaskId> = self.tasks.iter().map(|task| task.id()).collect();
                let fresh: Vec<Arc<Task>> = incoming
                    .iter()
                    .filter(|task| seen.insert(task.id()))
                    .map(|task| Arc::new(task.clone()))
                    .collect();
                if fresh.is_empty() {
                    return None;
                }
                let mut tasks = self.tasks.to_vec();
                tasks.extend(fresh);
                Some(self.with_tasks(tasks))
            }
            TodoEvent::TaskMoved { from, to, at } => {
                let len = self.tasks.len();
                if from == to || *from >= len || *to >= len {
                    return None;
                }
                let mut tasks = self.tasks.to_vec();
                let moved = tasks.remove(*from);
                tasks.insert(*to, Arc::new(moved.touched(*at)));
                Some(self.with_tasks(tasks))
            }
            TodoEvent::EditingStarted { id } => {
                if self.editing_task_id.as_ref() == Some(id) || self.position(id).is_none() {
                    return None;
                }
                Some(Self {
                    editing_task_id: Some(id.clone()),
                    ..self.clone()
                })
            }
            TodoEvent::EditingCancelled => {
                self.editing_task_id.as_ref()?;
                Some(Self {
                    editing_task_id: None,
                    ..self.clone()
                })
            }
        }
    }

    fn replace_at(&self, idx: usize, task: Task) -> Self {
        let mut tasks = self.tasks.to_vec();
        tasks[idx] = Arc::new(task);
        self.with_tasks(tasks)
    }

    /// Swap in a new task list, dropping the edit marker if its task is gone.
    fn with_tasks(&self, tasks: Vec<Arc<Task>>) -> Self {
        let editing_task_id = self
            .editing_task_id
            .as_ref()
            .filter(|id| tasks.iter().any(|task| task.id() == *id))
            .cloned();
        Self {
            tasks: tasks.into(),
            filter: self.filter,
            editing_task_id,
        }
    }
}
