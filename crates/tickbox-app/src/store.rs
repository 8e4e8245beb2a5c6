//! The public store handle.

use std::sync::Arc;

use tickbox_core::{
    Filter, Progress, Task, TaskEditData, TaskId, TaskName, TaskStats, TodoEvent, TodoState, clock,
};
use tickbox_storage::{DEFAULT_PERSIST_KEY, PersistenceAdapter, StorageOptions};
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::dispatch::{CoreDispatcher, Dispatcher, SubscriptionId};
use crate::logging::Logged;
use crate::persist::Persisted;

/// Handle to a task list.
///
/// Every mutation is applied atomically; invalid input (blank names, unknown
/// ids, out-of-range indices) leaves the state untouched without notifying
/// subscribers or writing to storage.
pub struct TodoStore {
    dispatcher: Box<dyn Dispatcher>,
}

impl std::fmt::Debug for TodoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoStore")
            .field("state", &self.dispatcher.state())
            .finish_non_exhaustive()
    }
}

/// Build a store from `config`, hydrating persisted state when enabled.
///
/// Persisted state, when present and well-formed, wins over the configured
/// initial tasks and filter.
#[must_use]
pub fn create_store(config: StoreConfig) -> TodoStore {
    let StoreConfig {
        persist_key,
        enable_persistence,
        storage_medium,
        storage_dir,
        initial_tasks,
        initial_filter,
        enable_logging,
        store_name,
    } = config;
    let initial = TodoState::new(initial_tasks, initial_filter);

    let dispatcher: Box<dyn Dispatcher> = if enable_persistence {
        let key = if persist_key.trim().is_empty() {
            warn!(default = DEFAULT_PERSIST_KEY, "blank persist key, using default");
            DEFAULT_PERSIST_KEY.to_owned()
        } else {
            persist_key
        };
        let adapter = PersistenceAdapter::open(&StorageOptions {
            medium: storage_medium,
            key,
            dir: storage_dir,
        });
        let initial = adapter.load().map_or(initial, TodoState::from);
        Box::new(Persisted::new(CoreDispatcher::new(initial), adapter))
    } else {
        Box::new(CoreDispatcher::new(initial))
    };

    let dispatcher: Box<dyn Dispatcher> = if enable_logging {
        Box::new(Logged::new(dispatcher, store_name))
    } else {
        dispatcher
    };
    TodoStore { dispatcher }
}

impl TodoStore {
    /// Wrap an already composed dispatcher.
    #[must_use]
    pub fn from_dispatcher(dispatcher: impl Dispatcher + 'static) -> Self {
        Self {
            dispatcher: Box::new(dispatcher),
        }
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> Arc<TodoState> {
        self.dispatcher.state()
    }

    /// Append a task; returns its id, or `None` when the trimmed name is empty.
    pub fn add_task(&self, name: &str, description: Option<&str>) -> Option<TaskId> {
        let Some(name) = TaskName::new(name) else {
            debug!("ignoring task with blank name");
            return None;
        };
        let task = Task::new(name, description, clock::now());
        let id = task.id().clone();
        self.dispatcher.dispatch(TodoEvent::TaskAdded { task }).map(|_| id)
    }

    /// Flip the completion flag of `id`.
    pub fn toggle_task(&self, id: &TaskId) {
        self.dispatcher.dispatch(TodoEvent::TaskToggled {
            id: id.clone(),
            at: clock::now(),
        });
    }

    /// Rename `id`; blank names are ignored.
    pub fn update_task(&self, id: &TaskId, name: &str) {
        let Some(name) = TaskName::new(name) else {
            debug!(task = %id, "ignoring rename to blank name");
            return;
        };
        self.dispatcher.dispatch(TodoEvent::TaskRenamed {
            id: id.clone(),
            name,
            at: clock::now(),
        });
    }

    /// Apply an edit form to `id` and leave edit mode for it.
    pub fn edit_task(&self, id: &TaskId, data: &TaskEditData) {
        let Some(name) = TaskName::new(&data.name) else {
            debug!(task = %id, "ignoring edit with blank name");
            return;
        };
        self.dispatcher.dispatch(TodoEvent::TaskEdited {
            id: id.clone(),
            name,
            description: data.description_patch(),
            at: clock::now(),
        });
    }

    /// Remove `id`.
    pub fn delete_task(&self, id: &TaskId) {
        self.dispatcher.dispatch(TodoEvent::TaskDeleted { id: id.clone() });
    }

    /// Remove every completed task.
    pub fn clear_completed(&self) {
        self.dispatcher.dispatch(TodoEvent::CompletedCleared);
    }

    /// Remove every task.
    pub fn clear_all_tasks(&self) {
        self.dispatcher.dispatch(TodoEvent::AllCleared);
    }

    /// Change the active filter.
    pub fn set_filter(&self, filter: Filter) {
        self.dispatcher.dispatch(TodoEvent::FilterSet { filter });
    }

    /// Set every task to `completed`, or with `None` complete all unless all are
    /// already complete, in which case reopen all.
    pub fn toggle_all_tasks(&self, completed: Option<bool>) {
        self.dispatcher.dispatch(TodoEvent::AllToggled {
            completed,
            at: clock::now(),
        });
    }

    /// Append tasks whose ids are not known yet, keeping the first of any duplicates.
    pub fn import_tasks(&self, tasks: Vec<Task>) {
        self.dispatcher.dispatch(TodoEvent::TasksImported { tasks });
    }

    /// Copy of every task in list order.
    #[must_use]
    pub fn export_tasks(&self) -> Vec<Task> {
        self.state().tasks().iter().map(|task| (**task).clone()).collect()
    }

    /// Move the task at `from` to `to`.
    pub fn reorder_tasks(&self, from: usize, to: usize) {
        self.dispatcher.dispatch(TodoEvent::TaskMoved {
            from,
            to,
            at: clock::now(),
        });
    }

    /// Enter edit mode for `id`.
    pub fn start_editing(&self, id: &TaskId) {
        self.dispatcher.dispatch(TodoEvent::EditingStarted { id: id.clone() });
    }

    /// Leave edit mode.
    pub fn cancel_editing(&self) {
        self.dispatcher.dispatch(TodoEvent::EditingCancelled);
    }

    /// Task currently in edit mode, if any.
    #[must_use]
    pub fn editing_task_id(&self) -> Option<TaskId> {
        self.state().editing_task_id().cloned()
    }

    /// Tasks matching the active filter.
    #[must_use]
    pub fn get_filtered_tasks(&self) -> Vec<Arc<Task>> {
        self.state().filtered_tasks()
    }

    /// Incomplete tasks.
    #[must_use]
    pub fn get_active_tasks(&self) -> Vec<Arc<Task>> {
        self.state().active_tasks()
    }

    /// Completed tasks.
    #[must_use]
    pub fn get_completed_tasks(&self) -> Vec<Arc<Task>> {
        self.state().completed_tasks()
    }

    /// Total, active and completed counts with the completion rate.
    #[must_use]
    pub fn get_task_stats(&self) -> TaskStats {
        self.state().stats()
    }

    /// Completion progress as a rounded percentage.
    #[must_use]
    pub fn get_progress(&self) -> Progress {
        self.state().progress()
    }

    /// Call `listener` with every newly committed state.
    pub fn subscribe(&self, listener: impl Fn(&Arc<TodoState>) + Send + Sync + 'static) -> SubscriptionId {
        self.dispatcher.subscribe(Arc::new(listener))
    }

    /// Stop notifying a listener; returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.dispatcher.unsubscribe(id)
    }

    /// Block until queued persistence writes are done.
    pub fn flush(&self) {
        self.dispatcher.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TodoStore {
        create_store(StoreConfig::ephemeral())
    }

    fn added(store: &TodoStore, name: &str) -> TaskId {
        store
            .add_task(name, None)
            .unwrap_or_else(|| panic!("{name:?} should be added"))
    }

    #[test]
    fn blank_names_are_ignored_everywhere() {
        let store = store();
        assert!(store.add_task("   ", None).is_none());
        let id = added(&store, "keep");
        store.update_task(&id, "\t");
        store.edit_task(&id, &TaskEditData::new("", Some("body".into())));
        let task = store.state().task(&id).cloned().unwrap_or_else(|| panic!("task exists"));
        assert_eq!(task.name().as_str(), "keep");
        assert_eq!(task.description(), None);
    }

    #[test]
    fn edit_leaves_edit_mode() {
        let store = store();
        let id = added(&store, "draft");
        store.start_editing(&id);
        assert_eq!(store.editing_task_id(), Some(id.clone()));
        store.edit_task(&id, &TaskEditData::new("final", None));
        assert_eq!(store.editing_task_id(), None);
    }

    #[test]
    fn deleting_edited_task_clears_edit_mode() {
        let store = store();
        let id = added(&store, "doomed");
        store.start_editing(&id);
        store.delete_task(&id);
        assert_eq!(store.editing_task_id(), None);
    }

    #[test]
    fn initial_tasks_seed_a_store_without_persistence() {
        let seed = Task::new(
            TaskName::new("seeded").unwrap_or_else(|| panic!("valid name")),
            None,
            clock::now(),
        );
        let store = create_store(StoreConfig {
            initial_tasks: vec![seed.clone()],
            initial_filter: Filter::Active,
            enable_logging: true,
            ..StoreConfig::ephemeral()
        });
        assert_eq!(store.export_tasks(), vec![seed]);
        assert_eq!(store.state().filter(), Filter::Active);
    }
}
