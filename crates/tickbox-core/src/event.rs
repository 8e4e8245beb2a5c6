use time::OffsetDateTime;

use crate::filter::Filter;
use crate::id::TaskId;
use crate::task::{DescriptionPatch, Task, TaskName};

/// A single state transition request.
///
/// Events carry every input a transition needs (including timestamps), so
/// [`TodoState::apply`](crate::TodoState::apply) stays a pure function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoEvent {
    /// Append a freshly created task.
    TaskAdded {
        /// Task to append.
        task: Task,
    },
    /// Flip the completion flag of a task.
    TaskToggled {
        /// Target task.
        id: TaskId,
        /// Modification time.
        at: OffsetDateTime,
    },
    /// Overwrite the name of a task.
    TaskRenamed {
        /// Target task.
        id: TaskId,
        /// New name.
        name: TaskName,
        /// Modification time.
        at: OffsetDateTime,
    },
    /// Apply an edit form to a task.
    TaskEdited {
        /// Target task.
        id: TaskId,
        /// New name.
        name: TaskName,
        /// Description change (`None` leaves it untouched).
        description: Option<DescriptionPatch>,
        /// Modification time.
        at: OffsetDateTime,
    },
    /// Remove a task.
    TaskDeleted {
        /// Target task.
        id: TaskId,
    },
    /// Remove every completed task.
    CompletedCleared,
    /// Remove every task.
    AllCleared,
    /// Change the active filter.
    FilterSet {
        /// New filter.
        filter: Filter,
    },
    /// Set every task's completion flag.
    AllToggled {
        /// Explicit target; `None` completes all unless everything is already done.
        completed: Option<bool>,
        /// Modification time.
        at: OffsetDateTime,
    },
    /// Append tasks whose ids are not present yet.
    TasksImported {
        /// Candidate tasks, in order.
        tasks: Vec<Task>,
    },
    /// Move a task to another position.
    TaskMoved {
        /// Current index.
        from: usize,
        /// Destination index.
        to: usize,
        /// Modification time.
        at: OffsetDateTime,
    },
    /// Enter edit mode for a task.
    EditingStarted {
        /// Target task.
        id: TaskId,
    },
    /// Leave edit mode.
    EditingCancelled,
}

impl TodoEvent {
    /// Short name used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TaskAdded { .. } => "task_added",
            Self::TaskToggled { .. } => "task_toggled",
            Self::TaskRenamed { .. } => "task_renamed",
            Self::TaskEdited { .. } => "task_edited",
            Self::TaskDeleted { .. } => "task_deleted",
            Self::CompletedCleared => "completed_cleared",
            Self::AllCleared => "all_cleared",
            Self::FilterSet { .. } => "filter_set",
            Self::AllToggled { .. } => "all_toggled",
            Self::TasksImported { .. } => "tasks_imported",
            Self::TaskMoved { .. } => "task_moved",
            Self::EditingStarted { .. } => "editing_started",
            Self::EditingCancelled => "editing_cancelled",
        }
    }

    /// Whether the event can change persisted data (tasks or filter).
    #[must_use]
    pub const fn touches_persisted_state(&self) -> bool {
        !matches!(self, Self::EditingStarted { .. } | Self::EditingCancelled)
    }
}
