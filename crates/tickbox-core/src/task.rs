use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use time::OffsetDateTime;

use crate::clock;
use crate::id::TaskId;

/// Errors raised while constructing domain values from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The task name was empty or whitespace-only.
    #[error("task name must not be blank")]
    EmptyName,
    /// The record claims it was updated before it was created.
    #[error("task {id} was updated ({updated_at}) before it was created ({created_at})")]
    UpdatedBeforeCreated {
        /// Offending task.
        id: TaskId,
        /// Recorded creation time.
        created_at: OffsetDateTime,
        /// Recorded update time.
        updated_at: OffsetDateTime,
    },
}

/// Non-empty, trimmed task name.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskName(String);

impl TaskName {
    /// Trim `raw` and accept it when something is left.
    #[must_use]
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_owned()))
    }

    /// Borrow the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaskName {
    type Error = TaskError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value).ok_or(TaskError::EmptyName)
    }
}

impl From<TaskName> for String {
    fn from(value: TaskName) -> Self {
        value.0
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Trim a description; blank descriptions collapse to `None`.
#[must_use]
pub fn normalize_description(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// A single to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TaskRecord", into = "TaskRecord")]
pub struct Task {
    id: TaskId,
    name: TaskName,
    completed: bool,
    description: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl Task {
    /// Create an incomplete task stamped with `now`.
    #[must_use]
    pub fn new(name: TaskName, description: Option<&str>, now: OffsetDateTime) -> Self {
        let now = clock::truncate_to_millis(now);
        Self {
            id: TaskId::generate(),
            name,
            completed: false,
            description: normalize_description(description),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a task from stored fields.
    ///
    /// # Errors
    /// Returns [`TaskError::UpdatedBeforeCreated`] when the timestamps are inverted.
    pub fn restore(
        id: TaskId,
        name: TaskName,
        completed: bool,
        description: Option<String>,
        created_at: OffsetDateTime,
        updated_at: OffsetDateTime,
    ) -> Result<Self, TaskError> {
        if updated_at < created_at {
            return Err(TaskError::UpdatedBeforeCreated {
                id,
                created_at,
                updated_at,
            });
        }
        Ok(Self {
            id,
            name,
            completed,
            description: normalize_description(description.as_deref()),
            created_at,
            updated_at,
        })
    }

    /// Identifier.
    #[must_use]
    pub const fn id(&self) -> &TaskId {
        &self.id
    }

    /// Display name.
    #[must_use]
    pub const fn name(&self) -> &TaskName {
        &self.name
    }

    /// Completion flag.
    #[must_use]
    pub const fn completed(&self) -> bool {
        self.completed
    }

    /// Optional free-form description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Creation time.
    #[must_use]
    pub const fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    /// Time of the last mutation.
    #[must_use]
    pub const fn updated_at(&self) -> OffsetDateTime {
        self.updated_at
    }

    pub(crate) fn with_completed(&self, completed: bool, now: OffsetDateTime) -> Self {
        let mut next = self.clone();
        next.completed = completed;
        next.touch(now);
        next
    }

    pub(crate) fn with_name(&self, name: TaskName, now: OffsetDateTime) -> Self {
        let mut next = self.clone();
        next.name = name;
        next.touch(now);
        next
    }

    pub(crate) fn with_edit(
        &self,
        name: TaskName,
        description: Option<&DescriptionPatch>,
        now: OffsetDateTime,
    ) -> Self {
        let mut next = self.with_name(name, now);
        match description {
            Some(DescriptionPatch::Set { description }) => {
                next.description = normalize_description(Some(description));
            }
            Some(DescriptionPatch::Clear) => next.description = None,
            None => {}
        }
        next
    }

    pub(crate) fn touched(&self, now: OffsetDateTime) -> Self {
        let mut next = self.clone();
        next.touch(now);
        next
    }

    fn touch(&mut self, now: OffsetDateTime) {
        self.updated_at = clock::advance(self.updated_at, clock::truncate_to_millis(now));
    }
}

/// Patch for the description body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptionPatch {
    /// Overwrite with a new description.
    Set {
        /// Description text.
        description: String,
    },
    /// Clear the description.
    Clear,
}

/// Edit form payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEditData {
    /// New name (trimmed; blank names reject the edit).
    pub name: String,
    /// New description (`None` leaves unchanged, `Some("")` clears).
    #[serde(default)]
    pub description: Option<String>,
}

impl TaskEditData {
    /// Construct a new edit payload.
    #[must_use]
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
        }
    }

    /// Description change requested by this payload, if any.
    #[must_use]
    pub fn description_patch(&self) -> Option<DescriptionPatch> {
        self.description.as_deref().map(|raw| {
            normalize_description(Some(raw))
                .map_or(DescriptionPatch::Clear, |description| DescriptionPatch::Set { description })
        })
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    id: TaskId,
    name: TaskName,
    #[serde(default)]
    completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

impl TryFrom<TaskRecord> for Task {
    type Error = TaskError;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        Self::restore(
            record.id,
            record.name,
            record.completed,
            record.description,
            record.created_at,
            record.updated_at,
        )
    }
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            name: task.name,
            completed: task.completed,
            description: task.description,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}
