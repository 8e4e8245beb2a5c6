//! JSON record format for persisted state.
//!
//! ```json
//! {
//!   "state": {
//!     "tasks": [{
//!       "id": "…", "name": "Buy milk", "completed": false,
//!       "createdAt": { "__type": "Date", "value": "2024-05-01T08:00:00.000Z" },
//!       "updatedAt": { "__type": "Date", "value": "2024-05-01T08:00:00.000Z" }
//!     }],
//!     "filter": "all"
//!   },
//!   "version": 1
//! }
//! ```
//!
//! Dates are tagged so they come back as timestamps rather than strings. Bare
//! RFC 3339 strings are accepted on read as well.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tickbox_core::{Filter, Task, TaskId, TaskName, TodoState};
use time::OffsetDateTime;

use crate::error::DecodeError;

/// Newest record version written by this build.
pub const CURRENT_VERSION: u32 = 1;

/// The slice of store state that survives restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    /// Tasks in display order.
    pub tasks: Vec<Task>,
    /// Active filter.
    pub filter: Filter,
}

impl From<&TodoState> for PersistedState {
    fn from(state: &TodoState) -> Self {
        Self {
            tasks: state.tasks().iter().map(|task| (**task).clone()).collect(),
            filter: state.filter(),
        }
    }
}

impl From<PersistedState> for TodoState {
    fn from(state: PersistedState) -> Self {
        Self::new(state.tasks, state.filter)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredRecord {
    state: StoredState,
    version: u32,
}

#[derive(Serialize, Deserialize)]
struct StoredState {
    tasks: Vec<StoredTask>,
    filter: Filter,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTask {
    id: TaskId,
    name: TaskName,
    completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(with = "tagged_date")]
    created_at: OffsetDateTime,
    #[serde(with = "tagged_date")]
    updated_at: OffsetDateTime,
}

impl From<&Task> for StoredTask {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id().clone(),
            name: task.name().clone(),
            completed: task.completed(),
            description: task.description().map(str::to_owned),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}

/// Serialize `state` into a versioned JSON record.
///
/// # Errors
/// Returns the serializer error; with the types involved this only happens on
/// timestamps outside the four-digit year range.
pub fn encode(state: &PersistedState) -> Result<String, serde_json::Error> {
    let record = StoredRecord {
        state: StoredState {
            tasks: state.tasks.iter().map(StoredTask::from).collect(),
            filter: state.filter,
        },
        version: CURRENT_VERSION,
    };
    serde_json::to_string(&record)
}

/// Parse a JSON record back into state, rejecting it whole on any defect.
///
/// # Errors
/// Returns [`DecodeError`] for malformed JSON, a newer version, invalid tasks or
/// duplicate ids.
pub fn decode(raw: &str) -> Result<PersistedState, DecodeError> {
    let record: StoredRecord = serde_json::from_str(raw)?;
    if record.version > CURRENT_VERSION {
        return Err(DecodeError::UnsupportedVersion {
            found: record.version,
            supported: CURRENT_VERSION,
        });
    }

    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(record.state.tasks.len());
    for stored in record.state.tasks {
        if !seen.insert(stored.id.clone()) {
            return Err(DecodeError::DuplicateId(stored.id));
        }
        tasks.push(Task::restore(
            stored.id,
            stored.name,
            stored.completed,
            stored.description,
            stored.created_at,
            stored.updated_at,
        )?);
    }

    Ok(PersistedState {
        tasks,
        filter: record.state.filter,
    })
}

mod tagged_date {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use time::format_description::BorrowedFormatItem;
    use time::format_description::well_known::Rfc3339;
    use time::macros::format_description;
    use time::{OffsetDateTime, UtcOffset};

    const DATE_TAG: &str = "Date";
    const ISO_MILLIS: &[BorrowedFormatItem<'_>] =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

    #[derive(Serialize)]
    struct Tagged<'a> {
        #[serde(rename = "__type")]
        kind: &'a str,
        value: &'a str,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Tagged {
            #[serde(rename = "__type")]
            kind: String,
            value: String,
        },
        Plain(String),
    }

    pub fn serialize<S>(ts: &OffsetDateTime, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let value = ts
            .to_offset(UtcOffset::UTC)
            .format(ISO_MILLIS)
            .map_err(serde::ser::Error::custom)?;
        Tagged {
            kind: DATE_TAG,
            value: &value,
        }
        .serialize(s)
    }

    pub fn deserialize<'de, D>(d: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = match Repr::deserialize(d)? {
            Repr::Tagged { kind, value } if kind == DATE_TAG => value,
            Repr::Tagged { kind, .. } => {
                return Err(serde::de::Error::custom(format!("unexpected tagged type '{kind}'")));
            }
            Repr::Plain(value) => value,
        };
        let parsed = OffsetDateTime::parse(&value, &Rfc3339).map_err(serde::de::Error::custom)?;
        Ok(tickbox_core::clock::truncate_to_millis(parsed.to_offset(UtcOffset::UTC)))
    }
}
