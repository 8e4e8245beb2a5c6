//! Error types for persisted state storage.

use thiserror::Error;
use tickbox_core::{TaskError, TaskId};

/// Errors that can occur while reading or writing a storage medium.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The medium cannot be used in this environment.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize state to JSON.
    #[error("failed to serialize state: {0}")]
    Encode(#[source] serde_json::Error),

    /// Stored payload could not be turned back into state.
    #[error("failed to decode persisted state: {0}")]
    Decode(#[from] DecodeError),
}

/// Reasons a persisted record is rejected as a whole.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Not JSON, or JSON of the wrong shape.
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Written by a newer release.
    #[error("unsupported record version {found} (newest known is {supported})")]
    UnsupportedVersion {
        /// Version found in the record.
        found: u32,
        /// Newest version this build understands.
        supported: u32,
    },

    /// A stored task violates a domain invariant.
    #[error("invalid task: {0}")]
    Task(#[from] TaskError),

    /// Two stored tasks share an id.
    #[error("duplicate task id: {0}")]
    DuplicateId(TaskId),
}
