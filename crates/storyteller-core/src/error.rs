//! Error types shared across the backend.

use thiserror::Error;
use uuid::Uuid;

/// Failures raised by the playback engine and the session controller.
///
/// Boundary conditions (reaching the start or end of the main sequence) are
/// deliberately not represented here: they are ordinary command outcomes,
/// not failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// The active timeline has no content (or no timeline is active).
    #[error("no content to display")]
    NoContent,

    /// A jump target does not exist.
    #[error("position out of range: {0}")]
    OutOfRange(String),

    /// The command is not valid for the addressed object.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A referenced branch does not exist in the snapshot.
    #[error("unknown branch: {0}")]
    UnknownBranch(Uuid),
}

/// Failures raised by the content store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed storyline, inject, or branch was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A structural validation rule was violated.
    #[error("validation error: {0}")]
    Validation(String),

    /// Reading or writing the backing document failed.
    #[error("storage error: {0}")]
    Io(String),
}
