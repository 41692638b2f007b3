//! Shared error types for the services crate.
//!
//! Every public operation returns one of these as a value; nothing here
//! is fatal to the process and no variant triggers a retry. The three
//! caller-visible kinds are not-found, conflict, and store failure.

use thiserror::Error;

use storage::repository::StorageError;
use study_core::model::CardError;
use study_core::scheduler::SchedulerError;

/// Errors emitted by `PracticeService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PracticeError {
    /// The candidate pool came back empty (possibly after filtering).
    #[error("no flashcards found")]
    NoCards,

    /// A review referenced a card id the store does not know.
    #[error("flashcard {0} not found")]
    CardNotFound(String),

    #[error(transparent)]
    Card(#[from] CardError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<SchedulerError> for PracticeError {
    fn from(_: SchedulerError) -> Self {
        // The scheduler's only failure mode is an empty candidate pool.
        Self::NoCards
    }
}

/// Errors emitted by `SessionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// Double start: a Started record already exists in the store.
    #[error("a session is already active")]
    AlreadyActive,

    /// Stop without start: no Started record exists in the store.
    #[error("no active session found to stop")]
    NotActive,

    #[error(transparent)]
    Storage(#[from] StorageError),
}
