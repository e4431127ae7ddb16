//! Shared error types for the services crate.

use thiserror::Error;

use portal_core::model::LessonId;
use storage::repository::StorageError;

/// Errors emitted while syncing lesson progress.
///
/// These never reach the learner: the heartbeat boundary logs and swallows
/// them, and the next tick retries with the latest buffered value.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressSyncError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the assessment session and its runner.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AssessmentSessionError {
    #[error("question index {index} out of range (question count {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("submission already in flight")]
    SubmissionInFlight,

    #[error("assessment already submitted")]
    AlreadySubmitted,

    #[error("submission failed: {0}")]
    Submission(#[source] StorageError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the lesson orchestrator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OrchestratorError {
    #[error("unknown lesson: {0}")]
    UnknownLesson(LessonId),

    #[error("quiz lesson {0} has no assessment definition")]
    MissingAssessment(LessonId),

    #[error("no active assessment session")]
    NoActiveAssessment,

    #[error(transparent)]
    Session(#[from] AssessmentSessionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
