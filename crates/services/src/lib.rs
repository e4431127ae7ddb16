#![forbid(unsafe_code)]

pub mod assessment;
pub mod error;
pub mod lesson;
pub mod playback;
pub mod progress;

pub use portal_core::Clock;

pub use assessment::{
    AssessmentOpening, AssessmentRunner, AssessmentSession, AssessmentView, SessionPhase,
};
pub use error::{AssessmentSessionError, OrchestratorError, ProgressSyncError};
pub use lesson::{
    ActiveLesson, CourseTreeView, LessonNavigation, LessonNodeView, LessonOrchestrator, ModuleView,
    PlayerFactory, VideoEngine, VideoSignal,
};
pub use playback::{PlaybackEvent, PlaybackPoller, PlayerHandle, PlayerState};
pub use progress::{HeartbeatScheduler, LessonRef, ProgressReconciler, ProgressSnapshot, SeekVerdict};
