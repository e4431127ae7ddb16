mod heartbeat;
mod reconciler;

pub use heartbeat::{HeartbeatScheduler, LessonRef};
pub use reconciler::{ProgressReconciler, ProgressSnapshot, SeekVerdict};
