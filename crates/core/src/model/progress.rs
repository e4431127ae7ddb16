use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{CourseId, LearnerId, LessonId, ModuleId};

//
// ─── LESSON PROGRESS ───────────────────────────────────────────────────────────
//

/// Per-lesson watch state for one learner.
///
/// `max_watched_second` is a high-water mark: it never decreases across the
/// lifetime of the record, even when the current playback position regresses
/// via seeking. `is_completed` is a one-way transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonProgress {
    learner_id: LearnerId,
    course_id: CourseId,
    module_id: ModuleId,
    lesson_id: LessonId,
    seek_position: f64,
    max_watched_second: f64,
    percent: u8,
    is_completed: bool,
    last_synced_at: Option<DateTime<Utc>>,
}

impl LessonProgress {
    /// Fresh record for a lesson the learner has not watched yet.
    #[must_use]
    pub fn new(
        learner_id: LearnerId,
        course_id: CourseId,
        module_id: ModuleId,
        lesson_id: LessonId,
    ) -> Self {
        Self {
            learner_id,
            course_id,
            module_id,
            lesson_id,
            seek_position: 0.0,
            max_watched_second: 0.0,
            percent: 0,
            is_completed: false,
            last_synced_at: None,
        }
    }

    /// Rehydrates a record as read back from the store.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        learner_id: LearnerId,
        course_id: CourseId,
        module_id: ModuleId,
        lesson_id: LessonId,
        seek_position: f64,
        max_watched_second: f64,
        percent: u8,
        is_completed: bool,
        last_synced_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            learner_id,
            course_id,
            module_id,
            lesson_id,
            seek_position: seek_position.max(0.0),
            max_watched_second: max_watched_second.max(0.0),
            percent: if is_completed { 100 } else { percent.min(100) },
            is_completed,
            last_synced_at,
        }
    }

    #[must_use]
    pub fn learner_id(&self) -> &LearnerId {
        &self.learner_id
    }

    #[must_use]
    pub fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    #[must_use]
    pub fn module_id(&self) -> &ModuleId {
        &self.module_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    /// Current playback position at the last sync.
    #[must_use]
    pub fn seek_position(&self) -> f64 {
        self.seek_position
    }

    /// Furthest second ever reached.
    #[must_use]
    pub fn max_watched_second(&self) -> f64 {
        self.max_watched_second
    }

    /// Watched percentage, pinned to 100 once completed.
    #[must_use]
    pub fn percent(&self) -> u8 {
        self.percent
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    #[must_use]
    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.last_synced_at
    }

    /// Folds an incoming update into this record, upholding the invariants:
    /// the high-water mark takes a max and completion never regresses, so
    /// reordered deliveries are harmless.
    pub fn merge(&mut self, update: &ProgressUpdate, at: DateTime<Utc>) {
        self.seek_position = update.seek_position.max(0.0);
        self.max_watched_second = self.max_watched_second.max(update.max_watched_second);
        self.is_completed = self.is_completed || update.is_completed;
        self.percent = if self.is_completed {
            100
        } else {
            self.percent.max(update.percent.min(100))
        };
        self.last_synced_at = Some(at);
    }
}

//
// ─── PROGRESS UPDATE ───────────────────────────────────────────────────────────
//

/// Write shape pushed by the heartbeat scheduler and manual completion.
///
/// The store applies this with [`LessonProgress::merge`] rather than a blind
/// overwrite; callers may race without losing the furthest-watched value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub learner_id: LearnerId,
    pub course_id: CourseId,
    pub module_id: ModuleId,
    pub lesson_id: LessonId,
    pub seek_position: f64,
    pub max_watched_second: f64,
    pub percent: u8,
    pub is_completed: bool,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn progress() -> LessonProgress {
        LessonProgress::new(
            LearnerId::new("u1"),
            CourseId::new("c1"),
            ModuleId::new("m1"),
            LessonId::new("l1"),
        )
    }

    fn update(max: f64, completed: bool) -> ProgressUpdate {
        ProgressUpdate {
            learner_id: LearnerId::new("u1"),
            course_id: CourseId::new("c1"),
            module_id: ModuleId::new("m1"),
            lesson_id: LessonId::new("l1"),
            seek_position: max,
            max_watched_second: max,
            percent: 0,
            is_completed: completed,
        }
    }

    #[test]
    fn merge_keeps_high_water_mark_under_reordering() {
        let mut p = progress();
        p.merge(&update(120.0, false), fixed_now());
        p.merge(&update(40.0, false), fixed_now());

        assert_eq!(p.max_watched_second(), 120.0);
        // seek position tracks the latest write, not the max
        assert_eq!(p.seek_position(), 40.0);
    }

    #[test]
    fn merge_never_regresses_completion() {
        let mut p = progress();
        p.merge(&update(10.0, true), fixed_now());
        p.merge(&update(20.0, false), fixed_now());

        assert!(p.is_completed());
        assert_eq!(p.percent(), 100);
    }

    #[test]
    fn persisted_completed_record_pins_percent() {
        let p = LessonProgress::from_persisted(
            LearnerId::new("u1"),
            CourseId::new("c1"),
            ModuleId::new("m1"),
            LessonId::new("l1"),
            30.0,
            30.0,
            40,
            true,
            Some(fixed_now()),
        );
        assert_eq!(p.percent(), 100);
    }
}
