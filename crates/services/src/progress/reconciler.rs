//! Client-side progress reconciliation for a single video lesson.
//!
//! Pure state. The reconciler tracks the furthest honestly watched second,
//! answers seek-guard questions, and decides when the lesson counts as
//! completed. Persistence and timers live in [`super::HeartbeatScheduler`].

use portal_core::model::LessonProgress;

/// Outcome of the seek guard for a reported playback position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekVerdict {
    /// Position is within the allowed window; play on.
    Allowed,
    /// Position skipped past the watched horizon; snap back to this second.
    Rewind(f64),
}

/// Point-in-time progress values, ready to persist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub seek_position: f64,
    pub max_watched_second: f64,
    pub percent: u8,
    pub is_completed: bool,
}

/// Tracks watched-time state for one lesson viewing.
#[derive(Debug, Clone)]
pub struct ProgressReconciler {
    max_watched: f64,
    last_good_time: f64,
    seek_position: f64,
    duration: Option<f64>,
    is_completed: bool,
    completion_percent: u8,
    seek_horizon: f64,
    seek_tolerance: f64,
}

impl ProgressReconciler {
    /// Fresh reconciler for a lesson with no stored progress.
    #[must_use]
    pub fn new(completion_percent: u8, seek_horizon_secs: u64, seek_tolerance_secs: u64) -> Self {
        Self {
            max_watched: 0.0,
            last_good_time: 0.0,
            seek_position: 0.0,
            duration: None,
            is_completed: false,
            completion_percent,
            seek_horizon: seek_horizon_secs as f64,
            seek_tolerance: seek_tolerance_secs as f64,
        }
    }

    /// Resumes from stored progress.
    #[must_use]
    pub fn from_progress(
        progress: &LessonProgress,
        completion_percent: u8,
        seek_horizon_secs: u64,
        seek_tolerance_secs: u64,
    ) -> Self {
        let mut reconciler = Self::new(completion_percent, seek_horizon_secs, seek_tolerance_secs);
        reconciler.max_watched = progress.max_watched_second();
        reconciler.last_good_time = progress.max_watched_second();
        reconciler.seek_position = progress.seek_position();
        reconciler.is_completed = progress.is_completed();
        reconciler
    }

    #[must_use]
    pub fn max_watched_second(&self) -> f64 {
        self.max_watched
    }

    #[must_use]
    pub fn seek_position(&self) -> f64 {
        self.seek_position
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn set_duration(&mut self, duration_secs: f64) {
        if duration_secs.is_finite() && duration_secs > 0.0 {
            self.duration = Some(duration_secs);
        }
    }

    /// Folds a reported playback position into the high-water mark.
    ///
    /// Garbage samples (NaN, infinite, negative) are replaced with the last
    /// good time. The high-water mark only ever rises; the returned value is
    /// the mark after this observation.
    pub fn observe_time(&mut self, reported_secs: f64) -> f64 {
        let time = if reported_secs.is_finite() && reported_secs >= 0.0 {
            reported_secs
        } else {
            self.last_good_time
        };
        self.last_good_time = time;
        self.seek_position = time;
        if time > self.max_watched {
            self.max_watched = time;
        }
        self.max_watched
    }

    /// Checks a reported position against the watched horizon.
    ///
    /// Completed lessons may be scrubbed freely. Otherwise a position more
    /// than horizon + tolerance seconds past the high-water mark is a skip
    /// and the player must snap back to the mark.
    #[must_use]
    pub fn check_seek(&self, reported_secs: f64) -> SeekVerdict {
        if self.is_completed {
            return SeekVerdict::Allowed;
        }
        if !reported_secs.is_finite() {
            return SeekVerdict::Allowed;
        }
        if reported_secs > self.max_watched + self.seek_horizon + self.seek_tolerance {
            SeekVerdict::Rewind(self.max_watched)
        } else {
            SeekVerdict::Allowed
        }
    }

    /// Percent of the media covered by the high-water mark, capped at 100.
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.is_completed {
            return 100;
        }
        match self.duration {
            Some(duration) if duration > 0.0 => {
                let pct = (self.max_watched / duration * 100.0).floor();
                pct.clamp(0.0, 100.0) as u8
            }
            _ => 0,
        }
    }

    /// True when the watched percentage has reached the completion threshold
    /// and the lesson is not yet completed.
    #[must_use]
    pub fn completion_due(&self) -> bool {
        !self.is_completed && self.percent() >= self.completion_percent
    }

    /// Marks the lesson completed because the threshold was crossed or the
    /// media ended. Returns true only on the transition.
    pub fn complete(&mut self) -> bool {
        if self.is_completed {
            return false;
        }
        self.is_completed = true;
        true
    }

    /// Values to persist right now.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            seek_position: self.seek_position,
            max_watched_second: self.max_watched,
            percent: self.percent(),
            is_completed: self.is_completed,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn build_reconciler() -> ProgressReconciler {
        let mut reconciler = ProgressReconciler::new(90, 15, 2);
        reconciler.set_duration(100.0);
        reconciler
    }

    #[test]
    fn high_water_mark_is_monotonic() {
        let mut reconciler = build_reconciler();
        assert_eq!(reconciler.observe_time(10.0), 10.0);
        assert_eq!(reconciler.observe_time(4.0), 10.0);
        assert_eq!(reconciler.observe_time(12.5), 12.5);
        assert_eq!(reconciler.seek_position(), 12.5);
    }

    #[test]
    fn garbage_samples_fall_back_to_last_good_time() {
        let mut reconciler = build_reconciler();
        reconciler.observe_time(8.0);
        assert_eq!(reconciler.observe_time(f64::NAN), 8.0);
        assert_eq!(reconciler.observe_time(-3.0), 8.0);
        assert_eq!(reconciler.observe_time(f64::INFINITY), 8.0);
        assert_eq!(reconciler.max_watched_second(), 8.0);
    }

    #[test]
    fn seek_guard_allows_within_horizon_and_rewinds_past_it() {
        let mut reconciler = build_reconciler();
        reconciler.observe_time(30.0);
        // horizon 15 + tolerance 2 = 47.0 is the last allowed position
        assert_eq!(reconciler.check_seek(47.0), SeekVerdict::Allowed);
        assert_eq!(reconciler.check_seek(47.1), SeekVerdict::Rewind(30.0));
        assert_eq!(reconciler.check_seek(5.0), SeekVerdict::Allowed);
    }

    #[test]
    fn completed_lessons_may_scrub_freely() {
        let mut reconciler = build_reconciler();
        reconciler.observe_time(10.0);
        assert!(reconciler.complete());
        assert_eq!(reconciler.check_seek(95.0), SeekVerdict::Allowed);
    }

    #[test]
    fn completion_threshold_and_one_shot_transition() {
        let mut reconciler = build_reconciler();
        reconciler.observe_time(89.0);
        assert!(!reconciler.completion_due());
        reconciler.observe_time(90.0);
        assert!(reconciler.completion_due());
        assert!(reconciler.complete());
        assert!(!reconciler.complete());
        assert!(!reconciler.completion_due());
        assert_eq!(reconciler.percent(), 100);
    }

    #[test]
    fn percent_is_zero_without_duration() {
        let mut reconciler = ProgressReconciler::new(90, 15, 2);
        reconciler.observe_time(50.0);
        assert_eq!(reconciler.percent(), 0);
        assert!(!reconciler.completion_due());
    }

    #[test]
    fn resumes_from_stored_progress() {
        use portal_core::model::{CourseId, LearnerId, LessonId, ModuleId};

        let stored = LessonProgress::from_persisted(
            LearnerId::new("u1"),
            CourseId::new("c1"),
            ModuleId::new("m1"),
            LessonId::new("l1"),
            42.0,
            60.0,
            60,
            false,
            Some(portal_core::time::fixed_now()),
        );
        let reconciler = ProgressReconciler::from_progress(&stored, 90, 15, 2);
        assert_eq!(reconciler.max_watched_second(), 60.0);
        assert_eq!(reconciler.check_seek(78.0), SeekVerdict::Rewind(60.0));
    }
}
