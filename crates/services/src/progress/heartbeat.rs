//! Periodic progress persistence.
//!
//! While a video plays, a background task flushes the reconciler's snapshot
//! to the progress store on a fixed interval. Pause, end, and teardown all
//! stop the ticker and force one final flush so nothing watched since the
//! last tick is lost.

use std::sync::Arc;
use std::time::Duration;

use portal_core::Clock;
use portal_core::model::{CourseId, LearnerId, LessonId, ModuleId, ProgressUpdate};
use storage::ProgressRepository;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::ProgressReconciler;
use crate::error::ProgressSyncError;

/// Identity of the lesson a scheduler is persisting for.
#[derive(Debug, Clone)]
pub struct LessonRef {
    pub learner_id: LearnerId,
    pub course_id: CourseId,
    pub module_id: ModuleId,
    pub lesson_id: LessonId,
}

/// Drives interval-based progress writes for one lesson viewing.
pub struct HeartbeatScheduler {
    reconciler: Arc<Mutex<ProgressReconciler>>,
    store: Arc<dyn ProgressRepository>,
    lesson: LessonRef,
    interval: Duration,
    clock: Clock,
    tick: Option<JoinHandle<()>>,
}

impl HeartbeatScheduler {
    #[must_use]
    pub fn new(
        reconciler: Arc<Mutex<ProgressReconciler>>,
        store: Arc<dyn ProgressRepository>,
        lesson: LessonRef,
        interval: Duration,
        clock: Clock,
    ) -> Self {
        Self {
            reconciler,
            store,
            lesson,
            interval,
            clock,
            tick: None,
        }
    }

    /// Starts the interval ticker. A second call while playing is a no-op.
    pub fn on_play(&mut self) {
        if self.tick.is_some() {
            return;
        }
        let reconciler = Arc::clone(&self.reconciler);
        let store = Arc::clone(&self.store);
        let lesson = self.lesson.clone();
        let interval = self.interval;
        let clock = self.clock;
        self.tick = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                flush(&reconciler, store.as_ref(), &lesson, clock).await;
            }
        }));
    }

    /// Stops the ticker and flushes once.
    pub async fn on_pause(&mut self) {
        self.stop();
        self.sync().await;
    }

    /// Stops the ticker and flushes once.
    pub async fn on_ended(&mut self) {
        self.stop();
        self.sync().await;
    }

    /// One immediate flush, independent of the ticker.
    pub async fn sync(&self) {
        flush(&self.reconciler, self.store.as_ref(), &self.lesson, self.clock).await;
    }

    /// Stops the ticker without flushing.
    pub fn stop(&mut self) {
        if let Some(tick) = self.tick.take() {
            tick.abort();
        }
    }

    #[must_use]
    pub fn is_ticking(&self) -> bool {
        self.tick.is_some()
    }
}

impl Drop for HeartbeatScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Persists the current snapshot. Sync failures never escape the heartbeat
/// boundary: they are logged and the next tick retries with fresher state.
async fn flush(
    reconciler: &Mutex<ProgressReconciler>,
    store: &dyn ProgressRepository,
    lesson: &LessonRef,
    clock: Clock,
) {
    if let Err(error) = write_snapshot(reconciler, store, lesson, clock).await {
        tracing::warn!(
            lesson = %lesson.lesson_id,
            %error,
            "progress sync failed; will retry on next heartbeat"
        );
    }
}

async fn write_snapshot(
    reconciler: &Mutex<ProgressReconciler>,
    store: &dyn ProgressRepository,
    lesson: &LessonRef,
    clock: Clock,
) -> Result<(), ProgressSyncError> {
    let snapshot = reconciler.lock().await.snapshot();
    let update = ProgressUpdate {
        learner_id: lesson.learner_id.clone(),
        course_id: lesson.course_id.clone(),
        module_id: lesson.module_id.clone(),
        lesson_id: lesson.lesson_id.clone(),
        seek_position: snapshot.seek_position,
        max_watched_second: snapshot.max_watched_second,
        percent: snapshot.percent,
        is_completed: snapshot.is_completed,
    };
    store.write_progress(&update, clock.now()).await?;
    Ok(())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use portal_core::model::LessonProgress;
    use portal_core::time::fixed_clock;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storage::StorageError;

    #[derive(Default)]
    struct RecordingStore {
        writes: StdMutex<Vec<ProgressUpdate>>,
    }

    #[async_trait]
    impl ProgressRepository for RecordingStore {
        async fn read_progress(
            &self,
            _learner_id: &LearnerId,
            _course_id: &CourseId,
            _module_id: &ModuleId,
            _lesson_id: &LessonId,
        ) -> Result<Option<LessonProgress>, StorageError> {
            Ok(None)
        }

        async fn write_progress(
            &self,
            update: &ProgressUpdate,
            _at: DateTime<Utc>,
        ) -> Result<(), StorageError> {
            self.writes.lock().unwrap().push(update.clone());
            Ok(())
        }

        async fn list_course_progress(
            &self,
            _learner_id: &LearnerId,
            _course_id: &CourseId,
        ) -> Result<Vec<LessonProgress>, StorageError> {
            Ok(Vec::new())
        }
    }

    fn build_scheduler(
        store: Arc<RecordingStore>,
    ) -> (Arc<Mutex<ProgressReconciler>>, HeartbeatScheduler) {
        let mut reconciler = ProgressReconciler::new(90, 15, 2);
        reconciler.set_duration(100.0);
        let reconciler = Arc::new(Mutex::new(reconciler));
        let lesson = LessonRef {
            learner_id: LearnerId::new("u1"),
            course_id: CourseId::new("c1"),
            module_id: ModuleId::new("m1"),
            lesson_id: LessonId::new("l1"),
        };
        let scheduler = HeartbeatScheduler::new(
            Arc::clone(&reconciler),
            store,
            lesson,
            Duration::from_secs(10),
            fixed_clock(),
        );
        (reconciler, scheduler)
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_on_interval_while_playing() {
        let store = Arc::new(RecordingStore::default());
        let (reconciler, mut scheduler) = build_scheduler(Arc::clone(&store));

        scheduler.on_play();
        reconciler.lock().await.observe_time(3.0);
        tokio::time::sleep(Duration::from_secs(25)).await;

        let writes = store.writes.lock().unwrap();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].max_watched_second, 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_ticker_and_flushes_once() {
        let store = Arc::new(RecordingStore::default());
        let (reconciler, mut scheduler) = build_scheduler(Arc::clone(&store));

        scheduler.on_play();
        reconciler.lock().await.observe_time(7.0);
        scheduler.on_pause().await;
        assert!(!scheduler.is_ticking());

        tokio::time::sleep(Duration::from_secs(60)).await;
        let writes = store.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].max_watched_second, 7.0);
    }

    /// Fails the first `failures` writes, then delegates to a plain recorder.
    struct FlakyStore {
        recorder: RecordingStore,
        failures: AtomicUsize,
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl ProgressRepository for FlakyStore {
        async fn read_progress(
            &self,
            _learner_id: &LearnerId,
            _course_id: &CourseId,
            _module_id: &ModuleId,
            _lesson_id: &LessonId,
        ) -> Result<Option<LessonProgress>, StorageError> {
            Ok(None)
        }

        async fn write_progress(
            &self,
            update: &ProgressUpdate,
            at: DateTime<Utc>,
        ) -> Result<(), StorageError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(StorageError::Connection("progress store offline".into()));
            }
            self.recorder.write_progress(update, at).await
        }

        async fn list_course_progress(
            &self,
            _learner_id: &LearnerId,
            _course_id: &CourseId,
        ) -> Result<Vec<LessonProgress>, StorageError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sync_failures_are_swallowed_and_the_ticker_keeps_retrying() {
        let store = Arc::new(FlakyStore {
            recorder: RecordingStore::default(),
            failures: AtomicUsize::new(2),
            attempts: AtomicUsize::new(0),
        });
        let mut reconciler = ProgressReconciler::new(90, 15, 2);
        reconciler.set_duration(100.0);
        let reconciler = Arc::new(Mutex::new(reconciler));
        let lesson = LessonRef {
            learner_id: LearnerId::new("u1"),
            course_id: CourseId::new("c1"),
            module_id: ModuleId::new("m1"),
            lesson_id: LessonId::new("l1"),
        };
        let mut scheduler = HeartbeatScheduler::new(
            Arc::clone(&reconciler),
            Arc::clone(&store) as Arc<dyn ProgressRepository>,
            lesson,
            Duration::from_secs(10),
            fixed_clock(),
        );

        scheduler.on_play();
        reconciler.lock().await.observe_time(6.0);
        tokio::time::sleep(Duration::from_secs(35)).await;

        // two failures did not stop the ticker; the third attempt landed
        assert_eq!(store.attempts.load(Ordering::SeqCst), 3);
        let writes = store.recorder.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].max_watched_second, 6.0);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_play_does_not_double_tick() {
        let store = Arc::new(RecordingStore::default());
        let (_reconciler, mut scheduler) = build_scheduler(Arc::clone(&store));

        scheduler.on_play();
        scheduler.on_play();
        // Sleep past the first tick but short of the second so the flush's
        // deadline is strictly earlier than this wakeup under paused time.
        tokio::time::sleep(Duration::from_secs(15)).await;

        assert_eq!(store.writes.lock().unwrap().len(), 1);
    }
}
