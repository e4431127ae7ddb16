//! Video lesson engine.
//!
//! Binds a player to the reconciler and heartbeat for one lesson viewing:
//! enforces the seek guard, applies the resume hint, and surfaces the
//! completion transition to the orchestrator.

use std::sync::Arc;
use std::time::Duration;

use portal_core::Clock;
use portal_core::model::{EngineSettings, LessonProgress};
use storage::ProgressRepository;
use tokio::sync::Mutex;

use crate::playback::{PlaybackEvent, PlayerHandle};
use crate::progress::{HeartbeatScheduler, LessonRef, ProgressReconciler, SeekVerdict};

/// What a playback event meant for the lesson's course-level state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSignal {
    None,
    /// The lesson just transitioned to completed.
    Completed,
}

/// Drives one video lesson viewing.
pub struct VideoEngine {
    reconciler: Arc<Mutex<ProgressReconciler>>,
    heartbeat: HeartbeatScheduler,
    player: Arc<dyn PlayerHandle>,
    resume_threshold: f64,
}

impl VideoEngine {
    /// Builds the engine for a lesson, resuming from stored progress when
    /// present.
    #[must_use]
    pub fn new(
        lesson: LessonRef,
        stored: Option<&LessonProgress>,
        player: Arc<dyn PlayerHandle>,
        store: Arc<dyn ProgressRepository>,
        settings: &EngineSettings,
        clock: Clock,
    ) -> Self {
        let reconciler = match stored {
            Some(progress) => ProgressReconciler::from_progress(
                progress,
                settings.completion_percent(),
                u64::from(settings.seek_horizon_secs()),
                u64::from(settings.seek_tolerance_secs()),
            ),
            None => ProgressReconciler::new(
                settings.completion_percent(),
                u64::from(settings.seek_horizon_secs()),
                u64::from(settings.seek_tolerance_secs()),
            ),
        };
        let reconciler = Arc::new(Mutex::new(reconciler));
        let heartbeat = HeartbeatScheduler::new(
            Arc::clone(&reconciler),
            store,
            lesson,
            Duration::from_secs(u64::from(settings.heartbeat_interval_secs())),
            clock,
        );
        Self {
            reconciler,
            heartbeat,
            player,
            resume_threshold: f64::from(settings.resume_threshold_secs()),
        }
    }

    /// Folds one playback event into the lesson state.
    ///
    /// Returns [`VideoSignal::Completed`] exactly once, on the viewing that
    /// crosses the completion threshold or reaches the end of the media.
    pub async fn handle_event(&mut self, event: PlaybackEvent) -> VideoSignal {
        match event {
            PlaybackEvent::Ready { initial_seek_hint: _ } => {
                if let Some(duration) = self.player.duration() {
                    self.reconciler.lock().await.set_duration(duration);
                }
                let (max_watched, completed) = {
                    let reconciler = self.reconciler.lock().await;
                    (reconciler.max_watched_second(), reconciler.is_completed())
                };
                // Resume where the learner left off, but never for completed
                // lessons or trivially short prior progress.
                if !completed && max_watched > self.resume_threshold {
                    self.player.seek_to(max_watched);
                }
                VideoSignal::None
            }
            PlaybackEvent::TimeUpdate(seconds) => {
                let mut reconciler = self.reconciler.lock().await;
                match reconciler.check_seek(seconds) {
                    SeekVerdict::Rewind(to) => {
                        // Skipped ahead; snap back without crediting the time.
                        drop(reconciler);
                        self.player.seek_to(to);
                        VideoSignal::None
                    }
                    SeekVerdict::Allowed => {
                        reconciler.observe_time(seconds);
                        if reconciler.completion_due() && reconciler.complete() {
                            drop(reconciler);
                            self.heartbeat.sync().await;
                            VideoSignal::Completed
                        } else {
                            VideoSignal::None
                        }
                    }
                }
            }
            PlaybackEvent::Play => {
                self.heartbeat.on_play();
                VideoSignal::None
            }
            PlaybackEvent::Pause => {
                self.heartbeat.on_pause().await;
                VideoSignal::None
            }
            PlaybackEvent::Ended => {
                let newly_completed = self.reconciler.lock().await.complete();
                self.heartbeat.on_ended().await;
                if newly_completed {
                    VideoSignal::Completed
                } else {
                    VideoSignal::None
                }
            }
        }
    }

    /// Marks the lesson completed outside playback (text lessons reuse the
    /// video path for their manual button in some hosts). Idempotent.
    pub async fn mark_complete(&mut self) -> VideoSignal {
        let newly_completed = self.reconciler.lock().await.complete();
        self.heartbeat.sync().await;
        if newly_completed {
            VideoSignal::Completed
        } else {
            VideoSignal::None
        }
    }

    #[must_use]
    pub async fn is_completed(&self) -> bool {
        self.reconciler.lock().await.is_completed()
    }

    /// Stops the heartbeat and flushes the final snapshot.
    pub async fn teardown(&mut self) {
        self.heartbeat.stop();
        self.heartbeat.sync().await;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
