//! Course-level coordination.
//!
//! The orchestrator owns lesson selection for one learner in one course. It
//! tears down the outgoing lesson's engine before the next one starts, keeps
//! the completed set current, and routes playback and assessment calls to
//! whichever engine is active.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use portal_core::Clock;
use portal_core::model::{
    AnswerValue, Assessment, AssessmentId, AssessmentSubmission, CourseOutline, EngineSettings,
    LearnerId, Lesson, LessonId, LessonType, ProgressUpdate, QuestionId,
};
use storage::Storage;

use super::navigation::LessonNavigation;
use super::video::{VideoEngine, VideoSignal};
use super::view::CourseTreeView;
use crate::assessment::{AssessmentOpening, AssessmentRunner};
use crate::error::OrchestratorError;
use crate::playback::{PlaybackEvent, PlayerHandle};
use crate::progress::LessonRef;

/// Supplies a player handle for each video lesson the host opens.
pub trait PlayerFactory: Send + Sync {
    fn player_for(&self, lesson: &Lesson) -> Arc<dyn PlayerHandle>;
}

/// The engine currently bound to the selected lesson.
pub enum ActiveLesson {
    Video {
        lesson_id: LessonId,
        engine: VideoEngine,
    },
    Quiz {
        lesson_id: LessonId,
        runner: AssessmentRunner,
    },
    /// Quiz already submitted; read-only result.
    Review {
        lesson_id: LessonId,
        submission: AssessmentSubmission,
    },
    Content {
        lesson_id: LessonId,
    },
}

impl ActiveLesson {
    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        match self {
            ActiveLesson::Video { lesson_id, .. }
            | ActiveLesson::Quiz { lesson_id, .. }
            | ActiveLesson::Review { lesson_id, .. }
            | ActiveLesson::Content { lesson_id } => lesson_id,
        }
    }
}

/// One learner working through one course.
pub struct LessonOrchestrator {
    learner_id: LearnerId,
    outline: CourseOutline,
    navigation: LessonNavigation,
    assessments: HashMap<AssessmentId, Assessment>,
    storage: Storage,
    player_factory: Arc<dyn PlayerFactory>,
    settings: EngineSettings,
    clock: Clock,
    auto_advance: bool,
    completed: HashSet<LessonId>,
    active: Option<ActiveLesson>,
}

impl LessonOrchestrator {
    /// Builds the orchestrator and seeds completion state from storage.
    ///
    /// Video and text completion comes from the progress store; quiz
    /// completion comes from the submission store, which is authoritative
    /// for graded work.
    ///
    /// # Errors
    ///
    /// Returns storage errors from the initial reads.
    pub async fn new(
        learner_id: LearnerId,
        outline: CourseOutline,
        assessments: Vec<Assessment>,
        storage: Storage,
        player_factory: Arc<dyn PlayerFactory>,
        settings: EngineSettings,
        clock: Clock,
    ) -> Result<Self, OrchestratorError> {
        let navigation = LessonNavigation::from_outline(&outline);
        let assessments: HashMap<_, _> = assessments
            .into_iter()
            .map(|assessment| (assessment.id().clone(), assessment))
            .collect();

        let mut completed = HashSet::new();
        for record in storage
            .progress
            .list_course_progress(&learner_id, outline.course_id())
            .await?
        {
            if record.is_completed() {
                completed.insert(record.lesson_id().clone());
            }
        }
        for lesson in outline.flattened() {
            if lesson.lesson_type() != LessonType::Quiz {
                continue;
            }
            let Some(assessment_id) = lesson.assessment_id() else {
                continue;
            };
            if storage
                .assessments
                .read_submission(&learner_id, assessment_id)
                .await?
                .is_some()
            {
                completed.insert(lesson.id().clone());
            } else {
                // A quiz counts only once submitted, whatever progress says.
                completed.remove(lesson.id());
            }
        }

        Ok(Self {
            learner_id,
            outline,
            navigation,
            assessments,
            storage,
            player_factory,
            settings,
            clock,
            auto_advance: false,
            completed,
            active: None,
        })
    }

    //
    // ─── SELECTION ─────────────────────────────────────────────────────────────
    //

    /// Switches to a lesson, tearing down the previous engine first.
    ///
    /// Teardown flushes the outgoing video lesson's progress and cancels its
    /// heartbeat and any pending quiz autosave, so nothing from the old
    /// lesson writes after the new one is live.
    ///
    /// # Errors
    ///
    /// `UnknownLesson` for an id outside the outline, `MissingAssessment`
    /// for a quiz lesson without a loaded assessment, plus storage errors.
    pub async fn select_lesson(&mut self, lesson_id: &LessonId) -> Result<(), OrchestratorError> {
        self.teardown_active().await;

        let lesson = self
            .outline
            .lesson(lesson_id)
            .ok_or_else(|| OrchestratorError::UnknownLesson(lesson_id.clone()))?
            .clone();

        let active = match lesson.lesson_type() {
            LessonType::Video => {
                let module_id = self
                    .outline
                    .module_for_lesson(lesson_id)
                    .ok_or_else(|| OrchestratorError::UnknownLesson(lesson_id.clone()))?
                    .clone();
                let stored = self
                    .storage
                    .progress
                    .read_progress(
                        &self.learner_id,
                        self.outline.course_id(),
                        &module_id,
                        lesson_id,
                    )
                    .await?;
                let lesson_ref = LessonRef {
                    learner_id: self.learner_id.clone(),
                    course_id: self.outline.course_id().clone(),
                    module_id,
                    lesson_id: lesson_id.clone(),
                };
                let engine = VideoEngine::new(
                    lesson_ref,
                    stored.as_ref(),
                    self.player_factory.player_for(&lesson),
                    Arc::clone(&self.storage.progress),
                    &self.settings,
                    self.clock,
                );
                ActiveLesson::Video {
                    lesson_id: lesson_id.clone(),
                    engine,
                }
            }
            LessonType::Quiz => {
                let assessment = lesson
                    .assessment_id()
                    .and_then(|id| self.assessments.get(id))
                    .ok_or_else(|| OrchestratorError::MissingAssessment(lesson_id.clone()))?;
                let opening = AssessmentRunner::open(
                    self.learner_id.clone(),
                    assessment,
                    Arc::clone(&self.storage.assessments),
                    Duration::from_millis(u64::from(self.settings.autosave_debounce_millis())),
                    self.clock,
                )
                .await
                .map_err(OrchestratorError::Session)?;
                match opening {
                    AssessmentOpening::Editable(runner) => ActiveLesson::Quiz {
                        lesson_id: lesson_id.clone(),
                        runner,
                    },
                    AssessmentOpening::AlreadySubmitted(submission) => ActiveLesson::Review {
                        lesson_id: lesson_id.clone(),
                        submission,
                    },
                }
            }
            LessonType::Text => ActiveLesson::Content {
                lesson_id: lesson_id.clone(),
            },
        };
        self.active = Some(active);
        Ok(())
    }

    async fn teardown_active(&mut self) {
        match self.active.take() {
            Some(ActiveLesson::Video { mut engine, .. }) => engine.teardown().await,
            Some(ActiveLesson::Quiz { mut runner, .. }) => runner.teardown(),
            Some(ActiveLesson::Review { .. } | ActiveLesson::Content { .. }) | None => {}
        }
    }

    /// Tears down whatever is active; call when leaving the course.
    pub async fn close(&mut self) {
        self.teardown_active().await;
    }

    //
    // ─── PLAYBACK ──────────────────────────────────────────────────────────────
    //

    /// Routes a playback event to the active video lesson.
    ///
    /// On the completion transition the lesson joins the completed set and,
    /// with auto-advance on, the next lesson in course order is selected.
    /// Events arriving with no video lesson active are dropped.
    ///
    /// # Errors
    ///
    /// Returns storage errors from an auto-advance lesson switch.
    pub async fn handle_playback(
        &mut self,
        event: PlaybackEvent,
    ) -> Result<VideoSignal, OrchestratorError> {
        let Some(ActiveLesson::Video { lesson_id, engine }) = self.active.as_mut() else {
            return Ok(VideoSignal::None);
        };
        let lesson_id = lesson_id.clone();
        let signal = engine.handle_event(event).await;

        if signal == VideoSignal::Completed {
            self.completed.insert(lesson_id.clone());
            if self.auto_advance {
                if let Some(next) = self.navigation.next(&lesson_id).cloned() {
                    self.select_lesson(&next).await?;
                }
            }
        }
        Ok(signal)
    }

    /// Manually completes a lesson by id. Idempotent.
    ///
    /// Text lessons have no playback signal, so the host calls this from
    /// its "mark as done" affordance; the lesson does not have to be the
    /// active one. Quizzes complete by submission only; for a quiz lesson
    /// this is an `Ok` no-op. When the target is the active video lesson
    /// its engine is completed too, so the in-memory state and the store
    /// agree.
    ///
    /// # Errors
    ///
    /// `UnknownLesson` for an id outside the outline, plus storage errors
    /// from the completion write.
    pub async fn mark_complete(&mut self, lesson_id: &LessonId) -> Result<(), OrchestratorError> {
        let lesson_type = self
            .outline
            .lesson(lesson_id)
            .ok_or_else(|| OrchestratorError::UnknownLesson(lesson_id.clone()))?
            .lesson_type();
        if lesson_type == LessonType::Quiz {
            return Ok(());
        }

        if let Some(ActiveLesson::Video { lesson_id: active_id, engine }) = self.active.as_mut() {
            if active_id == lesson_id {
                engine.mark_complete().await;
                self.completed.insert(lesson_id.clone());
                return Ok(());
            }
        }

        let module_id = self
            .outline
            .module_for_lesson(lesson_id)
            .ok_or_else(|| OrchestratorError::UnknownLesson(lesson_id.clone()))?
            .clone();
        let update = ProgressUpdate {
            learner_id: self.learner_id.clone(),
            course_id: self.outline.course_id().clone(),
            module_id,
            lesson_id: lesson_id.clone(),
            seek_position: 0.0,
            max_watched_second: 0.0,
            percent: 100,
            is_completed: true,
        };
        self.storage
            .progress
            .write_progress(&update, self.clock.now())
            .await?;
        self.completed.insert(lesson_id.clone());
        Ok(())
    }

    //
    // ─── ASSESSMENT PASSTHROUGHS ───────────────────────────────────────────────
    //

    fn active_runner(&mut self) -> Result<&mut AssessmentRunner, OrchestratorError> {
        match self.active.as_mut() {
            Some(ActiveLesson::Quiz { runner, .. }) => Ok(runner),
            _ => Err(OrchestratorError::NoActiveAssessment),
        }
    }

    /// # Errors
    ///
    /// `NoActiveAssessment` without an editable quiz, or session errors.
    pub async fn answer_question(
        &mut self,
        question_id: QuestionId,
        value: AnswerValue,
    ) -> Result<(), OrchestratorError> {
        self.active_runner()?
            .set_answer(question_id, value)
            .await
            .map_err(OrchestratorError::Session)
    }

    /// # Errors
    ///
    /// `NoActiveAssessment` without an editable quiz.
    pub async fn next_question(&mut self) -> Result<(), OrchestratorError> {
        self.active_runner()?.next_question().await;
        Ok(())
    }

    /// # Errors
    ///
    /// `NoActiveAssessment` without an editable quiz.
    pub async fn prev_question(&mut self) -> Result<(), OrchestratorError> {
        self.active_runner()?.prev_question().await;
        Ok(())
    }

    /// # Errors
    ///
    /// `NoActiveAssessment` without an editable quiz, `IndexOutOfRange` for
    /// a bad index.
    pub async fn jump_to_question(&mut self, index: usize) -> Result<(), OrchestratorError> {
        self.active_runner()?
            .jump_to_question(index)
            .await
            .map_err(OrchestratorError::Session)
    }

    /// Submits the active quiz and moves it to the read-only result view.
    ///
    /// # Errors
    ///
    /// `NoActiveAssessment` without an editable quiz; submission errors
    /// leave the quiz editable with its answers intact.
    pub async fn finish_assessment(
        &mut self,
    ) -> Result<AssessmentSubmission, OrchestratorError> {
        let Some(ActiveLesson::Quiz { lesson_id, runner }) = self.active.as_mut() else {
            return Err(OrchestratorError::NoActiveAssessment);
        };
        let lesson_id = lesson_id.clone();
        let submission = runner
            .finish()
            .await
            .map_err(OrchestratorError::Session)?;
        self.completed.insert(lesson_id.clone());
        self.active = Some(ActiveLesson::Review {
            lesson_id,
            submission: submission.clone(),
        });
        Ok(submission)
    }

    //
    // ─── VIEWS ─────────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn tree_view(&self) -> CourseTreeView {
        CourseTreeView::build(
            &self.outline,
            &self.completed,
            self.settings.sequential_unlock(),
        )
    }

    #[must_use]
    pub fn active_lesson(&self) -> Option<&ActiveLesson> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn is_completed(&self, lesson_id: &LessonId) -> bool {
        self.completed.contains(lesson_id)
    }

    #[must_use]
    pub fn prev_lesson_id(&self) -> Option<&LessonId> {
        self.navigation.prev(self.active.as_ref()?.lesson_id())
    }

    #[must_use]
    pub fn next_lesson_id(&self) -> Option<&LessonId> {
        self.navigation.next(self.active.as_ref()?.lesson_id())
    }

    pub fn set_auto_advance(&mut self, enabled: bool) {
        self.auto_advance = enabled;
    }
}
