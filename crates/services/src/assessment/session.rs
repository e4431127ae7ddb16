//! In-memory state machine for one assessment attempt.
//!
//! Pure state, no timers and no storage. The [`AssessmentRunner`] wraps a
//! session with debounced persistence; everything here is synchronous and
//! directly testable.
//!
//! [`AssessmentRunner`]: super::AssessmentRunner

use chrono::{DateTime, Utc};
use portal_core::model::{
    AnswerMap, AnswerValue, Assessment, AssessmentId, LearnerId, Question, QuestionId,
};
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::error::AssessmentSessionError;

/// Lifecycle phase of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Answers may be edited.
    Active,
    /// A submission is in flight; edits and further submits are rejected.
    Submitting,
    /// The attempt is finalized. Terminal.
    Submitted,
}

/// One learner's live attempt at an assessment.
///
/// Question order is fixed at construction: when the assessment asks for
/// shuffling, questions and options are shuffled once here and never again,
/// so re-renders and answer edits cannot reorder what the learner sees.
#[derive(Debug, Clone)]
pub struct AssessmentSession {
    learner_id: LearnerId,
    assessment_id: AssessmentId,
    questions: Vec<Question>,
    current_index: usize,
    answers: AnswerMap,
    phase: SessionPhase,
    is_saving: bool,
    edit_seq: u64,
    last_saved_at: Option<DateTime<Utc>>,
}

impl AssessmentSession {
    /// Starts a fresh attempt, applying the assessment's shuffle flags.
    #[must_use]
    pub fn new(learner_id: LearnerId, assessment: &Assessment) -> Self {
        let mut questions = assessment.questions().to_vec();
        let mut rng = rand::rng();
        if assessment.shuffle_questions() {
            questions.shuffle(&mut rng);
        }
        if assessment.shuffle_options() {
            questions = questions
                .into_iter()
                .map(|question| {
                    let mut options = question.options().to_vec();
                    options.shuffle(&mut rng);
                    question.with_options(options)
                })
                .collect();
        }
        Self {
            learner_id,
            assessment_id: assessment.id().clone(),
            questions,
            current_index: 0,
            answers: AnswerMap::new(),
            phase: SessionPhase::Active,
            is_saving: false,
            edit_seq: 0,
            last_saved_at: None,
        }
    }

    /// Resumes an attempt from a previously saved draft.
    #[must_use]
    pub fn resume(
        learner_id: LearnerId,
        assessment: &Assessment,
        answers: AnswerMap,
        last_saved_at: DateTime<Utc>,
    ) -> Self {
        let mut session = Self::new(learner_id, assessment);
        session.answers = answers;
        session.last_saved_at = Some(last_saved_at);
        session
    }

    //
    // ─── ACCESSORS ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn learner_id(&self) -> &LearnerId {
        &self.learner_id
    }

    #[must_use]
    pub fn assessment_id(&self) -> &AssessmentId {
        &self.assessment_id
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current_index]
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// True while an edit has not yet been confirmed persisted.
    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.is_saving
    }

    #[must_use]
    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    //
    // ─── EDITING ───────────────────────────────────────────────────────────────
    //

    /// Records an answer and marks the session dirty.
    ///
    /// The saving flag goes up immediately; it comes down only when a save
    /// that included this edit is acknowledged via [`mark_saved`].
    ///
    /// # Errors
    ///
    /// Rejected once submission has started.
    ///
    /// [`mark_saved`]: Self::mark_saved
    pub fn set_answer(
        &mut self,
        question_id: QuestionId,
        value: AnswerValue,
    ) -> Result<u64, AssessmentSessionError> {
        match self.phase {
            SessionPhase::Active => {
                self.answers.insert(question_id, value);
                self.is_saving = true;
                self.edit_seq += 1;
                Ok(self.edit_seq)
            }
            SessionPhase::Submitting => Err(AssessmentSessionError::SubmissionInFlight),
            SessionPhase::Submitted => Err(AssessmentSessionError::AlreadySubmitted),
        }
    }

    /// Sequence number of the latest edit; saves are acknowledged against it.
    #[must_use]
    pub fn edit_seq(&self) -> u64 {
        self.edit_seq
    }

    /// Acknowledges a completed save of the answers as of edit `seq`.
    ///
    /// The saving flag clears only if no edit arrived after the snapshot
    /// that was persisted, so a stale acknowledgement never hides dirty
    /// state.
    pub fn mark_saved(&mut self, seq: u64, at: DateTime<Utc>) {
        self.last_saved_at = Some(at);
        if seq == self.edit_seq {
            self.is_saving = false;
        }
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    /// Advances to the next question; a no-op on the last one.
    pub fn next(&mut self) {
        if self.current_index + 1 < self.questions.len() {
            self.current_index += 1;
        }
    }

    /// Steps back one question; a no-op on the first one.
    pub fn prev(&mut self) {
        self.current_index = self.current_index.saturating_sub(1);
    }

    /// Jumps straight to a question by index.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` when `index` is past the last question.
    pub fn jump_to(&mut self, index: usize) -> Result<(), AssessmentSessionError> {
        if index >= self.questions.len() {
            return Err(AssessmentSessionError::IndexOutOfRange {
                index,
                len: self.questions.len(),
            });
        }
        self.current_index = index;
        Ok(())
    }

    //
    // ─── SUBMISSION ────────────────────────────────────────────────────────────
    //

    /// Enters the submitting phase and returns the answer set to persist.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionInFlight` if called again before the first attempt
    /// resolves, and `AlreadySubmitted` after a successful one.
    pub fn begin_submit(&mut self) -> Result<AnswerMap, AssessmentSessionError> {
        match self.phase {
            SessionPhase::Active => {
                self.phase = SessionPhase::Submitting;
                Ok(self.answers.clone())
            }
            SessionPhase::Submitting => Err(AssessmentSessionError::SubmissionInFlight),
            SessionPhase::Submitted => Err(AssessmentSessionError::AlreadySubmitted),
        }
    }

    /// Finalizes a successful submission. Terminal.
    pub fn complete_submit(&mut self, at: DateTime<Utc>) {
        self.phase = SessionPhase::Submitted;
        self.is_saving = false;
        self.last_saved_at = Some(at);
    }

    /// Returns to editing after a failed submission; answers are untouched.
    pub fn fail_submit(&mut self) {
        if self.phase == SessionPhase::Submitting {
            self.phase = SessionPhase::Active;
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
