//! Autosave and submission around an [`AssessmentSession`].
//!
//! The runner owns the session behind a lock, debounces draft writes, and
//! performs the one-shot submission. Draft writes are fire-and-forget: once
//! the debounce window closes and the write is dispatched, abandoning the
//! runner no longer cancels it.

use std::sync::Arc;
use std::time::Duration;

use portal_core::Clock;
use portal_core::model::{
    AnswerMap, AnswerValue, Assessment, AssessmentId, AssessmentSubmission, LearnerId, Question,
    QuestionId,
};
use serde::Serialize;
use storage::AssessmentRepository;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::{AssessmentSession, SessionPhase};
use crate::error::AssessmentSessionError;

/// Result of opening an assessment for a learner.
pub enum AssessmentOpening {
    /// No submission yet; the attempt is editable (possibly resumed from a
    /// draft).
    Editable(AssessmentRunner),
    /// Already submitted; the caller should show the read-only result.
    AlreadySubmitted(AssessmentSubmission),
}

/// Read-only snapshot of the session for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentView {
    pub assessment_id: AssessmentId,
    pub current_index: usize,
    pub question_count: usize,
    pub answers: AnswerMap,
    pub phase: SessionPhase,
    pub is_saving: bool,
}

/// Drives one editable assessment attempt.
pub struct AssessmentRunner {
    session: Arc<Mutex<AssessmentSession>>,
    store: Arc<dyn AssessmentRepository>,
    learner_id: LearnerId,
    assessment_id: AssessmentId,
    debounce: Duration,
    clock: Clock,
    pending: Option<JoinHandle<()>>,
}

impl AssessmentRunner {
    /// Opens an assessment for the learner.
    ///
    /// A finalized submission wins over any draft; otherwise a draft, when
    /// present, seeds the session's answers.
    ///
    /// # Errors
    ///
    /// Returns `Storage` errors from the submission/draft lookups.
    pub async fn open(
        learner_id: LearnerId,
        assessment: &Assessment,
        store: Arc<dyn AssessmentRepository>,
        debounce: Duration,
        clock: Clock,
    ) -> Result<AssessmentOpening, AssessmentSessionError> {
        if let Some(submission) = store.read_submission(&learner_id, assessment.id()).await? {
            return Ok(AssessmentOpening::AlreadySubmitted(submission));
        }
        let session = match store.read_draft(&learner_id, assessment.id()).await? {
            Some(draft) => AssessmentSession::resume(
                learner_id.clone(),
                assessment,
                draft.answers,
                draft.last_saved_at,
            ),
            None => AssessmentSession::new(learner_id.clone(), assessment),
        };
        Ok(AssessmentOpening::Editable(Self {
            session: Arc::new(Mutex::new(session)),
            store,
            learner_id,
            assessment_id: assessment.id().clone(),
            debounce,
            clock,
            pending: None,
        }))
    }

    /// Records an answer and (re)arms the debounced draft save.
    ///
    /// Each edit cancels a save still waiting out its debounce window; the
    /// write that eventually fires carries the full answer map as of
    /// dispatch time.
    ///
    /// # Errors
    ///
    /// Rejected once submission has started.
    pub async fn set_answer(
        &mut self,
        question_id: QuestionId,
        value: AnswerValue,
    ) -> Result<(), AssessmentSessionError> {
        self.session.lock().await.set_answer(question_id, value)?;
        self.arm_autosave();
        Ok(())
    }

    fn arm_autosave(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        let session = Arc::clone(&self.session);
        let store = Arc::clone(&self.store);
        let learner_id = self.learner_id.clone();
        let assessment_id = self.assessment_id.clone();
        let debounce = self.debounce;
        let clock = self.clock;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let (answers, seq) = {
                let session = session.lock().await;
                if session.phase() != SessionPhase::Active {
                    return;
                }
                (session.answers().clone(), session.edit_seq())
            };
            // Detached from here on; aborting the runner's handle can no
            // longer cancel a dispatched write.
            tokio::spawn(async move {
                let at = clock.now();
                match store
                    .save_draft(&learner_id, &assessment_id, &answers, at)
                    .await
                {
                    Ok(()) => session.lock().await.mark_saved(seq, at),
                    Err(error) => {
                        tracing::warn!(
                            assessment = %assessment_id,
                            %error,
                            "draft autosave failed"
                        );
                    }
                }
            });
        }));
    }

    /// Finalizes the attempt.
    ///
    /// Cancels any pending autosave, submits the current answer set, and on
    /// success locks the session for good. On storage failure the session
    /// returns to editing with all answers intact.
    ///
    /// # Errors
    ///
    /// `SubmissionInFlight`/`AlreadySubmitted` for repeated calls, and
    /// `Submission` wrapping the storage failure otherwise.
    pub async fn finish(&mut self) -> Result<AssessmentSubmission, AssessmentSessionError> {
        let answers = self.session.lock().await.begin_submit()?;
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        match self
            .store
            .submit_assessment(&self.learner_id, &self.assessment_id, &answers, self.clock.now())
            .await
        {
            Ok(submission) => {
                self.session.lock().await.complete_submit(submission.submitted_at);
                Ok(submission)
            }
            Err(error) => {
                self.session.lock().await.fail_submit();
                Err(AssessmentSessionError::Submission(error))
            }
        }
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    pub async fn next_question(&self) {
        self.session.lock().await.next();
    }

    pub async fn prev_question(&self) {
        self.session.lock().await.prev();
    }

    /// # Errors
    ///
    /// Returns `IndexOutOfRange` for an index past the last question.
    pub async fn jump_to_question(&self, index: usize) -> Result<(), AssessmentSessionError> {
        self.session.lock().await.jump_to(index)
    }

    //
    // ─── VIEW ──────────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn assessment_id(&self) -> &AssessmentId {
        &self.assessment_id
    }

    pub async fn view(&self) -> AssessmentView {
        let session = self.session.lock().await;
        AssessmentView {
            assessment_id: self.assessment_id.clone(),
            current_index: session.current_index(),
            question_count: session.questions().len(),
            answers: session.answers().clone(),
            phase: session.phase(),
            is_saving: session.is_saving(),
        }
    }

    pub async fn questions(&self) -> Vec<Question> {
        self.session.lock().await.questions().to_vec()
    }

    /// Cancels any autosave still waiting out its debounce window.
    pub fn teardown(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

impl Drop for AssessmentRunner {
    fn drop(&mut self) {
        self.teardown();
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
