use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portal_core::model::{
    AnswerMap, AssessmentDraft, AssessmentId, AssessmentSubmission, CourseId, LearnerId,
    LessonId, LessonProgress, ModuleId, ProgressUpdate,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Key addressing one learner's progress on one lesson.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgressKey {
    pub learner_id: LearnerId,
    pub course_id: CourseId,
    pub lesson_id: LessonId,
}

impl ProgressKey {
    #[must_use]
    pub fn new(learner_id: LearnerId, course_id: CourseId, lesson_id: LessonId) -> Self {
        Self {
            learner_id,
            course_id,
            lesson_id,
        }
    }
}

/// Repository contract for lesson watch progress.
///
/// Writes are merges, not overwrites: the store takes a `MAX` on
/// `max_watched_second` and never regresses a completed status, so racing
/// or reordered deliveries from multiple sync paths are harmless.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch a learner's progress on one lesson, if any exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures; an absent record is `Ok(None)`.
    async fn read_progress(
        &self,
        learner_id: &LearnerId,
        course_id: &CourseId,
        module_id: &ModuleId,
        lesson_id: &LessonId,
    ) -> Result<Option<LessonProgress>, StorageError>;

    /// Merge an update into the stored record, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn write_progress(
        &self,
        update: &ProgressUpdate,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// All of a learner's progress records for one course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_course_progress(
        &self,
        learner_id: &LearnerId,
        course_id: &CourseId,
    ) -> Result<Vec<LessonProgress>, StorageError>;
}

/// Repository contract for assessment drafts and final submissions.
#[async_trait]
pub trait AssessmentRepository: Send + Sync {
    /// Upsert the draft answer set for a (learner, assessment) pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a final submission already exists
    /// for the pair; graded state must not be mutated by autosave.
    async fn save_draft(
        &self,
        learner_id: &LearnerId,
        assessment_id: &AssessmentId,
        answers: &AnswerMap,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Fetch the draft for a (learner, assessment) pair, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn read_draft(
        &self,
        learner_id: &LearnerId,
        assessment_id: &AssessmentId,
    ) -> Result<Option<AssessmentDraft>, StorageError>;

    /// Finalize the answer set. Deletes any draft atomically with the insert.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a submission already exists;
    /// submission is one-shot.
    async fn submit_assessment(
        &self,
        learner_id: &LearnerId,
        assessment_id: &AssessmentId,
        answers: &AnswerMap,
        at: DateTime<Utc>,
    ) -> Result<AssessmentSubmission, StorageError>;

    /// Fetch an existing submission, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn read_submission(
        &self,
        learner_id: &LearnerId,
        assessment_id: &AssessmentId,
    ) -> Result<Option<AssessmentSubmission>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<ProgressKey, LessonProgress>>>,
    drafts: Arc<Mutex<HashMap<(LearnerId, AssessmentId), AssessmentDraft>>>,
    submissions: Arc<Mutex<HashMap<(LearnerId, AssessmentId), AssessmentSubmission>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn read_progress(
        &self,
        learner_id: &LearnerId,
        course_id: &CourseId,
        _module_id: &ModuleId,
        lesson_id: &LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let key = ProgressKey::new(learner_id.clone(), course_id.clone(), lesson_id.clone());
        Ok(guard.get(&key).cloned())
    }

    async fn write_progress(
        &self,
        update: &ProgressUpdate,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let key = ProgressKey::new(
            update.learner_id.clone(),
            update.course_id.clone(),
            update.lesson_id.clone(),
        );
        let record = guard.entry(key).or_insert_with(|| {
            LessonProgress::new(
                update.learner_id.clone(),
                update.course_id.clone(),
                update.module_id.clone(),
                update.lesson_id.clone(),
            )
        });
        record.merge(update, at);
        Ok(())
    }

    async fn list_course_progress(
        &self,
        learner_id: &LearnerId,
        course_id: &CourseId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .values()
            .filter(|p| p.learner_id() == learner_id && p.course_id() == course_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AssessmentRepository for InMemoryRepository {
    async fn save_draft(
        &self,
        learner_id: &LearnerId,
        assessment_id: &AssessmentId,
        answers: &AnswerMap,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let key = (learner_id.clone(), assessment_id.clone());
        {
            let submissions = self
                .submissions
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            if submissions.contains_key(&key) {
                return Err(StorageError::Conflict);
            }
        }
        let mut drafts = self
            .drafts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        drafts.insert(
            key,
            AssessmentDraft {
                learner_id: learner_id.clone(),
                assessment_id: assessment_id.clone(),
                answers: answers.clone(),
                last_saved_at: at,
            },
        );
        Ok(())
    }

    async fn read_draft(
        &self,
        learner_id: &LearnerId,
        assessment_id: &AssessmentId,
    ) -> Result<Option<AssessmentDraft>, StorageError> {
        let guard = self
            .drafts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .get(&(learner_id.clone(), assessment_id.clone()))
            .cloned())
    }

    async fn submit_assessment(
        &self,
        learner_id: &LearnerId,
        assessment_id: &AssessmentId,
        answers: &AnswerMap,
        at: DateTime<Utc>,
    ) -> Result<AssessmentSubmission, StorageError> {
        let key = (learner_id.clone(), assessment_id.clone());
        let mut submissions = self
            .submissions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if submissions.contains_key(&key) {
            return Err(StorageError::Conflict);
        }
        let submission = AssessmentSubmission {
            learner_id: learner_id.clone(),
            assessment_id: assessment_id.clone(),
            answers: answers.clone(),
            submitted_at: at,
        };
        submissions.insert(key.clone(), submission.clone());

        // The draft is superseded in the same logical operation.
        let mut drafts = self
            .drafts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        drafts.remove(&key);

        Ok(submission)
    }

    async fn read_submission(
        &self,
        learner_id: &LearnerId,
        assessment_id: &AssessmentId,
    ) -> Result<Option<AssessmentSubmission>, StorageError> {
        let guard = self
            .submissions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .get(&(learner_id.clone(), assessment_id.clone()))
            .cloned())
    }
}

/// Aggregates the store clients behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub assessments: Arc<dyn AssessmentRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let assessments: Arc<dyn AssessmentRepository> = Arc::new(repo);
        Self {
            progress,
            assessments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::model::AnswerValue;
    use portal_core::time::fixed_now;

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

    #[tokio::test]
    async fn progress_writes_merge_monotonically() {
        let repo = InMemoryRepository::new();
        repo.write_progress(&update(90.0, false), fixed_now())
            .await
            .unwrap();
        repo.write_progress(&update(30.0, false), fixed_now())
            .await
            .unwrap();

        let stored = repo
            .read_progress(
                &LearnerId::new("u1"),
                &CourseId::new("c1"),
                &ModuleId::new("m1"),
                &LessonId::new("l1"),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.max_watched_second(), 90.0);
        assert!(!stored.is_completed());
    }

    #[tokio::test]
    async fn submission_supersedes_draft_and_locks_it() {
        let repo = InMemoryRepository::new();
        let learner = LearnerId::new("u1");
        let assessment = AssessmentId::new("a1");
        let mut answers = AnswerMap::new();
        answers.insert(
            portal_core::model::QuestionId::new("q1"),
            AnswerValue::Text("hello".into()),
        );

        repo.save_draft(&learner, &assessment, &answers, fixed_now())
            .await
            .unwrap();
        repo.submit_assessment(&learner, &assessment, &answers, fixed_now())
            .await
            .unwrap();

        assert!(
            repo.read_draft(&learner, &assessment)
                .await
                .unwrap()
                .is_none()
        );
        let err = repo
            .save_draft(&learner, &assessment, &answers, fixed_now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        let err = repo
            .submit_assessment(&learner, &assessment, &answers, fixed_now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }
}
