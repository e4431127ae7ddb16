use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portal_core::model::{
    AnswerMap, AssessmentDraft, AssessmentId, AssessmentSubmission, LearnerId,
};

use super::{
    SqliteRepository,
    mapping::{answers_to_json, map_draft_row, map_submission_row},
};
use crate::repository::{AssessmentRepository, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl AssessmentRepository for SqliteRepository {
    async fn save_draft(
        &self,
        learner_id: &LearnerId,
        assessment_id: &AssessmentId,
        answers: &AnswerMap,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let payload = answers_to_json(answers)?;
        let mut tx = self.pool().begin().await.map_err(conn)?;

        let submitted = sqlx::query(
            "SELECT 1 FROM assessment_submissions WHERE learner_id = ?1 AND assessment_id = ?2",
        )
        .bind(learner_id.as_str())
        .bind(assessment_id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(conn)?;
        if submitted.is_some() {
            return Err(StorageError::Conflict);
        }

        sqlx::query(
            r"
                INSERT INTO assessment_drafts (learner_id, assessment_id, answers, last_saved_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT (learner_id, assessment_id) DO UPDATE SET
                    answers = excluded.answers,
                    last_saved_at = excluded.last_saved_at
            ",
        )
        .bind(learner_id.as_str())
        .bind(assessment_id.as_str())
        .bind(payload)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)
    }

    async fn read_draft(
        &self,
        learner_id: &LearnerId,
        assessment_id: &AssessmentId,
    ) -> Result<Option<AssessmentDraft>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT learner_id, assessment_id, answers, last_saved_at
                FROM assessment_drafts
                WHERE learner_id = ?1 AND assessment_id = ?2
            ",
        )
        .bind(learner_id.as_str())
        .bind(assessment_id.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(conn)?;

        row.as_ref().map(map_draft_row).transpose()
    }

    async fn submit_assessment(
        &self,
        learner_id: &LearnerId,
        assessment_id: &AssessmentId,
        answers: &AnswerMap,
        at: DateTime<Utc>,
    ) -> Result<AssessmentSubmission, StorageError> {
        let payload = answers_to_json(answers)?;
        let mut tx = self.pool().begin().await.map_err(conn)?;

        let existing = sqlx::query(
            "SELECT 1 FROM assessment_submissions WHERE learner_id = ?1 AND assessment_id = ?2",
        )
        .bind(learner_id.as_str())
        .bind(assessment_id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(conn)?;
        if existing.is_some() {
            return Err(StorageError::Conflict);
        }

        sqlx::query(
            r"
                INSERT INTO assessment_submissions (learner_id, assessment_id, answers, submitted_at)
                VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(learner_id.as_str())
        .bind(assessment_id.as_str())
        .bind(payload)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        // The draft is superseded atomically with the final write.
        sqlx::query(
            "DELETE FROM assessment_drafts WHERE learner_id = ?1 AND assessment_id = ?2",
        )
        .bind(learner_id.as_str())
        .bind(assessment_id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;

        Ok(AssessmentSubmission {
            learner_id: learner_id.clone(),
            assessment_id: assessment_id.clone(),
            answers: answers.clone(),
            submitted_at: at,
        })
    }

    async fn read_submission(
        &self,
        learner_id: &LearnerId,
        assessment_id: &AssessmentId,
    ) -> Result<Option<AssessmentSubmission>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT learner_id, assessment_id, answers, submitted_at
                FROM assessment_submissions
                WHERE learner_id = ?1 AND assessment_id = ?2
            ",
        )
        .bind(learner_id.as_str())
        .bind(assessment_id.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(conn)?;

        row.as_ref().map(map_submission_row).transpose()
    }
}
