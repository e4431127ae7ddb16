use portal_core::model::{
    AnswerMap, AssessmentDraft, AssessmentId, AssessmentSubmission, CourseId, LearnerId,
    LessonId, LessonProgress, ModuleId,
};
use sqlx::Row;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn answers_to_json(answers: &AnswerMap) -> Result<String, StorageError> {
    serde_json::to_string(answers).map_err(ser)
}

pub(crate) fn answers_from_json(raw: &str) -> Result<AnswerMap, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn percent_from_i64(v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid percent: {v}")))
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<LessonProgress, StorageError> {
    Ok(LessonProgress::from_persisted(
        LearnerId::new(row.try_get::<String, _>("learner_id").map_err(ser)?),
        CourseId::new(row.try_get::<String, _>("course_id").map_err(ser)?),
        ModuleId::new(row.try_get::<String, _>("module_id").map_err(ser)?),
        LessonId::new(row.try_get::<String, _>("lesson_id").map_err(ser)?),
        row.try_get::<f64, _>("seek_position").map_err(ser)?,
        row.try_get::<f64, _>("max_watched_second").map_err(ser)?,
        percent_from_i64(row.try_get::<i64, _>("percent").map_err(ser)?)?,
        row.try_get::<bool, _>("is_completed").map_err(ser)?,
        row.try_get("last_synced_at").map_err(ser)?,
    ))
}

pub(crate) fn map_draft_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<AssessmentDraft, StorageError> {
    Ok(AssessmentDraft {
        learner_id: LearnerId::new(row.try_get::<String, _>("learner_id").map_err(ser)?),
        assessment_id: AssessmentId::new(row.try_get::<String, _>("assessment_id").map_err(ser)?),
        answers: answers_from_json(&row.try_get::<String, _>("answers").map_err(ser)?)?,
        last_saved_at: row.try_get("last_saved_at").map_err(ser)?,
    })
}

pub(crate) fn map_submission_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<AssessmentSubmission, StorageError> {
    Ok(AssessmentSubmission {
        learner_id: LearnerId::new(row.try_get::<String, _>("learner_id").map_err(ser)?),
        assessment_id: AssessmentId::new(row.try_get::<String, _>("assessment_id").map_err(ser)?),
        answers: answers_from_json(&row.try_get::<String, _>("answers").map_err(ser)?)?,
        submitted_at: row.try_get("submitted_at").map_err(ser)?,
    })
}
