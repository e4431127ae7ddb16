use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portal_core::model::{CourseId, LearnerId, LessonId, LessonProgress, ModuleId, ProgressUpdate};

use super::{SqliteRepository, mapping::map_progress_row};
use crate::repository::{ProgressRepository, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn read_progress(
        &self,
        learner_id: &LearnerId,
        course_id: &CourseId,
        _module_id: &ModuleId,
        lesson_id: &LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT learner_id, course_id, module_id, lesson_id,
                       seek_position, max_watched_second, percent,
                       is_completed, last_synced_at
                FROM lesson_progress
                WHERE learner_id = ?1 AND course_id = ?2 AND lesson_id = ?3
            ",
        )
        .bind(learner_id.as_str())
        .bind(course_id.as_str())
        .bind(lesson_id.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(conn)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn write_progress(
        &self,
        update: &ProgressUpdate,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        // The merge lives in SQL so racing writers cannot lose the
        // high-water mark or regress a completed status.
        sqlx::query(
            r"
                INSERT INTO lesson_progress (
                    learner_id, course_id, module_id, lesson_id,
                    seek_position, max_watched_second, percent,
                    is_completed, last_synced_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT (learner_id, course_id, lesson_id) DO UPDATE SET
                    seek_position = excluded.seek_position,
                    max_watched_second = MAX(lesson_progress.max_watched_second,
                                             excluded.max_watched_second),
                    is_completed = MAX(lesson_progress.is_completed,
                                       excluded.is_completed),
                    percent = CASE
                        WHEN MAX(lesson_progress.is_completed, excluded.is_completed) = 1
                            THEN 100
                        ELSE MAX(lesson_progress.percent, excluded.percent)
                    END,
                    last_synced_at = excluded.last_synced_at
            ",
        )
        .bind(update.learner_id.as_str())
        .bind(update.course_id.as_str())
        .bind(update.module_id.as_str())
        .bind(update.lesson_id.as_str())
        .bind(update.seek_position.max(0.0))
        .bind(update.max_watched_second.max(0.0))
        .bind(i64::from(if update.is_completed {
            100
        } else {
            update.percent.min(100)
        }))
        .bind(update.is_completed)
        .bind(at)
        .execute(self.pool())
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn list_course_progress(
        &self,
        learner_id: &LearnerId,
        course_id: &CourseId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT learner_id, course_id, module_id, lesson_id,
                       seek_position, max_watched_second, percent,
                       is_completed, last_synced_at
                FROM lesson_progress
                WHERE learner_id = ?1 AND course_id = ?2
                ORDER BY lesson_id
            ",
        )
        .bind(learner_id.as_str())
        .bind(course_id.as_str())
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;

        rows.iter().map(map_progress_row).collect()
    }
}
