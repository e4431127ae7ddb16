use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates lesson progress, assessment drafts, submissions, and indexes.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS lesson_progress (
                    learner_id TEXT NOT NULL,
                    course_id TEXT NOT NULL,
                    module_id TEXT NOT NULL,
                    lesson_id TEXT NOT NULL,
                    seek_position REAL NOT NULL CHECK (seek_position >= 0),
                    max_watched_second REAL NOT NULL CHECK (max_watched_second >= 0),
                    percent INTEGER NOT NULL CHECK (percent BETWEEN 0 AND 100),
                    is_completed INTEGER NOT NULL CHECK (is_completed IN (0, 1)),
                    last_synced_at TEXT,
                    PRIMARY KEY (learner_id, course_id, lesson_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_lesson_progress_course
                ON lesson_progress (learner_id, course_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS assessment_drafts (
                    learner_id TEXT NOT NULL,
                    assessment_id TEXT NOT NULL,
                    answers TEXT NOT NULL,
                    last_saved_at TEXT NOT NULL,
                    PRIMARY KEY (learner_id, assessment_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS assessment_submissions (
                    learner_id TEXT NOT NULL,
                    assessment_id TEXT NOT NULL,
                    answers TEXT NOT NULL,
                    submitted_at TEXT NOT NULL,
                    PRIMARY KEY (learner_id, assessment_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (1, ?1)")
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
    }

    Ok(())
}
