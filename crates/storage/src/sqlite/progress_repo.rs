use async_trait::async_trait;
use lesson_core::model::{LearnerId, LessonId, LessonProgress};

use super::SqliteRepository;
use super::mapping::{conn, map_progress_row};
use crate::repository::{ProgressRepository, StorageError, encode_json};

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        learner: &LearnerId,
        lesson: &LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT payload
            FROM lesson_progress
            WHERE learner_id = ?1 AND lesson_id = ?2
            ",
        )
        .bind(learner.as_str())
        .bind(lesson.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn put_progress(
        &self,
        learner: &LearnerId,
        lesson: &LessonId,
        progress: &LessonProgress,
    ) -> Result<(), StorageError> {
        let payload = encode_json(progress)?;
        sqlx::query(
            r"
            INSERT INTO lesson_progress (learner_id, lesson_id, payload, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(learner_id, lesson_id) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            ",
        )
        .bind(learner.as_str())
        .bind(lesson.as_str())
        .bind(payload)
        .bind(progress.last_accessed_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
