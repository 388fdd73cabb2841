use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lesson_core::model::{LessonDocument, LessonId};

use super::SqliteRepository;
use super::mapping::{conn, map_cached_lesson_row, map_lesson_row};
use crate::repository::{CachedLesson, LessonCacheRepository, StorageError, encode_json};

#[async_trait]
impl LessonCacheRepository for SqliteRepository {
    async fn get_lesson(&self, id: &LessonId) -> Result<Option<LessonDocument>, StorageError> {
        let row = sqlx::query("SELECT payload FROM lesson_cache WHERE lesson_id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_lesson_row).transpose()
    }

    async fn put_lesson(
        &self,
        lesson: &LessonDocument,
        cached_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let payload = encode_json(lesson)?;
        sqlx::query(
            r"
            INSERT INTO lesson_cache (lesson_id, title, topic, payload, cached_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(lesson_id) DO UPDATE SET
                title = excluded.title,
                topic = excluded.topic,
                payload = excluded.payload,
                cached_at = excluded.cached_at
            ",
        )
        .bind(lesson.id().as_str())
        .bind(lesson.title())
        .bind(lesson.topic().as_str())
        .bind(payload)
        .bind(cached_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn list_lessons(&self) -> Result<Vec<CachedLesson>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT lesson_id, title, topic, cached_at
            FROM lesson_cache
            ORDER BY cached_at DESC, lesson_id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_cached_lesson_row).collect()
    }
}
