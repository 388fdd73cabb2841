use chrono::{DateTime, Utc};
use lesson_core::model::{LessonDocument, LessonId, LessonProgress};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{CachedLesson, StorageError, decode_json};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<LessonProgress, StorageError> {
    let payload: String = row.try_get("payload").map_err(ser)?;
    decode_json(&payload)
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<LessonDocument, StorageError> {
    let payload: String = row.try_get("payload").map_err(ser)?;
    decode_json(&payload)
}

pub(crate) fn map_cached_lesson_row(row: &SqliteRow) -> Result<CachedLesson, StorageError> {
    let id: String = row.try_get("lesson_id").map_err(ser)?;
    let cached_at: DateTime<Utc> = row.try_get("cached_at").map_err(ser)?;
    Ok(CachedLesson {
        id: LessonId::new(id).map_err(ser)?,
        title: row.try_get("title").map_err(ser)?,
        topic: row.try_get("topic").map_err(ser)?,
        cached_at,
    })
}
