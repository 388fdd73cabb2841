use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lesson_core::model::{LearnerId, LessonDocument, LessonId, LessonProgress};
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub(crate) fn encode_json<T: Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

pub(crate) fn decode_json<T: DeserializeOwned>(raw: &str) -> Result<T, StorageError> {
    serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Listing entry for a cached lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedLesson {
    pub id: LessonId,
    pub title: String,
    pub topic: String,
    pub cached_at: DateTime<Utc>,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Resumable progress, one record per `(learner, lesson)`.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the stored record, `None` if the learner never opened the lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored payload cannot be
    /// decoded, or `StorageError::Connection` if the backend is unreachable.
    async fn get_progress(
        &self,
        learner: &LearnerId,
        lesson: &LessonId,
    ) -> Result<Option<LessonProgress>, StorageError>;

    /// Insert or replace the record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn put_progress(
        &self,
        learner: &LearnerId,
        lesson: &LessonId,
        progress: &LessonProgress,
    ) -> Result<(), StorageError>;
}

/// Cached copies of generated lessons, keyed by lesson id.
#[async_trait]
pub trait LessonCacheRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for an undecodable payload.
    async fn get_lesson(&self, id: &LessonId) -> Result<Option<LessonDocument>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be stored.
    async fn put_lesson(
        &self,
        lesson: &LessonDocument,
        cached_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Cached lessons, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the listing cannot be read.
    async fn list_lessons(&self) -> Result<Vec<CachedLesson>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// In-memory repository for tests and prototyping.
///
/// Records are kept as JSON text so decode failures behave like the SQLite
/// adapter.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<(LearnerId, LessonId), String>>>,
    lessons: Arc<Mutex<HashMap<LessonId, (CachedLesson, String)>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an arbitrary payload as a learner's progress record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn put_raw_progress(
        &self,
        learner: &LearnerId,
        lesson: &LessonId,
        raw: impl Into<String>,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert((learner.clone(), lesson.clone()), raw.into());
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        learner: &LearnerId,
        lesson: &LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .get(&(learner.clone(), lesson.clone()))
            .map(|raw| decode_json(raw))
            .transpose()
    }

    async fn put_progress(
        &self,
        learner: &LearnerId,
        lesson: &LessonId,
        progress: &LessonProgress,
    ) -> Result<(), StorageError> {
        let raw = encode_json(progress)?;
        self.put_raw_progress(learner, lesson, raw)
    }
}

#[async_trait]
impl LessonCacheRepository for InMemoryRepository {
    async fn get_lesson(&self, id: &LessonId) -> Result<Option<LessonDocument>, StorageError> {
        let guard = self
            .lessons
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(id).map(|(_, raw)| decode_json(raw)).transpose()
    }

    async fn put_lesson(
        &self,
        lesson: &LessonDocument,
        cached_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let raw = encode_json(lesson)?;
        let entry = CachedLesson {
            id: lesson.id().clone(),
            title: lesson.title().to_owned(),
            topic: lesson.topic().as_str().to_owned(),
            cached_at,
        };
        let mut guard = self
            .lessons
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(lesson.id().clone(), (entry, raw));
        Ok(())
    }

    async fn list_lessons(&self) -> Result<Vec<CachedLesson>, StorageError> {
        let guard = self
            .lessons
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut entries: Vec<CachedLesson> = guard.values().map(|(e, _)| e.clone()).collect();
        entries.sort_by(|a, b| b.cached_at.cmp(&a.cached_at).then_with(|| a.id.cmp(&b.id)));
        Ok(entries)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub lessons: Arc<dyn LessonCacheRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let lessons: Arc<dyn LessonCacheRepository> = Arc::new(repo);
        Self { progress, lessons }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::model::{CompletionCriteria, LessonSkeleton, Scope, SkeletonStage, StageKind, Topic};
    use lesson_core::time::fixed_now;

    fn ids() -> (LearnerId, LessonId) {
        (
            LearnerId::new("ana").unwrap(),
            LessonId::new("lesson-1").unwrap(),
        )
    }

    fn lesson(id: &str) -> LessonDocument {
        LessonDocument::from_skeleton(
            LessonId::new(id).unwrap(),
            Topic::parse("Ciclo da água").unwrap(),
            Scope::global(),
            LessonSkeleton {
                title: format!("Lesson {id}"),
                objectives: Vec::new(),
                stages: vec![SkeletonStage {
                    title: "Etapa 1".into(),
                    kind: StageKind::Explanation,
                    prerequisites: Vec::new(),
                }],
                completion: CompletionCriteria::default(),
            },
        )
    }

    #[tokio::test]
    async fn progress_round_trips() {
        let repo = InMemoryRepository::new();
        let (learner, lesson) = ids();
        assert!(repo.get_progress(&learner, &lesson).await.unwrap().is_none());

        let progress = LessonProgress::new(fixed_now());
        repo.put_progress(&learner, &lesson, &progress).await.unwrap();
        let loaded = repo.get_progress(&learner, &lesson).await.unwrap();
        assert_eq!(loaded, Some(progress));
    }

    #[tokio::test]
    async fn corrupt_progress_is_a_serialization_error() {
        let repo = InMemoryRepository::new();
        let (learner, lesson) = ids();
        repo.put_raw_progress(&learner, &lesson, "{not json").unwrap();
        let err = repo.get_progress(&learner, &lesson).await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn progress_is_scoped_per_learner() {
        let repo = InMemoryRepository::new();
        let (learner, lesson) = ids();
        repo.put_progress(&learner, &lesson, &LessonProgress::new(fixed_now()))
            .await
            .unwrap();
        let other = LearnerId::new("bruno").unwrap();
        assert!(repo.get_progress(&other, &lesson).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lessons_list_newest_first() {
        let repo = InMemoryRepository::new();
        repo.put_lesson(&lesson("a"), fixed_now()).await.unwrap();
        repo.put_lesson(&lesson("b"), fixed_now() + chrono::Duration::minutes(1))
            .await
            .unwrap();

        let listed = repo.list_lessons().await.unwrap();
        let ids: Vec<_> = listed.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);

        let fetched = repo.get_lesson(&LessonId::new("a").unwrap()).await.unwrap();
        assert_eq!(fetched, Some(lesson("a")));
    }
}
