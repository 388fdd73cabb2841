use std::sync::Arc;

use lesson_core::{
    model::{LessonDocument, LessonId},
    time::Clock,
};
use storage::repository::{CachedLesson, LessonCacheRepository, StorageError};
use tracing::{debug, warn};

/// Cache of generated lessons for replay without the content API.
pub struct LessonLibrary {
    clock: Clock,
    repo: Arc<dyn LessonCacheRepository>,
}

impl LessonLibrary {
    #[must_use]
    pub fn new(repo: Arc<dyn LessonCacheRepository>) -> Self {
        Self {
            clock: Clock::default(),
            repo,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Cache a complete document. Returns whether it was stored.
    pub async fn store(&self, lesson: &LessonDocument) -> bool {
        if !lesson.is_complete() {
            debug!(lesson_id = %lesson.id(), status = ?lesson.status(), "not caching incomplete lesson");
            return false;
        }
        match self.repo.put_lesson(lesson, self.clock.now()).await {
            Ok(()) => true,
            Err(err) => {
                warn!(lesson_id = %lesson.id(), error = %err, "failed to cache lesson");
                false
            }
        }
    }

    /// Cached document, `None` when missing or unreadable.
    pub async fn load(&self, id: &LessonId) -> Option<LessonDocument> {
        match self.repo.get_lesson(id).await {
            Ok(found) => found,
            Err(err) => {
                warn!(lesson_id = %id, error = %err, "cached lesson unreadable");
                None
            }
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the cache cannot be listed.
    pub async fn list(&self) -> Result<Vec<CachedLesson>, StorageError> {
        self.repo.list_lessons().await
    }
}
