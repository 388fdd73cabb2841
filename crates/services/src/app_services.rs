use std::sync::Arc;

use lesson_core::model::{
    LearnerId, LessonDocument, LessonId, LessonProgress, Scope, StageStatus,
};
use lesson_core::reducer::ProgressEvent;
use storage::repository::Storage;
use tokio::sync::watch;

use crate::Clock;
use crate::config::GenerationConfig;
use crate::error::AppServicesError;
use crate::generation::{GenerationCheckpoint, GenerationOrchestrator};
use crate::library_service::LessonLibrary;
use crate::progress_service::ProgressStore;
use crate::slides::SlideClient;

/// A cached lesson together with the learner's progress through it.
#[derive(Debug, Clone)]
pub struct OpenLesson {
    pub document: LessonDocument,
    pub progress: LessonProgress,
}

impl OpenLesson {
    #[must_use]
    pub fn statuses(&self) -> Vec<StageStatus> {
        ProgressStore::stage_statuses(&self.progress, &self.document.outline())
    }
}

/// Assembles app-facing services around one storage backend and one learner.
#[derive(Clone)]
pub struct AppServices {
    orchestrator: Arc<GenerationOrchestrator>,
    progress: Arc<ProgressStore>,
    library: Arc<LessonLibrary>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        learner: LearnerId,
        client: Arc<dyn SlideClient>,
        config: GenerationConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, learner, client, config))
    }

    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        learner: LearnerId,
        client: Arc<dyn SlideClient>,
        config: GenerationConfig,
    ) -> Self {
        let orchestrator = Arc::new(GenerationOrchestrator::new(client, config));
        let progress = Arc::new(
            ProgressStore::new(learner, Arc::clone(&storage.progress)).with_clock(clock),
        );
        let library = Arc::new(LessonLibrary::new(Arc::clone(&storage.lessons)).with_clock(clock));
        Self {
            orchestrator,
            progress,
            library,
        }
    }

    #[must_use]
    pub fn orchestrator(&self) -> Arc<GenerationOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressStore> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn library(&self) -> Arc<LessonLibrary> {
        Arc::clone(&self.library)
    }

    /// Generate a lesson and cache it once complete.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Generation` if generation is rejected.
    /// Cache failures are logged only.
    pub async fn generate_and_cache(
        &self,
        topic: &str,
        scope: Scope,
        progress: &watch::Sender<GenerationCheckpoint>,
    ) -> Result<Arc<LessonDocument>, AppServicesError> {
        let document = self
            .orchestrator
            .generate_with_progress(topic, scope, progress)
            .await?;
        self.library.store(&document).await;
        Ok(document)
    }

    /// # Errors
    ///
    /// Returns `AppServicesError::LessonNotFound` if the lesson is not cached.
    pub async fn open_lesson(&self, id: &LessonId) -> Result<OpenLesson, AppServicesError> {
        let document = self
            .library
            .load(id)
            .await
            .ok_or_else(|| AppServicesError::LessonNotFound(id.clone()))?;
        let progress = self.progress.load(id).await;
        Ok(OpenLesson { document, progress })
    }

    /// Load a lesson, apply `event` to its progress and persist the result.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::LessonNotFound` for an unknown lesson and
    /// `AppServicesError::Domain` if the event is rejected.
    pub async fn apply_event(
        &self,
        id: &LessonId,
        event: ProgressEvent,
    ) -> Result<OpenLesson, AppServicesError> {
        let OpenLesson { document, progress } = self.open_lesson(id).await?;
        let progress = self
            .progress
            .dispatch(id, &progress, &document.outline(), event)
            .await
            .map_err(lesson_core::Error::from)?;
        Ok(OpenLesson { document, progress })
    }
}
