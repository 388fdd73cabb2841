use std::sync::Arc;

use lesson_core::{
    model::{LearnerId, LessonId, LessonOutline, LessonProgress, StageStatus, StageSubmission},
    reducer::{self, ProgressError, ProgressEvent},
    time::Clock,
};
use storage::repository::ProgressRepository;
use tracing::{debug, warn};

/// Owns one learner's resumable progress records.
///
/// Persistence is best effort: unreadable records load as a fresh start and
/// failed writes are logged, never returned.
pub struct ProgressStore {
    clock: Clock,
    learner: LearnerId,
    repo: Arc<dyn ProgressRepository>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(learner: LearnerId, repo: Arc<dyn ProgressRepository>) -> Self {
        Self {
            clock: Clock::default(),
            learner,
            repo,
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn learner(&self) -> &LearnerId {
        &self.learner
    }

    /// Stored record for `lesson`, or a fresh one when absent or unreadable.
    pub async fn load(&self, lesson: &LessonId) -> LessonProgress {
        match self.repo.get_progress(&self.learner, lesson).await {
            Ok(Some(progress)) => progress,
            Ok(None) => {
                debug!(learner = %self.learner, lesson_id = %lesson, "no saved progress");
                LessonProgress::new(self.clock.now())
            }
            Err(err) => {
                warn!(
                    learner = %self.learner,
                    lesson_id = %lesson,
                    error = %err,
                    "saved progress unreadable; starting fresh"
                );
                LessonProgress::new(self.clock.now())
            }
        }
    }

    pub async fn save(&self, lesson: &LessonId, progress: &LessonProgress) {
        if let Err(err) = self.repo.put_progress(&self.learner, lesson, progress).await {
            warn!(
                learner = %self.learner,
                lesson_id = %lesson,
                error = %err,
                "failed to persist progress"
            );
        }
    }

    /// Apply `event`, persist the result and return it.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the event is rejected; nothing is persisted
    /// in that case.
    pub async fn dispatch(
        &self,
        lesson: &LessonId,
        progress: &LessonProgress,
        outline: &LessonOutline,
        event: ProgressEvent,
    ) -> Result<LessonProgress, ProgressError> {
        let next = reducer::apply(progress, outline, event, self.clock.now())?;
        debug!(
            learner = %self.learner,
            lesson_id = %lesson,
            ?event,
            stage_index = next.current_stage_index(),
            total_points = next.total_points(),
            completed = next.is_completed(),
            "progress updated"
        );
        if next.is_completed() && !progress.is_completed() {
            tracing::info!(learner = %self.learner, lesson_id = %lesson, "lesson completed");
        }
        self.save(lesson, &next).await;
        Ok(next)
    }

    /// # Errors
    ///
    /// Returns `ProgressError::StageOutOfRange` for a stage outside the outline.
    pub async fn complete_stage(
        &self,
        lesson: &LessonId,
        progress: &LessonProgress,
        outline: &LessonOutline,
        stage_index: usize,
        submission: StageSubmission,
    ) -> Result<LessonProgress, ProgressError> {
        self.dispatch(
            lesson,
            progress,
            outline,
            ProgressEvent::StageCompleted {
                stage_index,
                submission,
            },
        )
        .await
    }

    /// # Errors
    ///
    /// Returns `ProgressError` if the stage is out of range or still locked.
    pub async fn navigate(
        &self,
        lesson: &LessonId,
        progress: &LessonProgress,
        outline: &LessonOutline,
        stage_index: usize,
    ) -> Result<LessonProgress, ProgressError> {
        self.dispatch(
            lesson,
            progress,
            outline,
            ProgressEvent::Navigated { stage_index },
        )
        .await
    }

    pub async fn toggle_bookmark(&self, lesson: &LessonId, progress: &LessonProgress) -> LessonProgress {
        let next = reducer::toggle_bookmark(progress, self.clock.now());
        self.save(lesson, &next).await;
        next
    }

    pub async fn restart(&self, lesson: &LessonId) -> LessonProgress {
        let next = reducer::restart(self.clock.now());
        self.save(lesson, &next).await;
        next
    }

    /// Status of every stage in `outline` for the player.
    #[must_use]
    pub fn stage_statuses(progress: &LessonProgress, outline: &LessonOutline) -> Vec<StageStatus> {
        (0..outline.stage_count())
            .map(|i| reducer::derive_stage_status(progress, i, outline.prerequisites(i)))
            .collect()
    }
}
