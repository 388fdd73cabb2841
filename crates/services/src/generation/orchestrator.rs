use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use lesson_core::model::{
    DocumentStatus, GenerationPhase, GenerationSession, GenerationToken, LessonDocument, LessonId,
    Scope, SlideFetchError, Topic,
};
use lesson_core::reconcile::SlideOutcome;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::checkpoint::{GenerationCheckpoint, checkpoint_channel, publish};
use crate::config::GenerationConfig;
use crate::error::{GenerationError, InitialSlidesFetchError, SkeletonFetchError};
use crate::slides::{SlideClient, SlideResponse};

#[derive(Default)]
struct OrchestratorState {
    session: Option<GenerationSession>,
    document: Option<Arc<LessonDocument>>,
}

/// Drives skeleton, initial batch and remaining batch for one lesson at a time.
///
/// Starting a new run supersedes the previous one: its token stops matching
/// and its results are dropped at the next phase boundary.
pub struct GenerationOrchestrator {
    client: Arc<dyn SlideClient>,
    config: GenerationConfig,
    state: Mutex<OrchestratorState>,
}

impl GenerationOrchestrator {
    #[must_use]
    pub fn new(client: Arc<dyn SlideClient>, config: GenerationConfig) -> Self {
        Self {
            client,
            config,
            state: Mutex::new(OrchestratorState::default()),
        }
    }

    /// Latest document published by the current run.
    #[must_use]
    pub fn current_document(&self) -> Option<Arc<LessonDocument>> {
        self.lock().document.clone()
    }

    #[must_use]
    pub fn session(&self) -> Option<GenerationSession> {
        self.lock().session.clone()
    }

    /// Generate a lesson and wait until every stage has settled.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` when the topic is invalid, the skeleton or
    /// initial batch fails, or a newer run superseded this one.
    pub async fn generate(
        &self,
        topic: &str,
        scope: Scope,
    ) -> Result<Arc<LessonDocument>, GenerationError> {
        let (progress, _rx) = checkpoint_channel();
        self.generate_with_progress(topic, scope, &progress).await
    }

    /// Like [`generate`](Self::generate), publishing checkpoints to `progress`.
    ///
    /// # Errors
    ///
    /// See [`generate`](Self::generate).
    pub async fn generate_with_progress(
        &self,
        topic: &str,
        scope: Scope,
        progress: &watch::Sender<GenerationCheckpoint>,
    ) -> Result<Arc<LessonDocument>, GenerationError> {
        let topic = Topic::parse(topic)?;
        let token = self.begin(topic.clone(), scope.clone());
        publish(progress, GenerationPhase::Requested, None);

        let result = self.run(token, &topic, &scope, progress).await;
        match &result {
            Ok(doc) => info!(
                %token,
                lesson_id = %doc.id(),
                failed = doc.failed_stages().count(),
                "lesson generation complete"
            ),
            Err(GenerationError::Superseded) => {
                info!(%token, "generation superseded; results discarded");
            }
            Err(err) => {
                warn!(%token, error = %err, retryable = err.is_retryable(), "lesson generation failed");
                self.set_phase(token, GenerationPhase::Failed);
                publish(progress, GenerationPhase::Failed, None);
            }
        }
        result
    }

    async fn run(
        &self,
        token: GenerationToken,
        topic: &Topic,
        scope: &Scope,
        progress: &watch::Sender<GenerationCheckpoint>,
    ) -> Result<Arc<LessonDocument>, GenerationError> {
        let n = self.config.stage_count();
        let k = self.config.initial_batch_size();

        // skeleton
        let mut skeleton = self
            .client
            .fetch_skeleton(topic, scope)
            .await
            .map_err(SkeletonFetchError::from)?;
        if skeleton.stages.len() != n {
            return Err(SkeletonFetchError::StageCount {
                expected: n,
                actual: skeleton.stages.len(),
            }
            .into());
        }
        for (stage_index, prerequisite) in skeleton.prune_prerequisites() {
            warn!(%token, stage_index, prerequisite, "dropping unsatisfiable prerequisite");
        }
        let doc = LessonDocument::from_skeleton(
            LessonId::generate(),
            topic.clone(),
            scope.clone(),
            skeleton,
        );
        let doc = self.commit(token, GenerationPhase::Skeleton, doc)?;
        debug!(%token, lesson_id = %doc.id(), stages = n, phase = "skeleton", "skeleton ready");
        publish(progress, GenerationPhase::Skeleton, Some(Arc::clone(&doc)));

        // initial batch
        let slides = self
            .client
            .fetch_initial_slides(topic, scope)
            .await
            .map_err(InitialSlidesFetchError::from)?;
        if slides.len() != k {
            debug!(%token, expected = k, received = slides.len(), "initial batch size differs");
        }
        let initial: Vec<SlideOutcome> = slides
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(index, slide)| SlideOutcome::loaded(index, slide))
            .collect();
        self.ensure_current(token)?;
        let doc = doc.merged(&initial, DocumentStatus::InitialReady)?;
        let doc = self.commit(token, GenerationPhase::InitialBatch, doc)?;
        debug!(%token, loaded = doc.loaded_count(), phase = "initial_batch", "initial batch merged");
        publish(progress, GenerationPhase::InitialBatch, Some(Arc::clone(&doc)));

        // remaining batch: settle all, then merge once
        let pending = doc.pending_indices();
        self.set_phase(token, GenerationPhase::RemainingBatch);
        publish(progress, GenerationPhase::RemainingBatch, None);
        debug!(%token, requests = pending.len(), phase = "remaining_batch", "requesting remaining slides");

        let settled = join_all(
            pending
                .into_iter()
                .map(|index| self.fetch_remaining(token, topic, scope, index)),
        )
        .await;

        // a newer run may have started while the batch was in flight
        self.ensure_current(token)?;
        let doc = doc.merged(&settled, DocumentStatus::Complete)?;
        let doc = self.commit(token, GenerationPhase::Complete, doc)?;
        publish(progress, GenerationPhase::Complete, Some(Arc::clone(&doc)));
        Ok(doc)
    }

    async fn fetch_remaining(
        &self,
        token: GenerationToken,
        topic: &Topic,
        scope: &Scope,
        index: usize,
    ) -> SlideOutcome {
        match self.client.fetch_slide(topic, index, scope).await {
            Ok(SlideResponse::Loaded(slide)) => SlideOutcome::loaded(index, slide),
            Ok(SlideResponse::Failed(message)) => {
                warn!(%token, stage_index = index, %message, "slide generation failed");
                SlideOutcome::failed(index, SlideFetchError::new(message))
            }
            Err(err) => {
                warn!(%token, stage_index = index, error = %err, "slide request failed");
                SlideOutcome::failed(index, SlideFetchError::new(err.to_string()))
            }
        }
    }

    fn begin(&self, topic: Topic, scope: Scope) -> GenerationToken {
        let session = GenerationSession::start(topic, scope);
        let token = session.active_token();
        let mut state = self.lock();
        if let Some(previous) = state.session.as_ref().filter(|s| !s.phase().is_terminal()) {
            info!(superseded = %previous.active_token(), %token, "new generation supersedes running one");
        }
        state.session = Some(session);
        state.document = None;
        token
    }

    fn ensure_current(&self, token: GenerationToken) -> Result<(), GenerationError> {
        let state = self.lock();
        match state.session.as_ref() {
            Some(session) if session.is_current(token) => Ok(()),
            _ => Err(GenerationError::Superseded),
        }
    }

    /// Store `document` as the current one if `token` still owns the session.
    fn commit(
        &self,
        token: GenerationToken,
        phase: GenerationPhase,
        document: LessonDocument,
    ) -> Result<Arc<LessonDocument>, GenerationError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        match state.session.as_mut() {
            Some(session) if session.is_current(token) => {
                session.set_phase(phase);
                let document = Arc::new(document);
                state.document = Some(Arc::clone(&document));
                Ok(document)
            }
            _ => Err(GenerationError::Superseded),
        }
    }

    fn set_phase(&self, token: GenerationToken, phase: GenerationPhase) {
        let mut state = self.lock();
        if let Some(session) = state.session.as_mut().filter(|s| s.is_current(token)) {
            session.set_phase(phase);
        }
    }

    fn lock(&self) -> MutexGuard<'_, OrchestratorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
