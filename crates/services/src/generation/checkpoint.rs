use std::sync::Arc;

use lesson_core::model::{GenerationPhase, LessonDocument};
use tokio::sync::watch;

/// Coarse progress of one generation run.
#[derive(Debug, Clone)]
pub struct GenerationCheckpoint {
    pub phase: GenerationPhase,
    pub percent: u8,
    pub document: Option<Arc<LessonDocument>>,
}

impl GenerationCheckpoint {
    #[must_use]
    pub fn requested() -> Self {
        Self {
            phase: GenerationPhase::Requested,
            percent: GenerationPhase::Requested.percent(),
            document: None,
        }
    }
}

/// Channel a caller passes to `generate_with_progress` and watches.
#[must_use]
pub fn checkpoint_channel() -> (
    watch::Sender<GenerationCheckpoint>,
    watch::Receiver<GenerationCheckpoint>,
) {
    watch::channel(GenerationCheckpoint::requested())
}

/// Publish `phase`. The percentage never moves backwards, so a failure keeps
/// the last reported value.
pub(crate) fn publish(
    sender: &watch::Sender<GenerationCheckpoint>,
    phase: GenerationPhase,
    document: Option<Arc<LessonDocument>>,
) {
    sender.send_modify(|checkpoint| {
        checkpoint.percent = checkpoint.percent.max(phase.percent());
        checkpoint.phase = phase;
        if document.is_some() {
            checkpoint.document = document;
        }
    });
}
