mod ids;
mod lesson;
mod media;
mod progress;
mod session;
mod stage;
mod topic;

pub use ids::{GenerationToken, LearnerId, LessonId, ParseIdError};
pub use lesson::{
    CompletionCriteria, DEFAULT_INITIAL_BATCH, DEFAULT_STAGE_COUNT, DocumentStatus,
    LessonDocument, LessonOutline, LessonSkeleton, SkeletonStage,
};
pub use media::{MediaUrl, MediaValidationError};
pub use progress::{LessonProgress, MAX_SCORE, StageResult, StageStatus, StageSubmission};
pub use session::{GenerationPhase, GenerationSession};
pub use stage::{Question, Slide, SlideFetchError, Stage, StageKind};
pub use topic::{Scope, TOPIC_MAX_CHARS, TOPIC_MIN_CHARS, Topic, TopicError};

#[cfg(test)]
pub(crate) use lesson::fixtures;
