//! Shared error types for the services crate.

use thiserror::Error;

use lesson_core::model::{LessonId, TopicError};
use lesson_core::reconcile::ReconcileError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Transport-level failure talking to the content API.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SlideClientError {
    #[error("content API request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("content API returned an unexpected body: {0}")]
    Decode(String),
}

/// The skeleton phase failed; nothing was generated.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SkeletonFetchError {
    #[error("skeleton request failed: {0}")]
    Client(#[from] SlideClientError),
    #[error("skeleton has {actual} stages, expected {expected}")]
    StageCount { expected: usize, actual: usize },
}

/// The initial batch failed; the skeleton is discarded.
#[derive(Debug, Error)]
#[error("initial slides request failed: {0}")]
pub struct InitialSlidesFetchError(#[from] pub SlideClientError);

/// Errors that reject a whole `generate` call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("invalid topic: {0}")]
    InvalidTopic(#[from] TopicError),
    #[error(transparent)]
    Skeleton(#[from] SkeletonFetchError),
    #[error(transparent)]
    InitialSlides(#[from] InitialSlidesFetchError),
    #[error("generation was superseded by a newer request")]
    Superseded,
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl GenerationError {
    /// Whether calling `generate` again may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Skeleton(_) | Self::InitialSlides(_))
    }
}

/// Invalid generation or API configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("initial batch must satisfy 0 < {initial_batch_size} < {stage_count}")]
    InvalidBatch {
        stage_count: usize,
        initial_batch_size: usize,
    },
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("content API base URL cannot be empty")]
    EmptyBaseUrl,
}

/// Errors emitted while bootstrapping or driving app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Domain(#[from] lesson_core::Error),
    #[error("lesson {0} is not in the library")]
    LessonNotFound(LessonId),
}
