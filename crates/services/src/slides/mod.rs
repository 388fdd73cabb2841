//! Boundary to the generative content API.

mod http;
mod wire;

use async_trait::async_trait;
use lesson_core::model::{LessonSkeleton, Scope, Slide, Topic};

use crate::error::SlideClientError;

pub use http::HttpSlideClient;

/// Per-slide answer from the content API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlideResponse {
    Loaded(Slide),
    Failed(String),
}

/// The three calls the orchestrator makes. Stage indices are 0-based.
#[async_trait]
pub trait SlideClient: Send + Sync {
    /// # Errors
    ///
    /// Returns `SlideClientError` if the request fails or the body is malformed.
    async fn fetch_skeleton(
        &self,
        topic: &Topic,
        scope: &Scope,
    ) -> Result<LessonSkeleton, SlideClientError>;

    /// # Errors
    ///
    /// Returns `SlideClientError` if the request fails or the body is malformed.
    async fn fetch_initial_slides(
        &self,
        topic: &Topic,
        scope: &Scope,
    ) -> Result<Vec<Slide>, SlideClientError>;

    /// # Errors
    ///
    /// Returns `SlideClientError` for transport or decode failures. A slide the
    /// API reports as failed is `Ok(SlideResponse::Failed)`.
    async fn fetch_slide(
        &self,
        topic: &Topic,
        index: usize,
        scope: &Scope,
    ) -> Result<SlideResponse, SlideClientError>;
}
