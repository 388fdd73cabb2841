#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod generation;
pub mod library_service;
pub mod progress_service;
pub mod slides;

pub use lesson_core::Clock;

pub use app_services::{AppServices, OpenLesson};
pub use config::{GenerationConfig, SlideApiConfig};
pub use error::{
    AppServicesError, ConfigError, GenerationError, InitialSlidesFetchError, SkeletonFetchError,
    SlideClientError,
};
pub use generation::{GenerationCheckpoint, GenerationOrchestrator, checkpoint_channel};
pub use library_service::LessonLibrary;
pub use progress_service::ProgressStore;
pub use slides::{HttpSlideClient, SlideClient, SlideResponse};
