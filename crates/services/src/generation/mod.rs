//! Phased lesson generation: skeleton, initial batch, remaining batch.

mod checkpoint;
mod orchestrator;

pub use checkpoint::{GenerationCheckpoint, checkpoint_channel};
pub use orchestrator::GenerationOrchestrator;
