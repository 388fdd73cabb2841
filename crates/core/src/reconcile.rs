//! Folding slide-fetch outcomes into an index-stable stage list.
//!
//! Results arrive out of order and some fail. Each merge replaces exactly one
//! entry and leaves every other entry as the same shared allocation.

use std::sync::Arc;

use thiserror::Error;

use crate::model::{Slide, SlideFetchError, Stage};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReconcileError {
    #[error("stage index {index} is out of range for a lesson of {len} stages")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Settled fetch for one stage index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideOutcome {
    pub index: usize,
    pub result: Result<Slide, SlideFetchError>,
}

impl SlideOutcome {
    #[must_use]
    pub fn loaded(index: usize, slide: Slide) -> Self {
        Self {
            index,
            result: Ok(slide),
        }
    }

    #[must_use]
    pub fn failed(index: usize, error: SlideFetchError) -> Self {
        Self {
            index,
            result: Err(error),
        }
    }
}

/// Merge a single outcome, returning a new stage list.
///
/// # Errors
///
/// Returns `ReconcileError::IndexOutOfRange` if `outcome.index` is not a
/// position in `stages`.
pub fn merge_one(
    stages: &[Arc<Stage>],
    outcome: &SlideOutcome,
) -> Result<Vec<Arc<Stage>>, ReconcileError> {
    let mut next = stages.to_vec();
    apply(&mut next, outcome)?;
    Ok(next)
}

/// Merge every outcome. Order does not matter and repeating a batch is a no-op.
///
/// # Errors
///
/// Returns `ReconcileError::IndexOutOfRange` on the first outcome that
/// addresses a missing stage; nothing is merged in that case.
pub fn merge_batch(
    stages: &[Arc<Stage>],
    outcomes: &[SlideOutcome],
) -> Result<Vec<Arc<Stage>>, ReconcileError> {
    let len = stages.len();
    if let Some(bad) = outcomes.iter().find(|o| o.index >= len) {
        return Err(ReconcileError::IndexOutOfRange {
            index: bad.index,
            len,
        });
    }
    let mut next = stages.to_vec();
    for outcome in outcomes {
        apply(&mut next, outcome)?;
    }
    Ok(next)
}

fn apply(stages: &mut [Arc<Stage>], outcome: &SlideOutcome) -> Result<(), ReconcileError> {
    let len = stages.len();
    let slot = stages
        .get_mut(outcome.index)
        .ok_or(ReconcileError::IndexOutOfRange {
            index: outcome.index,
            len,
        })?;
    match &outcome.result {
        Ok(slide) => *slot = Arc::new(slot.loaded(slide.clone())),
        // loaded content wins over a late failure for the same index
        Err(_) if slot.has_content() => {}
        Err(error) => *slot = Arc::new(slot.failed(error.clone())),
    }
    Ok(())
}
