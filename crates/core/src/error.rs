use thiserror::Error;

use crate::model::{MediaValidationError, ParseIdError, TopicError};
use crate::reconcile::ReconcileError;
use crate::reducer::ProgressError;

/// Any domain failure raised by `lesson-core`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Topic(#[from] TopicError),
    #[error(transparent)]
    MediaValidation(#[from] MediaValidationError),
    #[error(transparent)]
    Id(#[from] ParseIdError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
}
