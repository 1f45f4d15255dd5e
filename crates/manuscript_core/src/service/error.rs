//! Error taxonomy surfaced by outline services.

use crate::model::outline::{EntityRef, ParentRef};
use crate::model::validation::OutlineValidationError;
use crate::repo::outline_repo::OutlineRepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type OutlineResult<T> = Result<T, OutlineError>;

/// Typed failure of an outline operation.
#[derive(Debug)]
pub enum OutlineError {
    /// A creation for this parent is already in flight. Retry later.
    AlreadyInProgress(ParentRef),
    /// A referenced parent or entity is gone.
    NotFound(EntityRef),
    /// Input rejected before any write.
    Validation(OutlineValidationError),
    /// Repository call failed.
    Persistence(OutlineRepoError),
}

impl OutlineError {
    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyInProgress(_) => "already_in_progress",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation_error",
            Self::Persistence(_) => "persistence_error",
        }
    }
}

impl Display for OutlineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyInProgress(parent) => {
                write!(f, "creation already in progress for {parent}")
            }
            Self::NotFound(entity) => write!(f, "not found: {entity}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for OutlineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<OutlineValidationError> for OutlineError {
    fn from(value: OutlineValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<OutlineRepoError> for OutlineError {
    fn from(value: OutlineRepoError) -> Self {
        match value {
            OutlineRepoError::NotFound(entity) => Self::NotFound(entity),
            other => Self::Persistence(other),
        }
    }
}
