//! Status callbacks toward UI collaborators.
//!
//! Live views re-query the repository on their own; these callbacks only
//! report outcomes (toasts, focus changes, error banners).

use crate::model::outline::ParentRef;
use crate::service::error::OutlineError;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Mutation kind reported with failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Reorder,
    Move,
    Create,
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Reorder => "reorder",
            Self::Move => "move",
            Self::Create => "create",
        })
    }
}

/// Why a creation request was turned away before reaching the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    AlreadyInProgress,
    ValidationError,
}

impl Display for RejectionReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::AlreadyInProgress => "already_in_progress",
            Self::ValidationError => "validation_error",
        })
    }
}

/// Outcome sink. Every method defaults to doing nothing.
///
/// Called after locks and admissions are released, from the thread that ran
/// the operation.
pub trait OutlineEvents: Send + Sync {
    fn on_child_created(&self, _parent: ParentRef, _child_id: Uuid) {}

    fn on_creation_rejected(&self, _parent: ParentRef, _reason: RejectionReason) {}

    fn on_operation_failed(&self, _kind: OperationKind, _parent: ParentRef, _error: &OutlineError) {}
}

/// Sink that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl OutlineEvents for NoopEvents {}
