//! Orchestrator error types.
//!
//! Every public operation resolves to either an `OperationOutcome` or one of
//! these errors; the `Display` text is the single user-facing reason string.
//! Intermediate step detail beyond the failing step's class is only visible
//! via logs.

use common::{RendezvousId, SaleId};
use domain::DomainError;
use store::StoreError;
use thiserror::Error;

use crate::permissions::Capability;

/// Errors that can occur during lifecycle operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrchestratorError {
    /// The acting identity lacks the required capability. Checked before any
    /// write is attempted; never retried.
    #[error("permission denied: '{0}' requires elevated privileges")]
    PermissionDenied(Capability),

    /// The target sale does not exist (hard failure for read-then-act steps).
    #[error("sale not found: {0}")]
    SaleNotFound(SaleId),

    /// The target rendezvous does not exist.
    #[error("rendezvous not found: {0}")]
    RendezvousNotFound(RendezvousId),

    /// A state-machine guard or field validation rejected the operation.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A saga step failed after the retry budget was spent (transient) or
    /// immediately (constraint violation). Prior steps are not rolled back.
    #[error("step '{step}' failed: {source}")]
    StepFailed {
        step: &'static str,
        source: StoreError,
    },
}

impl OrchestratorError {
    /// Wraps a store error from the given saga step.
    pub fn step(step: &'static str, source: StoreError) -> Self {
        OrchestratorError::StepFailed { step, source }
    }

    /// Returns the failure class, matching the error taxonomy used in logs.
    pub fn class(&self) -> &'static str {
        match self {
            OrchestratorError::PermissionDenied(_) => "permission-denied",
            OrchestratorError::SaleNotFound(_) | OrchestratorError::RendezvousNotFound(_) => {
                "not-found"
            }
            OrchestratorError::Domain(_) => "guard-rejected",
            OrchestratorError::StepFailed { source, .. } => source.code(),
        }
    }
}

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;
