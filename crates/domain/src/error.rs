//! Domain error types.

use thiserror::Error;

use crate::sale::state::{SaleStatus, SaleTransition};

/// Errors raised by domain-level guards and validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The sale's current status does not permit the requested transition.
    #[error("transition {transition} is not legal from status {from}")]
    InvalidTransition {
        from: SaleStatus,
        transition: SaleTransition,
    },

    /// A field required by the chosen payment plan is missing or empty.
    #[error("missing required confirmation field: {0}")]
    MissingConfirmationField(&'static str),

    /// A business precondition was not satisfied.
    #[error("precondition not satisfied: {0}")]
    PreconditionFailed(String),
}
