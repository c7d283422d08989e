//! Result value returned by lifecycle operations.

use domain::{Rendezvous, Sale};
use serde::Serialize;

/// What a completed lifecycle operation produced.
///
/// Callers refresh their view of the records from this value instead of
/// assuming their pre-operation copy is still accurate.
#[derive(Debug, Clone, Serialize)]
pub struct OperationOutcome {
    /// The sale after the operation, if it still exists.
    pub sale: Option<Sale>,
    /// The rendezvous produced or modified by the operation, if any.
    pub rendezvous: Option<Rendezvous>,
    /// Human-readable summary of what happened.
    pub message: String,
}

impl OperationOutcome {
    /// Outcome for an operation that updated the sale record.
    pub fn for_sale(sale: Sale, message: impl Into<String>) -> Self {
        Self {
            sale: Some(sale),
            rendezvous: None,
            message: message.into(),
        }
    }

    /// Outcome for an operation that removed the sale record.
    pub fn deleted(message: impl Into<String>) -> Self {
        Self {
            sale: None,
            rendezvous: None,
            message: message.into(),
        }
    }

    /// Outcome for an operation centred on a rendezvous record.
    pub fn for_rendezvous(
        sale: Option<Sale>,
        rendezvous: Rendezvous,
        message: impl Into<String>,
    ) -> Self {
        Self {
            sale,
            rendezvous: Some(rendezvous),
            message: message.into(),
        }
    }
}
