//! Sale status state machine.

use serde::{Deserialize, Serialize};

/// The status of a sale in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──confirm──► Completed
///    ▲                     │
///    └───────undo──────────┘
///
/// Pending/Completed ──cancel_via_rendezvous──► Cancelled
/// any state ──delete──► (record removed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SaleStatus {
    /// Sale is reserved but not yet confirmed; inventory units are Reserved.
    #[default]
    Pending,

    /// Sale is confirmed; inventory units are Sold.
    Completed,

    /// Sale was cancelled (terminal state).
    Cancelled,
}

/// Named lifecycle transitions on a sale.
///
/// Every mutation of the status field goes through this table, including the
/// cancellation triggered by a rendezvous cancellation, which is a first-class
/// transition rather than an ad hoc write from the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SaleTransition {
    /// Pending → Completed.
    Confirm,

    /// Completed → Pending, clearing confirmation-stage records.
    Undo,

    /// Pending/Completed → Pending, preserving the reservation deposit.
    ResetToConfirmation,

    /// Pending/Completed → Cancelled, driven by a rendezvous cancellation.
    CancelViaRendezvous,

    /// Any state → record removed, together with all dependent records.
    Delete,
}

impl SaleStatus {
    /// Returns true if the given transition is legal from this status.
    pub fn permits(&self, transition: SaleTransition) -> bool {
        match transition {
            SaleTransition::Confirm => matches!(self, SaleStatus::Pending),
            SaleTransition::Undo => matches!(self, SaleStatus::Completed),
            SaleTransition::ResetToConfirmation => {
                matches!(self, SaleStatus::Pending | SaleStatus::Completed)
            }
            SaleTransition::CancelViaRendezvous => {
                matches!(self, SaleStatus::Pending | SaleStatus::Completed)
            }
            SaleTransition::Delete => true,
        }
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SaleStatus::Cancelled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "Pending",
            SaleStatus::Completed => "Completed",
            SaleStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl SaleTransition {
    /// Returns the transition name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleTransition::Confirm => "confirm",
            SaleTransition::Undo => "undo",
            SaleTransition::ResetToConfirmation => "reset_to_confirmation",
            SaleTransition::CancelViaRendezvous => "cancel_via_rendezvous",
            SaleTransition::Delete => "delete",
        }
    }
}

impl std::fmt::Display for SaleTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
