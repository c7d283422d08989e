//! Append-only history entries for audit reconstruction.
//!
//! History rows are immutable once written: they are never mutated or
//! deleted, only read back to rebuild a timeline. Sale history and rendezvous
//! history are recorded by unrelated writers and merged at read time.

use chrono::{DateTime, Utc};
use common::{RendezvousId, SaleId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which record a history entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistorySubject {
    /// The sale record itself.
    Sale,
    /// A rendezvous belonging to the sale.
    Rendezvous(RendezvousId),
}

/// The kind of change a history entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeType {
    Confirmed,
    Undone,
    ResetToConfirmation,
    InstallmentsReset,
    Cancelled,
    Scheduled,
    Rescheduled,
}

impl ChangeType {
    /// Returns the change type tag as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Confirmed => "confirmed",
            ChangeType::Undone => "undone",
            ChangeType::ResetToConfirmation => "reset_to_confirmation",
            ChangeType::InstallmentsReset => "installments_reset",
            ChangeType::Cancelled => "cancelled",
            ChangeType::Scheduled => "scheduled",
            ChangeType::Rescheduled => "rescheduled",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable audit row carrying before/after snapshots of a change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    /// The sale whose timeline this entry belongs to.
    pub sale_id: SaleId,
    pub subject: HistorySubject,
    pub change_type: ChangeType,
    /// Snapshot of the record before the change.
    pub old_value: serde_json::Value,
    /// Snapshot of the record after the change.
    pub new_value: serde_json::Value,
    pub changed_at: DateTime<Utc>,
    /// The acting identity that performed the change.
    pub changed_by: UserId,
}

impl HistoryEntry {
    /// Creates a new history entry.
    pub fn new(
        sale_id: SaleId,
        subject: HistorySubject,
        change_type: ChangeType,
        old_value: serde_json::Value,
        new_value: serde_json::Value,
        changed_at: DateTime<Utc>,
        changed_by: UserId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sale_id,
            subject,
            change_type,
            old_value,
            new_value,
            changed_at,
            changed_by,
        }
    }
}
