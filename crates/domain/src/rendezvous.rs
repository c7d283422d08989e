//! Rendezvous records: client appointments tied to a sale.

use chrono::{NaiveDate, NaiveTime};
use common::{RendezvousId, SaleId};
use serde::{Deserialize, Serialize};

/// The status of a rendezvous record.
///
/// At most one rendezvous per sale is `Scheduled` at any time. Rescheduling
/// closes the old record and creates a new scheduled one linked via
/// `rescheduled_from`, forming a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RendezvousStatus {
    /// The active appointment for the sale.
    #[default]
    Scheduled,

    /// Superseded by a newer record (terminal for this row).
    Rescheduled,

    /// Appointment cancelled; cancels the owning sale too (terminal).
    Cancelled,
}

impl RendezvousStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RendezvousStatus::Scheduled => "scheduled",
            RendezvousStatus::Rescheduled => "rescheduled",
            RendezvousStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for RendezvousStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A scheduled client appointment for a sale's confirmation process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendezvous {
    pub id: RendezvousId,
    pub sale_id: SaleId,
    pub rendezvous_date: NaiveDate,
    pub rendezvous_time: NaiveTime,
    pub status: RendezvousStatus,
    /// The record this one replaced, if it was created by a reschedule.
    pub rescheduled_from: Option<RendezvousId>,
}

impl Rendezvous {
    /// Creates a newly scheduled rendezvous.
    pub fn new(sale_id: SaleId, rendezvous_date: NaiveDate, rendezvous_time: NaiveTime) -> Self {
        Self {
            id: RendezvousId::new(),
            sale_id,
            rendezvous_date,
            rendezvous_time,
            status: RendezvousStatus::Scheduled,
            rescheduled_from: None,
        }
    }

    /// Creates the replacement record for a reschedule, linked to the old one.
    pub fn rescheduled_from(
        old: &Rendezvous,
        rendezvous_date: NaiveDate,
        rendezvous_time: NaiveTime,
    ) -> Self {
        Self {
            id: RendezvousId::new(),
            sale_id: old.sale_id,
            rendezvous_date,
            rendezvous_time,
            status: RendezvousStatus::Scheduled,
            rescheduled_from: Some(old.id),
        }
    }
}
