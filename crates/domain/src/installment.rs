//! Installment records: dated payment obligations derived from a sale.

use chrono::NaiveDate;
use common::{InstallmentId, Money, SaleId};
use serde::{Deserialize, Serialize};

/// Whether an installment has been settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InstallmentStatus {
    #[default]
    Unpaid,
    Paid,
}

impl InstallmentStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallmentStatus::Unpaid => "Unpaid",
            InstallmentStatus::Paid => "Paid",
        }
    }
}

impl std::fmt::Display for InstallmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One dated obligation in a sale's installment schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    pub sale_id: SaleId,
    /// Ordering key, unique per sale.
    pub installment_number: u32,
    pub amount_due: Money,
    /// Carried-over unpaid balance from prior periods.
    pub stacked_amount: Money,
    pub amount_paid: Money,
    pub status: InstallmentStatus,
    pub due_date: NaiveDate,
    /// Set iff status is Paid.
    pub paid_date: Option<NaiveDate>,
}

impl Installment {
    /// Creates a new unpaid installment.
    pub fn new(sale_id: SaleId, installment_number: u32, amount_due: Money, due_date: NaiveDate) -> Self {
        Self {
            id: InstallmentId::new(),
            sale_id,
            installment_number,
            amount_due,
            stacked_amount: Money::zero(),
            amount_paid: Money::zero(),
            status: InstallmentStatus::Unpaid,
            due_date,
            paid_date: None,
        }
    }

    /// Returns true if the row is in its pristine unpaid state.
    pub fn is_cleared(&self) -> bool {
        self.amount_paid.is_zero()
            && self.stacked_amount.is_zero()
            && self.status == InstallmentStatus::Unpaid
            && self.paid_date.is_none()
    }
}

/// Field set applied to every installment of a sale in one predicate update.
///
/// Only the fields present are written; `paid_date` uses a double `Option` so
/// the patch can explicitly null the column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentPatch {
    pub amount_paid: Option<Money>,
    pub stacked_amount: Option<Money>,
    pub status: Option<InstallmentStatus>,
    pub paid_date: Option<Option<NaiveDate>>,
}

impl InstallmentPatch {
    /// The patch used by *undo* and *reset-installments*: zero everything and
    /// return the row to Unpaid.
    pub fn cleared() -> Self {
        Self {
            amount_paid: Some(Money::zero()),
            stacked_amount: Some(Money::zero()),
            status: Some(InstallmentStatus::Unpaid),
            paid_date: Some(None),
        }
    }

    /// Applies the patch to an installment row.
    pub fn apply_to(&self, installment: &mut Installment) {
        if let Some(amount) = self.amount_paid {
            installment.amount_paid = amount;
        }
        if let Some(amount) = self.stacked_amount {
            installment.stacked_amount = amount;
        }
        if let Some(status) = self.status {
            installment.status = status;
        }
        if let Some(paid_date) = self.paid_date {
            installment.paid_date = paid_date;
        }
    }
}
