//! Payment records: money received against a sale.

use chrono::NaiveDate;
use common::{ClientId, Money, PaymentId, SaleId};
use serde::{Deserialize, Serialize};

/// What a payment is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentKind {
    /// Reservation deposit taken at sale creation. Non-refundable; preserved
    /// across a reset-to-confirmation.
    SmallAdvance,

    /// Larger confirmation-stage advance.
    BigAdvance,

    /// A monthly installment payment.
    Installment,

    /// Agency fee.
    CompanyFee,

    /// Money returned to the client.
    Refund,
}

impl PaymentKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::SmallAdvance => "SmallAdvance",
            PaymentKind::BigAdvance => "BigAdvance",
            PaymentKind::Installment => "Installment",
            PaymentKind::CompanyFee => "CompanyFee",
            PaymentKind::Refund => "Refund",
        }
    }
}

impl std::fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the money was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    #[default]
    Cash,
    BankTransfer,
    Cheque,
}

/// A single received payment.
///
/// Append-mostly: rows are only deleted as part of undo/reset/delete sagas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub sale_id: SaleId,
    pub client_id: ClientId,
    pub amount_paid: Money,
    pub kind: PaymentKind,
    pub payment_date: NaiveDate,
    pub payment_method: PaymentMethod,
}

impl Payment {
    /// Creates a new payment record.
    pub fn new(
        sale_id: SaleId,
        client_id: ClientId,
        amount_paid: Money,
        kind: PaymentKind,
        payment_date: NaiveDate,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            sale_id,
            client_id,
            amount_paid,
            kind,
            payment_date,
            payment_method,
        }
    }

    /// Returns true if this payment kind survives a reset-to-confirmation.
    pub fn is_preserved_on_reset(&self) -> bool {
        matches!(self.kind, PaymentKind::SmallAdvance | PaymentKind::Refund)
    }
}
