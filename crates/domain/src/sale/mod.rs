//! The sale record and its confirmation guards.

pub mod state;

use chrono::NaiveDate;
use common::{ClientId, Money, SaleId, UnitId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

pub use state::{SaleStatus, SaleTransition};

/// How the client pays for the sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SalePaymentType {
    /// Single full payment at confirmation.
    Full,

    /// Monthly installment schedule.
    Installment,

    /// Promise-of-sale contract with an initial payment.
    PromiseOfSale,
}

impl SalePaymentType {
    /// Returns the payment type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SalePaymentType::Full => "Full",
            SalePaymentType::Installment => "Installment",
            SalePaymentType::PromiseOfSale => "PromiseOfSale",
        }
    }
}

impl std::fmt::Display for SalePaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The installment schedule selected at confirmation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentPlan {
    /// Number of monthly installments.
    pub count: u32,
    /// Amount due each month.
    pub monthly_amount: Money,
    /// First due date.
    pub start_date: NaiveDate,
    /// Last due date.
    pub end_date: NaiveDate,
}

impl InstallmentPlan {
    /// Returns true if the plan is usable as a confirmation offer.
    pub fn is_complete(&self) -> bool {
        self.count > 0 && self.monthly_amount.is_positive()
    }
}

/// Fields supplied by the caller when confirming a sale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfirmationFields {
    pub big_advance_amount: Option<Money>,
    pub company_fee_amount: Option<Money>,
    pub company_fee_percent: Option<f64>,
    pub installment_plan: Option<InstallmentPlan>,
    pub promise_initial_payment: Option<Money>,
    pub deadline_date: Option<NaiveDate>,
}

impl ConfirmationFields {
    /// Validates that the fields required by the chosen payment plan are present.
    pub fn validate_for(&self, payment_type: SalePaymentType) -> Result<(), DomainError> {
        match payment_type {
            SalePaymentType::Installment => match self.installment_plan {
                Some(plan) if plan.is_complete() => Ok(()),
                _ => Err(DomainError::MissingConfirmationField("installment_plan")),
            },
            SalePaymentType::Full => {
                if self.big_advance_amount.is_some_and(|m| m.is_positive()) {
                    Ok(())
                } else {
                    Err(DomainError::MissingConfirmationField("big_advance_amount"))
                }
            }
            SalePaymentType::PromiseOfSale => {
                if self.promise_initial_payment.is_some_and(|m| m.is_positive()) {
                    Ok(())
                } else {
                    Err(DomainError::MissingConfirmationField(
                        "promise_initial_payment",
                    ))
                }
            }
        }
    }
}

/// A sale of one or more inventory units to a client.
///
/// The sale record owns the lifecycle status and the fields that gate which
/// lifecycle operations are legal. Dependent record sets (installments,
/// payments, rendezvous) reference the sale by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub client_id: ClientId,
    /// Inventory units constrained by this sale while it is Pending/Completed.
    pub unit_ids: Vec<UnitId>,
    pub payment_type: SalePaymentType,
    pub status: SaleStatus,
    pub total_selling_price: Money,
    /// Reservation deposit taken at sale creation. Never reset by undo.
    pub small_advance_amount: Money,
    pub big_advance_amount: Money,
    pub company_fee_amount: Money,
    pub company_fee_percent: Option<f64>,
    pub is_confirmed: bool,
    pub big_advance_confirmed: bool,
    pub confirmed_by: Option<UserId>,
    pub created_by: UserId,
    pub promise_initial_payment: Money,
    pub promise_completed: bool,
    pub installment_plan: Option<InstallmentPlan>,
    pub deadline_date: Option<NaiveDate>,
}

impl Sale {
    /// Creates a new pending sale, as the sale-creation flow would.
    pub fn new(
        client_id: ClientId,
        unit_ids: Vec<UnitId>,
        payment_type: SalePaymentType,
        total_selling_price: Money,
        small_advance_amount: Money,
        created_by: UserId,
    ) -> Self {
        Self {
            id: SaleId::new(),
            client_id,
            unit_ids,
            payment_type,
            status: SaleStatus::Pending,
            total_selling_price,
            small_advance_amount,
            big_advance_amount: Money::zero(),
            company_fee_amount: Money::zero(),
            company_fee_percent: None,
            is_confirmed: false,
            big_advance_confirmed: false,
            confirmed_by: None,
            created_by,
            promise_initial_payment: Money::zero(),
            promise_completed: false,
            installment_plan: None,
            deadline_date: None,
        }
    }

    /// Applies the confirmation fields, moving the sale to Completed.
    ///
    /// Guard checks (`permits` and `ConfirmationFields::validate_for`) are the
    /// caller's responsibility; this only writes the fields.
    pub fn apply_confirmation(&mut self, fields: &ConfirmationFields, confirmed_by: UserId) {
        self.status = SaleStatus::Completed;
        self.is_confirmed = true;
        self.confirmed_by = Some(confirmed_by);
        if let Some(amount) = fields.big_advance_amount {
            self.big_advance_amount = amount;
            self.big_advance_confirmed = amount.is_positive();
        }
        if let Some(amount) = fields.company_fee_amount {
            self.company_fee_amount = amount;
        }
        if fields.company_fee_percent.is_some() {
            self.company_fee_percent = fields.company_fee_percent;
        }
        if fields.installment_plan.is_some() {
            self.installment_plan = fields.installment_plan;
        }
        if let Some(amount) = fields.promise_initial_payment {
            self.promise_initial_payment = amount;
        }
        if fields.deadline_date.is_some() {
            self.deadline_date = fields.deadline_date;
        }
    }

    /// Reverts a completed sale to Pending (the *undo* operation).
    ///
    /// Confirmation markers and confirmation-stage money fields are cleared;
    /// the installment plan is kept because installments are zeroed rather
    /// than deleted. The small advance field is never reset.
    pub fn revert_confirmation(&mut self) {
        self.status = SaleStatus::Pending;
        self.is_confirmed = false;
        self.confirmed_by = None;
        self.big_advance_confirmed = false;
        self.big_advance_amount = Money::zero();
        self.company_fee_amount = Money::zero();
        self.company_fee_percent = None;
        self.promise_completed = false;
        self.promise_initial_payment = Money::zero();
    }

    /// Returns the sale to its pre-confirmation state (*reset-to-confirmation*).
    ///
    /// Also drops the installment plan, since the installment rows themselves
    /// are deleted by that saga.
    pub fn reset_to_confirmation_state(&mut self) {
        self.revert_confirmation();
        self.installment_plan = None;
    }
}
