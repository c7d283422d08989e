//! Domain model for the sale lifecycle orchestrator.
//!
//! Pure data and state-machine logic: the `Sale` record with its status
//! transition table, the dependent record sets (installments, payments,
//! rendezvous, inventory units), and the append-only history entries used
//! for audit reconstruction. No I/O lives here.

pub mod error;
pub mod history;
pub mod installment;
pub mod payment;
pub mod rendezvous;
pub mod sale;
pub mod unit;

pub use error::DomainError;
pub use history::{ChangeType, HistoryEntry, HistorySubject};
pub use installment::{Installment, InstallmentPatch, InstallmentStatus};
pub use payment::{Payment, PaymentKind, PaymentMethod};
pub use rendezvous::{Rendezvous, RendezvousStatus};
pub use sale::state::{SaleStatus, SaleTransition};
pub use sale::{ConfirmationFields, InstallmentPlan, Sale, SalePaymentType};
pub use unit::{InventoryUnit, UnitKind, UnitStatus};
