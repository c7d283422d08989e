//! Sale lifecycle orchestrator.
//!
//! The remote record store commits each write independently, so every
//! lifecycle operation (confirm, undo, reset, delete, reschedule, cancel) is
//! a client-side saga: an ordered sequence of writes with transient-failure
//! retry, post-condition verification under row-level visibility
//! restrictions, and a money-safe step order instead of compensating
//! rollback. Inventory status is written last because it is a derived
//! projection; money records are never rolled back once committed.

mod audit;

pub mod clock;
pub mod error;
pub mod executor;
pub mod installments;
pub mod inventory;
pub mod operations;
pub mod outcome;
pub mod payments;
pub mod permissions;
pub mod rendezvous;
pub mod retry;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::OrchestratorError;
pub use executor::SagaExecutor;
pub use installments::InstallmentLedger;
pub use inventory::InventorySync;
pub use outcome::OperationOutcome;
pub use payments::PaymentLedger;
pub use permissions::{Capability, PermissionGate, StaticPermissions};
pub use rendezvous::RendezvousScheduler;
pub use retry::RetryPolicy;
