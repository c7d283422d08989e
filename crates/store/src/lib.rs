//! Remote record store contract.
//!
//! The real backend exposes per-entity insert/update/delete/select calls,
//! each independently committed: there is no multi-record transaction
//! primitive, and row-level access policy can hide rows from verification
//! reads. The traits here capture exactly that contract; `InMemoryStore`
//! implements it for tests, with fault injection to simulate the error codes
//! and an operation journal to assert step ordering.

pub mod error;
pub mod memory;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use store::{
    HistoryStore, InstallmentStore, PaymentStore, RendezvousStore, SaleStore, UnitStore,
};
