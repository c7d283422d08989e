//! Shared types used across the sale lifecycle orchestrator.

pub mod ids;
pub mod money;

pub use ids::{ClientId, InstallmentId, PaymentId, RendezvousId, SaleId, UnitId, UserId};
pub use money::Money;
