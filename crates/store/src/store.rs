//! Per-entity store traits.
//!
//! Each method maps to a single remote call: either a by-id write or a
//! server-side predicate write (`*_by_sale`, `*_by_ids`). Predicate writes
//! return the affected row count; callers must not assume visibility of the
//! result, since access policy can hide rows from subsequent reads.

use async_trait::async_trait;
use common::{PaymentId, RendezvousId, SaleId, UnitId};
use domain::{
    HistoryEntry, Installment, InstallmentPatch, InventoryUnit, Payment, Rendezvous, Sale,
    UnitStatus,
};

use crate::error::Result;

/// Remote access to the sales table.
#[async_trait]
pub trait SaleStore: Send + Sync {
    /// Inserts a new sale record.
    async fn insert_sale(&self, sale: Sale) -> Result<()>;

    /// Fetches a sale by id. Returns `None` if no row exists.
    async fn get_sale(&self, id: SaleId) -> Result<Option<Sale>>;

    /// Replaces the sale row keyed by `sale.id`.
    async fn update_sale(&self, sale: Sale) -> Result<()>;

    /// Deletes the sale row.
    async fn delete_sale(&self, id: SaleId) -> Result<()>;
}

/// Remote access to the installments table.
#[async_trait]
pub trait InstallmentStore: Send + Sync {
    /// Inserts a new installment record.
    async fn insert_installment(&self, installment: Installment) -> Result<()>;

    /// Fetches all installments of a sale.
    async fn installments_for_sale(&self, sale_id: SaleId) -> Result<Vec<Installment>>;

    /// Applies `patch` to every installment of the sale in one predicate
    /// update. Returns the affected row count.
    async fn update_installments_by_sale(
        &self,
        sale_id: SaleId,
        patch: InstallmentPatch,
    ) -> Result<u64>;

    /// Deletes every installment of the sale in one predicate delete.
    async fn delete_installments_by_sale(&self, sale_id: SaleId) -> Result<u64>;
}

/// Remote access to the payments table.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Inserts a new payment record.
    async fn insert_payment(&self, payment: Payment) -> Result<()>;

    /// Fetches all payments of a sale.
    async fn payments_for_sale(&self, sale_id: SaleId) -> Result<Vec<Payment>>;

    /// Deletes the payments with the given ids. Ids with no matching row are
    /// skipped; returns the number of rows actually deleted. Callers keep id
    /// batches small (the backend gives no guarantee for large `IN` lists).
    async fn delete_payments_by_ids(&self, ids: &[PaymentId]) -> Result<u64>;
}

/// Remote access to the rendezvous table.
#[async_trait]
pub trait RendezvousStore: Send + Sync {
    /// Inserts a new rendezvous record.
    async fn insert_rendezvous(&self, rendezvous: Rendezvous) -> Result<()>;

    /// Fetches a rendezvous by id. Returns `None` if no row exists.
    async fn get_rendezvous(&self, id: RendezvousId) -> Result<Option<Rendezvous>>;

    /// Fetches every rendezvous ever created for the sale.
    async fn rendezvous_for_sale(&self, sale_id: SaleId) -> Result<Vec<Rendezvous>>;

    /// Replaces the rendezvous row keyed by `rendezvous.id`.
    async fn update_rendezvous(&self, rendezvous: Rendezvous) -> Result<()>;

    /// Deletes every rendezvous of the sale in one predicate delete.
    async fn delete_rendezvous_by_sale(&self, sale_id: SaleId) -> Result<u64>;
}

/// Remote access to the inventory unit tables (land pieces and houses).
#[async_trait]
pub trait UnitStore: Send + Sync {
    /// Inserts a new inventory unit.
    async fn insert_unit(&self, unit: InventoryUnit) -> Result<()>;

    /// Fetches a unit by id. Returns `None` if no row exists.
    async fn get_unit(&self, id: UnitId) -> Result<Option<InventoryUnit>>;

    /// Sets the status of the given units in one predicate update, optionally
    /// clearing the reserving-client reference. Returns the affected count.
    async fn update_unit_status(
        &self,
        ids: &[UnitId],
        status: UnitStatus,
        clear_reservation: bool,
    ) -> Result<u64>;
}

/// Remote access to the append-only history tables.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Appends an immutable history entry.
    async fn append_history(&self, entry: HistoryEntry) -> Result<()>;

    /// Fetches the sale-history rows for a sale.
    async fn sale_history(&self, sale_id: SaleId) -> Result<Vec<HistoryEntry>>;

    /// Fetches the rendezvous-history rows for the given rendezvous ids.
    async fn rendezvous_history(&self, ids: &[RendezvousId]) -> Result<Vec<HistoryEntry>>;
}
