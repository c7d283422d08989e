//! Installment ledger steps shared by the undo and reset sagas.

use common::SaleId;
use domain::InstallmentPatch;
use store::{InstallmentStore, StoreError};

use crate::operations::{STEP_DELETE_INSTALLMENTS, STEP_RESET_INSTALLMENTS};
use crate::retry::RetryPolicy;

/// Predicate writes against a sale's installment schedule.
///
/// Both operations act on zero or more rows server-side, so a sale with no
/// installments (a Full or PromiseOfSale plan) is a successful no-op rather
/// than an error.
pub struct InstallmentLedger<S> {
    store: S,
    retry: RetryPolicy,
}

impl<S: InstallmentStore> InstallmentLedger<S> {
    pub fn new(store: S, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Zeroes paid amounts and returns every installment of the sale to
    /// Unpaid. Returns the affected row count.
    pub async fn reset_all(&self, sale_id: SaleId) -> Result<u64, StoreError> {
        let result = self
            .retry
            .run(STEP_RESET_INSTALLMENTS, || {
                self.store
                    .update_installments_by_sale(sale_id, InstallmentPatch::cleared())
            })
            .await;
        match result {
            Ok(affected) => {
                tracing::debug!(%sale_id, affected, "installments reset");
                Ok(affected)
            }
            // No schedule to reset is the desired end state.
            Err(StoreError::NotFound) => Ok(0),
            Err(error) => Err(error),
        }
    }

    /// Deletes every installment of the sale. Returns the deleted row count.
    pub async fn delete_all(&self, sale_id: SaleId) -> Result<u64, StoreError> {
        let result = self
            .retry
            .run(STEP_DELETE_INSTALLMENTS, || {
                self.store.delete_installments_by_sale(sale_id)
            })
            .await;
        match result {
            Ok(deleted) => {
                tracing::debug!(%sale_id, deleted, "installments deleted");
                Ok(deleted)
            }
            Err(StoreError::NotFound) => Ok(0),
            Err(error) => Err(error),
        }
    }
}
