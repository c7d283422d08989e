//! Payment ledger deletion with chunking and per-row fallback.

use common::{PaymentId, SaleId};
use domain::PaymentKind;
use store::{PaymentStore, StoreError};

use crate::operations::{STEP_DELETE_PAYMENTS, STEP_LOAD_PAYMENTS};
use crate::retry::RetryPolicy;

/// Upper bound on ids per delete call; the backend gives no guarantee for
/// large `IN` lists.
pub const DELETE_CHUNK_SIZE: usize = 100;

/// Bulk payment deletion for the undo, reset and delete sagas.
///
/// Ids are deleted in chunks of at most [`DELETE_CHUNK_SIZE`]. A chunk that
/// keeps failing after retries falls back to deleting its rows one by one, so
/// a single poisoned row cannot block the rest of the chunk. Rows already
/// gone count as deleted. The first hard error is reported only after the
/// whole batch has been attempted.
pub struct PaymentLedger<S> {
    store: S,
    retry: RetryPolicy,
}

impl<S: PaymentStore> PaymentLedger<S> {
    pub fn new(store: S, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Deletes every payment of the sale. Returns the deleted row count.
    pub async fn delete_all(&self, sale_id: SaleId) -> Result<u64, StoreError> {
        self.delete_matching(sale_id, &[]).await
    }

    /// Deletes every payment of the sale except the given kinds.
    pub async fn delete_all_except(
        &self,
        sale_id: SaleId,
        keep: &[PaymentKind],
    ) -> Result<u64, StoreError> {
        self.delete_matching(sale_id, keep).await
    }

    async fn delete_matching(
        &self,
        sale_id: SaleId,
        keep: &[PaymentKind],
    ) -> Result<u64, StoreError> {
        let payments = self
            .retry
            .run(STEP_LOAD_PAYMENTS, || self.store.payments_for_sale(sale_id))
            .await?;
        let ids: Vec<PaymentId> = payments
            .iter()
            .filter(|p| !keep.contains(&p.kind))
            .map(|p| p.id)
            .collect();

        let mut deleted = 0;
        let mut first_error = None;
        for chunk in ids.chunks(DELETE_CHUNK_SIZE) {
            match self
                .retry
                .run(STEP_DELETE_PAYMENTS, || {
                    self.store.delete_payments_by_ids(chunk)
                })
                .await
            {
                Ok(count) => deleted += count,
                // The whole chunk is already gone.
                Err(StoreError::NotFound) => {}
                Err(error) => {
                    tracing::warn!(
                        %sale_id,
                        chunk_len = chunk.len(),
                        %error,
                        "chunk delete failed, falling back to per-row deletes"
                    );
                    let (row_deleted, row_error) = self.delete_rows_individually(chunk).await;
                    deleted += row_deleted;
                    // A fully recovered fallback clears the chunk error.
                    if first_error.is_none() {
                        first_error = row_error;
                    }
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => {
                tracing::debug!(%sale_id, deleted, "payments deleted");
                Ok(deleted)
            }
        }
    }

    /// Deletes the rows of a failed chunk one id at a time. Returns the
    /// deleted count and the first hard error, if any.
    async fn delete_rows_individually(
        &self,
        ids: &[PaymentId],
    ) -> (u64, Option<StoreError>) {
        let mut deleted = 0;
        let mut first_error = None;
        for id in ids {
            match self
                .retry
                .run(STEP_DELETE_PAYMENTS, || {
                    self.store.delete_payments_by_ids(std::slice::from_ref(id))
                })
                .await
            {
                Ok(count) => deleted += count,
                Err(StoreError::NotFound) => {}
                Err(error) => {
                    tracing::warn!(payment_id = %id, %error, "row delete failed");
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }
        (deleted, first_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use common::{ClientId, Money};
    use domain::{Payment, PaymentMethod};
    use store::InMemoryStore;

    async fn seed_payments(
        store: &InMemoryStore,
        sale_id: SaleId,
        kind: PaymentKind,
        count: usize,
    ) {
        let client_id = ClientId::new();
        let date = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        for _ in 0..count {
            let p = Payment::new(
                sale_id,
                client_id,
                Money::from_cents(5_000),
                kind,
                date,
                PaymentMethod::Cash,
            );
            store.insert_payment(p).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_delete_all_removes_every_payment() {
        let store = InMemoryStore::new();
        let sale_id = SaleId::new();
        seed_payments(&store, sale_id, PaymentKind::SmallAdvance, 1).await;
        seed_payments(&store, sale_id, PaymentKind::Installment, 4).await;

        let ledger = PaymentLedger::new(store.clone(), RetryPolicy::default());
        let deleted = ledger.delete_all(sale_id).await.unwrap();

        assert_eq!(deleted, 5);
        assert!(store.payments_for_sale(sale_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_large_batches_are_chunked() {
        let store = InMemoryStore::new();
        let sale_id = SaleId::new();
        seed_payments(&store, sale_id, PaymentKind::Installment, 250).await;

        let ledger = PaymentLedger::new(store.clone(), RetryPolicy::default());
        let deleted = ledger.delete_all(sale_id).await.unwrap();

        assert_eq!(deleted, 250);
        // 250 ids split into 100 + 100 + 50.
        assert_eq!(store.attempts("payments.delete"), 3);
    }

    #[tokio::test]
    async fn test_delete_all_except_keeps_the_given_kinds() {
        let store = InMemoryStore::new();
        let sale_id = SaleId::new();
        seed_payments(&store, sale_id, PaymentKind::SmallAdvance, 1).await;
        seed_payments(&store, sale_id, PaymentKind::Refund, 1).await;
        seed_payments(&store, sale_id, PaymentKind::BigAdvance, 2).await;

        let ledger = PaymentLedger::new(store.clone(), RetryPolicy::default());
        let deleted = ledger
            .delete_all_except(sale_id, &[PaymentKind::SmallAdvance, PaymentKind::Refund])
            .await
            .unwrap();

        assert_eq!(deleted, 2);
        let kept = store.payments_for_sale(sale_id).await.unwrap();
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|p| p.is_preserved_on_reset()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_chunk_falls_back_to_per_row_deletes() {
        let store = InMemoryStore::new();
        let sale_id = SaleId::new();
        seed_payments(&store, sale_id, PaymentKind::Installment, 3).await;
        // The chunk delete burns its whole retry budget, then each row is
        // deleted individually.
        store.fail_times(
            "payments.delete",
            StoreError::Transient("timeout".into()),
            5,
        );

        let ledger = PaymentLedger::new(store.clone(), RetryPolicy::default());
        let deleted = ledger.delete_all(sale_id).await.unwrap();

        assert_eq!(deleted, 3);
        assert!(store.payments_for_sale(sale_id).await.unwrap().is_empty());
        // 5 failed chunk attempts + 3 per-row deletes.
        assert_eq!(store.attempts("payments.delete"), 8);
    }

    #[tokio::test]
    async fn test_constraint_violation_reported_after_finishing_the_batch() {
        let store = InMemoryStore::new();
        let sale_id = SaleId::new();
        seed_payments(&store, sale_id, PaymentKind::Installment, 2).await;
        // Chunk fails hard, then the first per-row delete fails hard too; the
        // second row still gets its delete attempt.
        store.fail_times(
            "payments.delete",
            StoreError::ConstraintViolation("fk".into()),
            2,
        );

        let ledger = PaymentLedger::new(store.clone(), RetryPolicy::default());
        let result = ledger.delete_all(sale_id).await;

        assert_eq!(result, Err(StoreError::ConstraintViolation("fk".into())));
        // One chunk attempt + two per-row attempts.
        assert_eq!(store.attempts("payments.delete"), 3);
        assert_eq!(store.payments_for_sale(sale_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_not_found_chunk_counts_as_deleted() {
        let store = InMemoryStore::new();
        let sale_id = SaleId::new();
        seed_payments(&store, sale_id, PaymentKind::Installment, 1).await;
        store.fail_next("payments.delete", StoreError::NotFound);

        let ledger = PaymentLedger::new(store, RetryPolicy::default());
        assert_eq!(ledger.delete_all(sale_id).await.unwrap(), 0);
    }
}
