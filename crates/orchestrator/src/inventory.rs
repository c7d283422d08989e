//! Inventory status sync: the last, best-effort step of every sale saga.
//!
//! Unit status is a projection of the sale's state, so a failed sync never
//! fails the operation that triggered it. Transients are retried; whatever
//! error remains is logged and swallowed, leaving the status stale until the
//! next lifecycle operation rewrites it.

use common::UnitId;
use store::{StoreError, UnitStore};

use crate::operations::{STEP_MARK_AVAILABLE, STEP_MARK_RESERVED, STEP_MARK_SOLD};
use crate::retry::RetryPolicy;
use domain::UnitStatus;

/// Writes derived unit statuses after a sale lifecycle change.
pub struct InventorySync<S> {
    store: S,
    retry: RetryPolicy,
}

impl<S: UnitStore> InventorySync<S> {
    pub fn new(store: S, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Marks units sold after a confirmation.
    pub async fn mark_sold(&self, ids: &[UnitId]) -> u64 {
        self.set_status(STEP_MARK_SOLD, ids, UnitStatus::Sold, false)
            .await
    }

    /// Marks units reserved after an undo or reset; the reserving client is
    /// kept because the sale still holds the units.
    pub async fn mark_reserved(&self, ids: &[UnitId]) -> u64 {
        self.set_status(STEP_MARK_RESERVED, ids, UnitStatus::Reserved, false)
            .await
    }

    /// Returns units to the open inventory after a sale deletion, clearing
    /// the reserving-client reference.
    pub async fn mark_available(&self, ids: &[UnitId]) -> u64 {
        self.set_status(STEP_MARK_AVAILABLE, ids, UnitStatus::Available, true)
            .await
    }

    async fn set_status(
        &self,
        step: &'static str,
        ids: &[UnitId],
        status: UnitStatus,
        clear_reservation: bool,
    ) -> u64 {
        if ids.is_empty() {
            return 0;
        }
        let result = self
            .retry
            .run(step, || {
                self.store.update_unit_status(ids, status, clear_reservation)
            })
            .await;
        match result {
            Ok(affected) => {
                if (affected as usize) < ids.len() {
                    tracing::warn!(
                        step,
                        expected = ids.len(),
                        affected,
                        "some units were not updated"
                    );
                }
                affected
            }
            Err(error) => {
                tracing::warn!(step, %error, "inventory sync failed, status left stale");
                metrics::counter!("inventory_sync_failures", "step" => step).increment(1);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ClientId;
    use domain::{InventoryUnit, UnitKind};
    use store::InMemoryStore;

    async fn seed_unit(store: &InMemoryStore, status: UnitStatus) -> UnitId {
        let mut unit = InventoryUnit::new(UnitKind::LandPiece);
        unit.status = status;
        unit.reserved_by = Some(ClientId::new());
        let id = unit.id;
        store.insert_unit(unit).await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_mark_sold_keeps_reservation() {
        let store = InMemoryStore::new();
        let id = seed_unit(&store, UnitStatus::Reserved).await;

        let sync = InventorySync::new(store.clone(), RetryPolicy::default());
        assert_eq!(sync.mark_sold(&[id]).await, 1);

        let unit = store.get_unit(id).await.unwrap().unwrap();
        assert_eq!(unit.status, UnitStatus::Sold);
        assert!(unit.reserved_by.is_some());
    }

    #[tokio::test]
    async fn test_mark_available_clears_reservation() {
        let store = InMemoryStore::new();
        let id = seed_unit(&store, UnitStatus::Sold).await;

        let sync = InventorySync::new(store.clone(), RetryPolicy::default());
        assert_eq!(sync.mark_available(&[id]).await, 1);

        let unit = store.get_unit(id).await.unwrap().unwrap();
        assert_eq!(unit.status, UnitStatus::Available);
        assert!(unit.reserved_by.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_failure_is_swallowed() {
        let store = InMemoryStore::new();
        let id = seed_unit(&store, UnitStatus::Sold).await;
        store.fail_times(
            "units.update_status",
            StoreError::Transient("timeout".into()),
            5,
        );

        let sync = InventorySync::new(store.clone(), RetryPolicy::default());
        assert_eq!(sync.mark_reserved(&[id]).await, 0);

        // Status left stale; the operation itself did not fail.
        let unit = store.get_unit(id).await.unwrap().unwrap();
        assert_eq!(unit.status, UnitStatus::Sold);
        assert_eq!(store.attempts("units.update_status"), 5);
    }

    #[tokio::test]
    async fn test_empty_id_list_skips_the_write() {
        let store = InMemoryStore::new();
        let sync = InventorySync::new(store.clone(), RetryPolicy::default());
        assert_eq!(sync.mark_sold(&[]).await, 0);
        assert_eq!(store.attempts("units.update_status"), 0);
    }
}
