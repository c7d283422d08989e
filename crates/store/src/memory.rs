//! In-memory record store for testing.
//!
//! Implements every entity store trait over shared hash maps. Two test
//! affordances mirror how the remote backend misbehaves:
//!
//! - a fault queue per operation key (`"payments.delete"`, `"sales.update"`,
//!   ...) so tests can script not-found / access-denied / transient errors;
//! - an operation journal recording every attempted call in order, so tests
//!   can assert step sequencing and retry counts.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use common::{PaymentId, RendezvousId, SaleId, UnitId};
use domain::{
    HistoryEntry, HistorySubject, Installment, InstallmentPatch, InventoryUnit, Payment,
    Rendezvous, Sale, UnitStatus,
};

use crate::error::{Result, StoreError};
use crate::store::{
    HistoryStore, InstallmentStore, PaymentStore, RendezvousStore, SaleStore, UnitStore,
};

#[derive(Debug, Default)]
struct Tables {
    sales: HashMap<SaleId, Sale>,
    installments: HashMap<common::InstallmentId, Installment>,
    payments: HashMap<PaymentId, Payment>,
    rendezvous: HashMap<RendezvousId, Rendezvous>,
    units: HashMap<UnitId, InventoryUnit>,
    history: Vec<HistoryEntry>,
}

/// In-memory record store with fault injection and an operation journal.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Mutex<HashMap<String, VecDeque<StoreError>>>>,
    journal: Arc<Mutex<Vec<String>>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `error` to be returned by the next call to `op`.
    pub fn fail_next(&self, op: &str, error: StoreError) {
        self.fail_times(op, error, 1);
    }

    /// Queues `error` to be returned by the next `times` calls to `op`.
    pub fn fail_times(&self, op: &str, error: StoreError, times: u32) {
        let mut faults = self.faults.lock().unwrap();
        let queue = faults.entry(op.to_string()).or_default();
        for _ in 0..times {
            queue.push_back(error.clone());
        }
    }

    /// Returns every operation attempted so far, in order.
    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    /// Returns how many times `op` has been attempted.
    pub fn attempts(&self, op: &str) -> usize {
        self.journal
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.as_str() == op)
            .count()
    }

    /// Clears the operation journal (fault queues are untouched).
    pub fn clear_journal(&self) {
        self.journal.lock().unwrap().clear();
    }

    /// Journals the attempt, then pops and returns a queued fault, if any.
    fn intercept(&self, op: &str) -> Result<()> {
        self.journal.lock().unwrap().push(op.to_string());
        let mut faults = self.faults.lock().unwrap();
        if let Some(queue) = faults.get_mut(op)
            && let Some(error) = queue.pop_front()
        {
            return Err(error);
        }
        Ok(())
    }
}

#[async_trait]
impl SaleStore for InMemoryStore {
    async fn insert_sale(&self, sale: Sale) -> Result<()> {
        self.intercept("sales.insert")?;
        self.tables.lock().unwrap().sales.insert(sale.id, sale);
        Ok(())
    }

    async fn get_sale(&self, id: SaleId) -> Result<Option<Sale>> {
        self.intercept("sales.get")?;
        Ok(self.tables.lock().unwrap().sales.get(&id).cloned())
    }

    async fn update_sale(&self, sale: Sale) -> Result<()> {
        self.intercept("sales.update")?;
        let mut tables = self.tables.lock().unwrap();
        if !tables.sales.contains_key(&sale.id) {
            return Err(StoreError::NotFound);
        }
        tables.sales.insert(sale.id, sale);
        Ok(())
    }

    async fn delete_sale(&self, id: SaleId) -> Result<()> {
        self.intercept("sales.delete")?;
        let mut tables = self.tables.lock().unwrap();
        if tables.sales.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl InstallmentStore for InMemoryStore {
    async fn insert_installment(&self, installment: Installment) -> Result<()> {
        self.intercept("installments.insert")?;
        self.tables
            .lock()
            .unwrap()
            .installments
            .insert(installment.id, installment);
        Ok(())
    }

    async fn installments_for_sale(&self, sale_id: SaleId) -> Result<Vec<Installment>> {
        self.intercept("installments.select")?;
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<_> = tables
            .installments
            .values()
            .filter(|i| i.sale_id == sale_id)
            .cloned()
            .collect();
        rows.sort_by_key(|i| i.installment_number);
        Ok(rows)
    }

    async fn update_installments_by_sale(
        &self,
        sale_id: SaleId,
        patch: InstallmentPatch,
    ) -> Result<u64> {
        self.intercept("installments.update_by_sale")?;
        let mut tables = self.tables.lock().unwrap();
        let mut affected = 0;
        for installment in tables.installments.values_mut() {
            if installment.sale_id == sale_id {
                patch.apply_to(installment);
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn delete_installments_by_sale(&self, sale_id: SaleId) -> Result<u64> {
        self.intercept("installments.delete_by_sale")?;
        let mut tables = self.tables.lock().unwrap();
        let before = tables.installments.len();
        tables.installments.retain(|_, i| i.sale_id != sale_id);
        Ok((before - tables.installments.len()) as u64)
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn insert_payment(&self, payment: Payment) -> Result<()> {
        self.intercept("payments.insert")?;
        self.tables
            .lock()
            .unwrap()
            .payments
            .insert(payment.id, payment);
        Ok(())
    }

    async fn payments_for_sale(&self, sale_id: SaleId) -> Result<Vec<Payment>> {
        self.intercept("payments.select")?;
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<_> = tables
            .payments
            .values()
            .filter(|p| p.sale_id == sale_id)
            .cloned()
            .collect();
        rows.sort_by_key(|p| (p.payment_date, p.id));
        Ok(rows)
    }

    async fn delete_payments_by_ids(&self, ids: &[PaymentId]) -> Result<u64> {
        self.intercept("payments.delete")?;
        let mut tables = self.tables.lock().unwrap();
        let mut deleted = 0;
        for id in ids {
            if tables.payments.remove(id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

#[async_trait]
impl RendezvousStore for InMemoryStore {
    async fn insert_rendezvous(&self, rendezvous: Rendezvous) -> Result<()> {
        self.intercept("rendezvous.insert")?;
        self.tables
            .lock()
            .unwrap()
            .rendezvous
            .insert(rendezvous.id, rendezvous);
        Ok(())
    }

    async fn get_rendezvous(&self, id: RendezvousId) -> Result<Option<Rendezvous>> {
        self.intercept("rendezvous.get")?;
        Ok(self.tables.lock().unwrap().rendezvous.get(&id).cloned())
    }

    async fn rendezvous_for_sale(&self, sale_id: SaleId) -> Result<Vec<Rendezvous>> {
        self.intercept("rendezvous.select")?;
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<_> = tables
            .rendezvous
            .values()
            .filter(|r| r.sale_id == sale_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }

    async fn update_rendezvous(&self, rendezvous: Rendezvous) -> Result<()> {
        self.intercept("rendezvous.update")?;
        let mut tables = self.tables.lock().unwrap();
        if !tables.rendezvous.contains_key(&rendezvous.id) {
            return Err(StoreError::NotFound);
        }
        tables.rendezvous.insert(rendezvous.id, rendezvous);
        Ok(())
    }

    async fn delete_rendezvous_by_sale(&self, sale_id: SaleId) -> Result<u64> {
        self.intercept("rendezvous.delete_by_sale")?;
        let mut tables = self.tables.lock().unwrap();
        let before = tables.rendezvous.len();
        tables.rendezvous.retain(|_, r| r.sale_id != sale_id);
        Ok((before - tables.rendezvous.len()) as u64)
    }
}

#[async_trait]
impl UnitStore for InMemoryStore {
    async fn insert_unit(&self, unit: InventoryUnit) -> Result<()> {
        self.intercept("units.insert")?;
        self.tables.lock().unwrap().units.insert(unit.id, unit);
        Ok(())
    }

    async fn get_unit(&self, id: UnitId) -> Result<Option<InventoryUnit>> {
        self.intercept("units.get")?;
        Ok(self.tables.lock().unwrap().units.get(&id).cloned())
    }

    async fn update_unit_status(
        &self,
        ids: &[UnitId],
        status: UnitStatus,
        clear_reservation: bool,
    ) -> Result<u64> {
        self.intercept("units.update_status")?;
        let mut tables = self.tables.lock().unwrap();
        let mut affected = 0;
        for id in ids {
            if let Some(unit) = tables.units.get_mut(id) {
                unit.status = status;
                if clear_reservation {
                    unit.reserved_by = None;
                }
                affected += 1;
            }
        }
        Ok(affected)
    }
}

#[async_trait]
impl HistoryStore for InMemoryStore {
    async fn append_history(&self, entry: HistoryEntry) -> Result<()> {
        self.intercept("history.append")?;
        self.tables.lock().unwrap().history.push(entry);
        Ok(())
    }

    async fn sale_history(&self, sale_id: SaleId) -> Result<Vec<HistoryEntry>> {
        self.intercept("history.select_sale")?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .history
            .iter()
            .filter(|e| e.sale_id == sale_id && e.subject == HistorySubject::Sale)
            .cloned()
            .collect())
    }

    async fn rendezvous_history(&self, ids: &[RendezvousId]) -> Result<Vec<HistoryEntry>> {
        self.intercept("history.select_rendezvous")?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .history
            .iter()
            .filter(|e| matches!(e.subject, HistorySubject::Rendezvous(id) if ids.contains(&id)))
            .cloned()
            .collect())
    }
}
