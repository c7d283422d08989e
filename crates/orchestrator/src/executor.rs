//! The saga executor: runs each lifecycle operation as an ordered write
//! sequence against the remote record store.
//!
//! There are no compensating transactions. Each saga orders its writes so
//! that a mid-sequence failure leaves the records in a money-safe state: the
//! dependent money records are removed before the sale row changes, and the
//! derived inventory status is written last. Post-condition verification
//! reads are advisory only, because access policy can hide rows that were in
//! fact deleted; a denied or residual-looking verification read is logged and
//! the committed write is trusted.

use std::time::Instant;

use chrono::{NaiveDate, NaiveTime};
use common::{RendezvousId, SaleId, UserId};
use domain::{
    ChangeType, ConfirmationFields, DomainError, HistoryEntry, HistorySubject, PaymentKind, Sale,
    SaleStatus, SaleTransition,
};
use store::{
    HistoryStore, InstallmentStore, PaymentStore, RendezvousStore, SaleStore, StoreError,
    UnitStore,
};

use crate::audit;
use crate::clock::Clock;
use crate::error::{OrchestratorError, Result};
use crate::installments::InstallmentLedger;
use crate::inventory::InventorySync;
use crate::operations::*;
use crate::outcome::OperationOutcome;
use crate::payments::PaymentLedger;
use crate::permissions::{Capability, PermissionGate};
use crate::rendezvous::RendezvousScheduler;
use crate::retry::RetryPolicy;

/// Orchestrates the sale lifecycle operations.
///
/// `St` is the record store, `G` the permission gate for the acting identity,
/// `C` the clock used for history timestamps.
pub struct SagaExecutor<St, G, C> {
    store: St,
    installments: InstallmentLedger<St>,
    payments: PaymentLedger<St>,
    inventory: InventorySync<St>,
    scheduler: RendezvousScheduler<St, C>,
    permissions: G,
    clock: C,
    actor: UserId,
    retry: RetryPolicy,
}

impl<St, G, C> SagaExecutor<St, G, C>
where
    St: SaleStore
        + InstallmentStore
        + PaymentStore
        + RendezvousStore
        + UnitStore
        + HistoryStore
        + Clone,
    G: PermissionGate,
    C: Clock + Clone,
{
    /// Creates an executor acting as `actor` with the default retry policy.
    pub fn new(store: St, permissions: G, clock: C, actor: UserId) -> Self {
        Self::with_retry(store, permissions, clock, actor, RetryPolicy::default())
    }

    /// Creates an executor with an explicit retry policy.
    pub fn with_retry(
        store: St,
        permissions: G,
        clock: C,
        actor: UserId,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            installments: InstallmentLedger::new(store.clone(), retry.clone()),
            payments: PaymentLedger::new(store.clone(), retry.clone()),
            inventory: InventorySync::new(store.clone(), retry.clone()),
            scheduler: RendezvousScheduler::new(store.clone(), retry.clone(), clock.clone(), actor),
            store,
            permissions,
            clock,
            actor,
            retry,
        }
    }

    /// Confirms a pending sale, applying the plan-specific confirmation
    /// fields and marking its units sold.
    #[tracing::instrument(skip(self, fields), fields(actor = %self.actor))]
    pub async fn confirm_sale(
        &self,
        sale_id: SaleId,
        fields: &ConfirmationFields,
    ) -> Result<OperationOutcome> {
        let started = Instant::now();
        let result = self.run_confirm_sale(sale_id, fields).await;
        self.record(OP_CONFIRM_SALE, started, &result);
        result
    }

    async fn run_confirm_sale(
        &self,
        sale_id: SaleId,
        fields: &ConfirmationFields,
    ) -> Result<OperationOutcome> {
        let mut sale = self.load_sale(sale_id).await?;
        ensure_transition(&sale, SaleTransition::Confirm)?;
        fields.validate_for(sale.payment_type)?;

        // The reservation deposit must already be on the ledger.
        let payments = self
            .retry
            .run(STEP_LOAD_PAYMENTS, || self.store.payments_for_sale(sale_id))
            .await
            .map_err(|e| OrchestratorError::step(STEP_LOAD_PAYMENTS, e))?;
        if !payments
            .iter()
            .any(|p| p.kind == PaymentKind::SmallAdvance)
        {
            return Err(DomainError::PreconditionFailed(
                "no small advance payment on record for this sale".into(),
            )
            .into());
        }

        let before = audit::snapshot(&sale);
        sale.apply_confirmation(fields, self.actor);
        self.write_sale(&sale).await?;
        self.append_sale_history(&sale, ChangeType::Confirmed, before)
            .await;

        self.inventory.mark_sold(&sale.unit_ids).await;

        tracing::info!(%sale_id, payment_type = %sale.payment_type, "sale confirmed");
        Ok(OperationOutcome::for_sale(sale, "sale confirmed"))
    }

    /// Reverts a completed sale to pending: zeroes the installment schedule,
    /// deletes every payment and clears the confirmation fields.
    #[tracing::instrument(skip(self), fields(actor = %self.actor))]
    pub async fn undo_sale(&self, sale_id: SaleId) -> Result<OperationOutcome> {
        let started = Instant::now();
        let result = self.run_undo_sale(sale_id).await;
        self.record(OP_UNDO_SALE, started, &result);
        result
    }

    async fn run_undo_sale(&self, sale_id: SaleId) -> Result<OperationOutcome> {
        self.require(Capability::UndoSale)?;
        let mut sale = self.load_sale(sale_id).await?;
        ensure_transition(&sale, SaleTransition::Undo)?;

        // Money records first, sale row after, inventory last.
        self.installments
            .reset_all(sale_id)
            .await
            .map_err(|e| OrchestratorError::step(STEP_RESET_INSTALLMENTS, e))?;
        self.payments
            .delete_all(sale_id)
            .await
            .map_err(|e| OrchestratorError::step(STEP_DELETE_PAYMENTS, e))?;

        let before = audit::snapshot(&sale);
        sale.revert_confirmation();
        self.write_sale(&sale).await?;
        self.append_sale_history(&sale, ChangeType::Undone, before)
            .await;

        self.inventory.mark_reserved(&sale.unit_ids).await;

        tracing::info!(%sale_id, "sale confirmation undone");
        Ok(OperationOutcome::for_sale(sale, "sale reverted to pending"))
    }

    /// Returns a sale to its pre-confirmation state, deleting its installment
    /// schedule and every payment except the reservation deposit and refunds.
    #[tracing::instrument(skip(self), fields(actor = %self.actor))]
    pub async fn reset_to_confirmation(&self, sale_id: SaleId) -> Result<OperationOutcome> {
        let started = Instant::now();
        let result = self.run_reset_to_confirmation(sale_id).await;
        self.record(OP_RESET_TO_CONFIRMATION, started, &result);
        result
    }

    async fn run_reset_to_confirmation(&self, sale_id: SaleId) -> Result<OperationOutcome> {
        let mut sale = self.load_sale(sale_id).await?;
        ensure_transition(&sale, SaleTransition::ResetToConfirmation)?;

        self.payments
            .delete_all_except(sale_id, &[PaymentKind::SmallAdvance, PaymentKind::Refund])
            .await
            .map_err(|e| OrchestratorError::step(STEP_DELETE_PAYMENTS, e))?;
        self.verify_payments_cleared(sale_id, true).await;

        self.installments
            .delete_all(sale_id)
            .await
            .map_err(|e| OrchestratorError::step(STEP_DELETE_INSTALLMENTS, e))?;
        self.verify_installments_cleared(sale_id).await;

        let before = audit::snapshot(&sale);
        sale.reset_to_confirmation_state();
        self.write_sale(&sale).await?;
        self.append_sale_history(&sale, ChangeType::ResetToConfirmation, before)
            .await;

        self.inventory.mark_reserved(&sale.unit_ids).await;
        self.verify_sale_reset(sale_id).await;

        tracing::info!(%sale_id, "sale reset to confirmation stage");
        Ok(OperationOutcome::for_sale(
            sale,
            "sale reset to confirmation stage",
        ))
    }

    /// Zeroes the paid amounts of the sale's installment schedule without
    /// touching payments or the sale row's money fields.
    #[tracing::instrument(skip(self), fields(actor = %self.actor))]
    pub async fn reset_installments(&self, sale_id: SaleId) -> Result<OperationOutcome> {
        let started = Instant::now();
        let result = self.run_reset_installments(sale_id).await;
        self.record(OP_RESET_INSTALLMENTS, started, &result);
        result
    }

    async fn run_reset_installments(&self, sale_id: SaleId) -> Result<OperationOutcome> {
        let sale = self.load_sale(sale_id).await?;

        let before = audit::snapshot(&sale);
        let affected = self
            .installments
            .reset_all(sale_id)
            .await
            .map_err(|e| OrchestratorError::step(STEP_RESET_INSTALLMENTS, e))?;
        self.append_sale_history(&sale, ChangeType::InstallmentsReset, before)
            .await;

        tracing::info!(%sale_id, affected, "installment schedule reset");
        Ok(OperationOutcome::for_sale(
            sale,
            format!("{affected} installments reset"),
        ))
    }

    /// Removes the sale together with every dependent record, then frees its
    /// inventory units.
    #[tracing::instrument(skip(self), fields(actor = %self.actor))]
    pub async fn delete_sale(&self, sale_id: SaleId) -> Result<OperationOutcome> {
        let started = Instant::now();
        let result = self.run_delete_sale(sale_id).await;
        self.record(OP_DELETE_SALE, started, &result);
        result
    }

    async fn run_delete_sale(&self, sale_id: SaleId) -> Result<OperationOutcome> {
        self.require(Capability::DeleteSale)?;
        let sale = self.load_sale(sale_id).await?;

        // Dependents first, sale row second-to-last, inventory last.
        self.payments
            .delete_all(sale_id)
            .await
            .map_err(|e| OrchestratorError::step(STEP_DELETE_PAYMENTS, e))?;
        self.verify_payments_cleared(sale_id, false).await;

        self.installments
            .delete_all(sale_id)
            .await
            .map_err(|e| OrchestratorError::step(STEP_DELETE_INSTALLMENTS, e))?;
        self.verify_installments_cleared(sale_id).await;

        let result = self
            .retry
            .run(STEP_DELETE_RENDEZVOUS, || {
                self.store.delete_rendezvous_by_sale(sale_id)
            })
            .await;
        match result {
            Ok(_) | Err(StoreError::NotFound) => {}
            Err(error) => return Err(OrchestratorError::step(STEP_DELETE_RENDEZVOUS, error)),
        }

        let result = self
            .retry
            .run(STEP_DELETE_SALE, || self.store.delete_sale(sale_id))
            .await;
        match result {
            // Already gone is the desired end state.
            Ok(()) | Err(StoreError::NotFound) => {}
            Err(error) => return Err(OrchestratorError::step(STEP_DELETE_SALE, error)),
        }
        self.verify_sale_absent(sale_id).await;

        self.inventory.mark_available(&sale.unit_ids).await;

        tracing::info!(%sale_id, "sale deleted");
        Ok(OperationOutcome::deleted("sale and dependent records deleted"))
    }

    /// Moves the sale's appointment to a new date and time, closing the old
    /// record and opening a linked replacement.
    #[tracing::instrument(skip(self), fields(actor = %self.actor))]
    pub async fn reschedule_rendezvous(
        &self,
        rendezvous_id: RendezvousId,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<OperationOutcome> {
        let started = Instant::now();
        let result = self.run_reschedule_rendezvous(rendezvous_id, date, time).await;
        self.record(OP_RESCHEDULE_RENDEZVOUS, started, &result);
        result
    }

    async fn run_reschedule_rendezvous(
        &self,
        rendezvous_id: RendezvousId,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<OperationOutcome> {
        let replacement = self.scheduler.reschedule(rendezvous_id, date, time).await?;
        Ok(OperationOutcome::for_rendezvous(
            None,
            replacement,
            "rendezvous rescheduled",
        ))
    }

    /// Cancels the sale's appointment and, with it, the sale itself.
    #[tracing::instrument(skip(self), fields(actor = %self.actor))]
    pub async fn cancel_rendezvous(&self, rendezvous_id: RendezvousId) -> Result<OperationOutcome> {
        let started = Instant::now();
        let result = self.run_cancel_rendezvous(rendezvous_id).await;
        self.record(OP_CANCEL_RENDEZVOUS, started, &result);
        result
    }

    async fn run_cancel_rendezvous(&self, rendezvous_id: RendezvousId) -> Result<OperationOutcome> {
        // The sale guard is checked before the rendezvous row is touched so a
        // rejected cancellation leaves the appointment scheduled.
        let rendezvous = self
            .retry
            .run(STEP_LOAD_RENDEZVOUS, || {
                self.store.get_rendezvous(rendezvous_id)
            })
            .await
            .map_err(|e| OrchestratorError::step(STEP_LOAD_RENDEZVOUS, e))?
            .ok_or(OrchestratorError::RendezvousNotFound(rendezvous_id))?;
        let mut sale = self.load_sale(rendezvous.sale_id).await?;
        ensure_transition(&sale, SaleTransition::CancelViaRendezvous)?;

        let cancelled = self.scheduler.cancel(rendezvous_id).await?;

        let before = audit::snapshot(&sale);
        sale.status = SaleStatus::Cancelled;
        self.write_sale(&sale).await?;
        self.append_sale_history(&sale, ChangeType::Cancelled, before)
            .await;

        tracing::info!(%rendezvous_id, sale_id = %sale.id, "rendezvous and sale cancelled");
        Ok(OperationOutcome::for_rendezvous(
            Some(sale),
            cancelled,
            "rendezvous cancelled, sale cancelled",
        ))
    }

    /// Returns the merged sale and rendezvous history of a sale, newest
    /// first.
    pub async fn get_history(&self, sale_id: SaleId) -> Result<Vec<HistoryEntry>> {
        self.scheduler.history_for(sale_id).await
    }

    async fn load_sale(&self, sale_id: SaleId) -> Result<Sale> {
        self.retry
            .run(STEP_LOAD_SALE, || self.store.get_sale(sale_id))
            .await
            .map_err(|e| OrchestratorError::step(STEP_LOAD_SALE, e))?
            .ok_or(OrchestratorError::SaleNotFound(sale_id))
    }

    async fn write_sale(&self, sale: &Sale) -> Result<()> {
        self.retry
            .run(STEP_WRITE_SALE, || self.store.update_sale(sale.clone()))
            .await
            .map_err(|e| OrchestratorError::step(STEP_WRITE_SALE, e))
    }

    fn require(&self, capability: Capability) -> Result<()> {
        if self.permissions.has_permission(capability) {
            Ok(())
        } else {
            Err(OrchestratorError::PermissionDenied(capability))
        }
    }

    async fn append_sale_history(
        &self,
        sale: &Sale,
        change_type: ChangeType,
        before: serde_json::Value,
    ) {
        audit::append(
            &self.store,
            HistoryEntry::new(
                sale.id,
                HistorySubject::Sale,
                change_type,
                before,
                audit::snapshot(sale),
                self.clock.now(),
                self.actor,
            ),
        )
        .await;
    }

    /// Advisory post-delete check on the payments table. A single read, no
    /// retries, never fails the saga: access policy can hide rows that were
    /// deleted, so the committed delete is trusted either way.
    async fn verify_payments_cleared(&self, sale_id: SaleId, preserved_allowed: bool) {
        match self.store.payments_for_sale(sale_id).await {
            Ok(rows) => {
                let residual = rows
                    .iter()
                    .filter(|p| !(preserved_allowed && p.is_preserved_on_reset()))
                    .count();
                if residual > 0 {
                    tracing::warn!(%sale_id, residual, "payments visible after delete");
                } else {
                    tracing::debug!(%sale_id, "payment delete verified");
                }
            }
            Err(error) if error.is_access_denied() => {
                tracing::warn!(%sale_id, "verification read denied, trusting committed delete");
            }
            Err(error) => {
                tracing::warn!(%sale_id, %error, "verification read failed, trusting committed delete");
            }
        }
    }

    /// Advisory post-delete check on the installments table.
    async fn verify_installments_cleared(&self, sale_id: SaleId) {
        match self.store.installments_for_sale(sale_id).await {
            Ok(rows) if rows.is_empty() => {
                tracing::debug!(%sale_id, "installment delete verified");
            }
            Ok(rows) => {
                tracing::warn!(%sale_id, residual = rows.len(), "installments visible after delete");
            }
            Err(error) if error.is_access_denied() => {
                tracing::warn!(%sale_id, "verification read denied, trusting committed delete");
            }
            Err(error) => {
                tracing::warn!(%sale_id, %error, "verification read failed, trusting committed delete");
            }
        }
    }

    /// Advisory re-read after a reset, confirming the field reset landed.
    async fn verify_sale_reset(&self, sale_id: SaleId) {
        match self.store.get_sale(sale_id).await {
            Ok(Some(sale)) if sale.status == SaleStatus::Pending && !sale.is_confirmed => {
                tracing::debug!(%sale_id, "sale reset verified");
            }
            Ok(Some(sale)) => {
                tracing::warn!(%sale_id, status = %sale.status, "sale row does not show the reset");
            }
            Ok(None) => {
                tracing::warn!(%sale_id, "sale row not visible after reset");
            }
            Err(error) if error.is_access_denied() => {
                tracing::warn!(%sale_id, "verification read denied, trusting committed write");
            }
            Err(error) => {
                tracing::warn!(%sale_id, %error, "verification read failed, trusting committed write");
            }
        }
    }

    /// Advisory check that the sale row is gone.
    async fn verify_sale_absent(&self, sale_id: SaleId) {
        match self.store.get_sale(sale_id).await {
            Ok(None) => tracing::debug!(%sale_id, "sale delete verified"),
            Ok(Some(_)) => tracing::warn!(%sale_id, "sale row visible after delete"),
            Err(error) if error.is_access_denied() => {
                tracing::warn!(%sale_id, "verification read denied, trusting committed delete");
            }
            Err(error) => {
                tracing::warn!(%sale_id, %error, "verification read failed, trusting committed delete");
            }
        }
    }

    fn record(&self, operation: &'static str, started: Instant, result: &Result<OperationOutcome>) {
        let outcome = match result {
            Ok(_) => "success",
            Err(error) => {
                tracing::warn!(operation, class = error.class(), %error, "operation failed");
                "error"
            }
        };
        metrics::counter!(
            "lifecycle_operations_total",
            "operation" => operation,
            "outcome" => outcome
        )
        .increment(1);
        metrics::histogram!(
            "lifecycle_operation_duration_seconds",
            "operation" => operation
        )
        .record(started.elapsed().as_secs_f64());
    }
}

fn ensure_transition(sale: &Sale, transition: SaleTransition) -> Result<()> {
    if sale.status.permits(transition) {
        Ok(())
    } else {
        Err(DomainError::InvalidTransition {
            from: sale.status,
            transition,
        }
        .into())
    }
}

impl<St, G, C> std::fmt::Debug for SagaExecutor<St, G, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SagaExecutor")
            .field("actor", &self.actor)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
