//! Rendezvous scheduling: reschedule chains and cancellation.
//!
//! A reschedule never mutates the appointment in place. The old record is
//! closed with status `rescheduled` and a fresh record is inserted pointing
//! back at it, so the full chain of appointments stays reconstructable. If
//! the insert fails after the close committed, the error surfaces and the
//! chain is left with no scheduled record; the close is not compensated.

use chrono::{NaiveDate, NaiveTime};
use common::{RendezvousId, SaleId, UserId};
use domain::{ChangeType, HistoryEntry, HistorySubject, Rendezvous, RendezvousStatus};
use store::{HistoryStore, RendezvousStore};

use crate::audit;
use crate::clock::Clock;
use crate::error::{OrchestratorError, Result};
use crate::operations::{
    STEP_CANCEL_RENDEZVOUS, STEP_CLOSE_OLD_RENDEZVOUS, STEP_LOAD_HISTORY, STEP_LOAD_RENDEZVOUS,
    STEP_OPEN_NEW_RENDEZVOUS,
};
use crate::retry::RetryPolicy;

/// Reschedules and cancels the appointments of a sale.
pub struct RendezvousScheduler<S, C> {
    store: S,
    retry: RetryPolicy,
    clock: C,
    actor: UserId,
}

impl<S, C> RendezvousScheduler<S, C>
where
    S: RendezvousStore + HistoryStore,
    C: Clock,
{
    pub fn new(store: S, retry: RetryPolicy, clock: C, actor: UserId) -> Self {
        Self {
            store,
            retry,
            clock,
            actor,
        }
    }

    async fn load(&self, id: RendezvousId) -> Result<Rendezvous> {
        self.retry
            .run(STEP_LOAD_RENDEZVOUS, || self.store.get_rendezvous(id))
            .await
            .map_err(|e| OrchestratorError::step(STEP_LOAD_RENDEZVOUS, e))?
            .ok_or(OrchestratorError::RendezvousNotFound(id))
    }

    /// Moves the appointment to a new date and time.
    ///
    /// Closes the old record and inserts its replacement; returns the new
    /// scheduled record. Deliberately accepts an already-closed record: when
    /// the insert of a previous reschedule failed after the close committed,
    /// re-running the reschedule closes the old record again and completes
    /// the chain.
    pub async fn reschedule(
        &self,
        id: RendezvousId,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Rendezvous> {
        let old = self.load(id).await?;

        let mut closed = old.clone();
        closed.status = RendezvousStatus::Rescheduled;
        self.retry
            .run(STEP_CLOSE_OLD_RENDEZVOUS, || {
                self.store.update_rendezvous(closed.clone())
            })
            .await
            .map_err(|e| OrchestratorError::step(STEP_CLOSE_OLD_RENDEZVOUS, e))?;
        audit::append(
            &self.store,
            HistoryEntry::new(
                old.sale_id,
                HistorySubject::Rendezvous(old.id),
                ChangeType::Rescheduled,
                audit::snapshot(&old),
                audit::snapshot(&closed),
                self.clock.now(),
                self.actor,
            ),
        )
        .await;

        let replacement = Rendezvous::rescheduled_from(&old, date, time);
        self.retry
            .run(STEP_OPEN_NEW_RENDEZVOUS, || {
                self.store.insert_rendezvous(replacement.clone())
            })
            .await
            .map_err(|e| OrchestratorError::step(STEP_OPEN_NEW_RENDEZVOUS, e))?;
        audit::append(
            &self.store,
            HistoryEntry::new(
                replacement.sale_id,
                HistorySubject::Rendezvous(replacement.id),
                ChangeType::Scheduled,
                serde_json::Value::Null,
                audit::snapshot(&replacement),
                self.clock.now(),
                self.actor,
            ),
        )
        .await;

        tracing::info!(
            rendezvous_id = %replacement.id,
            replaces = %old.id,
            sale_id = %old.sale_id,
            "rendezvous rescheduled"
        );
        Ok(replacement)
    }

    /// Cancels the appointment, returning the cancelled record. The owning
    /// sale's transition is the caller's responsibility.
    pub async fn cancel(&self, id: RendezvousId) -> Result<Rendezvous> {
        let old = self.load(id).await?;
        if old.status != RendezvousStatus::Scheduled {
            return Err(OrchestratorError::Domain(
                domain::DomainError::PreconditionFailed(format!(
                    "only a scheduled rendezvous can be cancelled, this one is {}",
                    old.status
                )),
            ));
        }

        let mut cancelled = old.clone();
        cancelled.status = RendezvousStatus::Cancelled;
        self.retry
            .run(STEP_CANCEL_RENDEZVOUS, || {
                self.store.update_rendezvous(cancelled.clone())
            })
            .await
            .map_err(|e| OrchestratorError::step(STEP_CANCEL_RENDEZVOUS, e))?;
        audit::append(
            &self.store,
            HistoryEntry::new(
                old.sale_id,
                HistorySubject::Rendezvous(old.id),
                ChangeType::Cancelled,
                audit::snapshot(&old),
                audit::snapshot(&cancelled),
                self.clock.now(),
                self.actor,
            ),
        )
        .await;

        tracing::info!(rendezvous_id = %old.id, sale_id = %old.sale_id, "rendezvous cancelled");
        Ok(cancelled)
    }

    /// Returns the merged sale and rendezvous history of a sale, newest
    /// first.
    pub async fn history_for(&self, sale_id: SaleId) -> Result<Vec<HistoryEntry>> {
        let rendezvous = self
            .retry
            .run(STEP_LOAD_RENDEZVOUS, || {
                self.store.rendezvous_for_sale(sale_id)
            })
            .await
            .map_err(|e| OrchestratorError::step(STEP_LOAD_RENDEZVOUS, e))?;
        let ids: Vec<RendezvousId> = rendezvous.iter().map(|r| r.id).collect();

        let mut entries = self
            .retry
            .run(STEP_LOAD_HISTORY, || self.store.sale_history(sale_id))
            .await
            .map_err(|e| OrchestratorError::step(STEP_LOAD_HISTORY, e))?;
        let rendezvous_entries = self
            .retry
            .run(STEP_LOAD_HISTORY, || self.store.rendezvous_history(&ids))
            .await
            .map_err(|e| OrchestratorError::step(STEP_LOAD_HISTORY, e))?;
        entries.extend(rendezvous_entries);
        entries.sort_by(|a, b| b.changed_at.cmp(&a.changed_at));
        Ok(entries)
    }
}
