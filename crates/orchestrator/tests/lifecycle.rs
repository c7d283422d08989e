//! End-to-end lifecycle scenarios against the in-memory record store.

use chrono::{NaiveDate, NaiveTime, Utc};
use common::{ClientId, Money, SaleId, UserId};
use domain::{
    ChangeType, ConfirmationFields, Installment, InstallmentPlan, InventoryUnit, Payment,
    PaymentKind, PaymentMethod, Rendezvous, RendezvousStatus, Sale, SalePaymentType, SaleStatus,
    UnitKind, UnitStatus,
};
use orchestrator::{
    Capability, FixedClock, OrchestratorError, SagaExecutor, StaticPermissions,
};
use store::{
    InMemoryStore, InstallmentStore, PaymentStore, RendezvousStore, SaleStore, StoreError,
    UnitStore,
};

type Executor = SagaExecutor<InMemoryStore, StaticPermissions, FixedClock>;

fn executor(store: &InMemoryStore, permissions: StaticPermissions) -> Executor {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("orchestrator=debug")
        .with_test_writer()
        .try_init();
    SagaExecutor::new(
        store.clone(),
        permissions,
        FixedClock::at(Utc::now()),
        UserId::new(),
    )
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn time(h: u32, min: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, min, 0).unwrap()
}

fn plan() -> InstallmentPlan {
    InstallmentPlan {
        count: 3,
        monthly_amount: Money::from_cents(10_000),
        start_date: date(2025, 3, 1),
        end_date: date(2025, 5, 1),
    }
}

struct Fixture {
    store: InMemoryStore,
    sale_id: SaleId,
    unit_ids: Vec<common::UnitId>,
    client_id: ClientId,
}

impl Fixture {
    /// A pending sale with one reserved unit and its reservation deposit.
    async fn pending(payment_type: SalePaymentType) -> Self {
        let store = InMemoryStore::new();
        let client_id = ClientId::new();

        let mut unit = InventoryUnit::new(UnitKind::LandPiece);
        unit.status = UnitStatus::Reserved;
        unit.reserved_by = Some(client_id);
        let unit_ids = vec![unit.id];
        store.insert_unit(unit).await.unwrap();

        let sale = Sale::new(
            client_id,
            unit_ids.clone(),
            payment_type,
            Money::from_cents(1_000_000),
            Money::from_cents(5_000),
            UserId::new(),
        );
        let sale_id = sale.id;
        store.insert_sale(sale).await.unwrap();

        store
            .insert_payment(Payment::new(
                sale_id,
                client_id,
                Money::from_cents(5_000),
                PaymentKind::SmallAdvance,
                date(2025, 1, 10),
                PaymentMethod::Cash,
            ))
            .await
            .unwrap();

        store.clear_journal();
        Self {
            store,
            sale_id,
            unit_ids,
            client_id,
        }
    }

    /// A confirmed installment sale with a schedule, confirmation-stage
    /// payments and partial payment progress.
    async fn confirmed() -> Self {
        let fixture = Self::pending(SalePaymentType::Installment).await;
        let exec = executor(&fixture.store, StaticPermissions::none());
        exec.confirm_sale(
            fixture.sale_id,
            &ConfirmationFields {
                big_advance_amount: Some(Money::from_cents(100_000)),
                company_fee_amount: Some(Money::from_cents(30_000)),
                installment_plan: Some(plan()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        for n in 1..=3 {
            let mut i = Installment::new(
                fixture.sale_id,
                n,
                Money::from_cents(10_000),
                date(2025, 2 + n, 1),
            );
            if n == 1 {
                i.amount_paid = Money::from_cents(10_000);
            }
            fixture.store.insert_installment(i).await.unwrap();
        }
        for kind in [PaymentKind::BigAdvance, PaymentKind::CompanyFee] {
            fixture
                .store
                .insert_payment(Payment::new(
                    fixture.sale_id,
                    fixture.client_id,
                    Money::from_cents(30_000),
                    kind,
                    date(2025, 2, 1),
                    PaymentMethod::BankTransfer,
                ))
                .await
                .unwrap();
        }

        fixture.store.clear_journal();
        fixture
    }

    async fn sale(&self) -> Sale {
        self.store.get_sale(self.sale_id).await.unwrap().unwrap()
    }

    async fn unit_status(&self) -> UnitStatus {
        self.store
            .get_unit(self.unit_ids[0])
            .await
            .unwrap()
            .unwrap()
            .status
    }
}

#[tokio::test]
async fn test_confirm_full_sale_happy_path() {
    let fixture = Fixture::pending(SalePaymentType::Full).await;
    let exec = executor(&fixture.store, StaticPermissions::none());

    let outcome = exec
        .confirm_sale(
            fixture.sale_id,
            &ConfirmationFields {
                big_advance_amount: Some(Money::from_cents(100_000)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let sale = outcome.sale.unwrap();
    assert_eq!(sale.status, SaleStatus::Completed);
    assert!(sale.is_confirmed);
    assert!(sale.big_advance_confirmed);
    assert_eq!(fixture.unit_status().await, UnitStatus::Sold);

    let history = exec.get_history(fixture.sale_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].change_type, ChangeType::Confirmed);
}

#[tokio::test]
async fn test_confirm_rejected_from_completed_writes_nothing() {
    let fixture = Fixture::confirmed().await;
    let exec = executor(&fixture.store, StaticPermissions::none());

    let result = exec
        .confirm_sale(
            fixture.sale_id,
            &ConfirmationFields {
                installment_plan: Some(plan()),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(OrchestratorError::Domain(_))));
    // The guard fires before any dependent write is attempted.
    assert_eq!(fixture.store.attempts("sales.update"), 0);
    assert_eq!(fixture.store.attempts("units.update_status"), 0);
}

#[tokio::test]
async fn test_confirm_requires_reservation_deposit_on_ledger() {
    let fixture = Fixture::pending(SalePaymentType::Full).await;
    let payments = fixture
        .store
        .payments_for_sale(fixture.sale_id)
        .await
        .unwrap();
    let ids: Vec<_> = payments.iter().map(|p| p.id).collect();
    fixture.store.delete_payments_by_ids(&ids).await.unwrap();

    let exec = executor(&fixture.store, StaticPermissions::none());
    let result = exec
        .confirm_sale(
            fixture.sale_id,
            &ConfirmationFields {
                big_advance_amount: Some(Money::from_cents(100_000)),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(OrchestratorError::Domain(_))));
    assert_eq!(fixture.sale().await.status, SaleStatus::Pending);
}

#[tokio::test]
async fn test_confirm_missing_sale_is_not_found() {
    let store = InMemoryStore::new();
    let exec = executor(&store, StaticPermissions::none());
    let id = SaleId::new();

    let result = exec.confirm_sale(id, &ConfirmationFields::default()).await;
    assert!(matches!(
        result,
        Err(OrchestratorError::SaleNotFound(found)) if found == id
    ));
}

#[tokio::test]
async fn test_undo_requires_capability_and_checks_it_first() {
    let fixture = Fixture::confirmed().await;
    let exec = executor(&fixture.store, StaticPermissions::none());

    let result = exec.undo_sale(fixture.sale_id).await;

    assert!(matches!(
        result,
        Err(OrchestratorError::PermissionDenied(Capability::UndoSale))
    ));
    // Denied before a single store call.
    assert!(fixture.store.journal().is_empty());
}

#[tokio::test]
async fn test_undo_rejected_on_pending_sale() {
    let fixture = Fixture::pending(SalePaymentType::Full).await;
    let exec = executor(&fixture.store, StaticPermissions::allow_all());

    let result = exec.undo_sale(fixture.sale_id).await;
    assert!(matches!(result, Err(OrchestratorError::Domain(_))));
}

#[tokio::test]
async fn test_undo_deletes_all_payments_and_clears_schedule() {
    let fixture = Fixture::confirmed().await;
    let exec = executor(&fixture.store, StaticPermissions::allow_all());

    let outcome = exec.undo_sale(fixture.sale_id).await.unwrap();

    let sale = outcome.sale.unwrap();
    assert_eq!(sale.status, SaleStatus::Pending);
    assert!(!sale.is_confirmed);
    assert!(sale.big_advance_amount.is_zero());
    // Undo removes every payment, the reservation deposit included; the sale
    // row still records the deposit amount.
    assert_eq!(sale.small_advance_amount.cents(), 5_000);
    assert!(
        fixture
            .store
            .payments_for_sale(fixture.sale_id)
            .await
            .unwrap()
            .is_empty()
    );

    let installments = fixture
        .store
        .installments_for_sale(fixture.sale_id)
        .await
        .unwrap();
    assert_eq!(installments.len(), 3);
    assert!(installments.iter().all(|i| i.is_cleared()));

    assert_eq!(fixture.unit_status().await, UnitStatus::Reserved);
}

#[tokio::test]
async fn test_reset_to_confirmation_preserves_deposit_and_refunds() {
    let fixture = Fixture::confirmed().await;
    fixture
        .store
        .insert_payment(Payment::new(
            fixture.sale_id,
            fixture.client_id,
            Money::from_cents(2_000),
            PaymentKind::Refund,
            date(2025, 2, 20),
            PaymentMethod::Cash,
        ))
        .await
        .unwrap();

    let exec = executor(&fixture.store, StaticPermissions::none());
    let outcome = exec.reset_to_confirmation(fixture.sale_id).await.unwrap();

    let sale = outcome.sale.unwrap();
    assert_eq!(sale.status, SaleStatus::Pending);
    assert!(sale.installment_plan.is_none());
    assert_eq!(sale.small_advance_amount.cents(), 5_000);

    let kept = fixture
        .store
        .payments_for_sale(fixture.sale_id)
        .await
        .unwrap();
    assert_eq!(kept.len(), 2);
    assert!(kept.iter().all(|p| p.is_preserved_on_reset()));

    assert!(
        fixture
            .store
            .installments_for_sale(fixture.sale_id)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(fixture.unit_status().await, UnitStatus::Reserved);
}

#[tokio::test]
async fn test_reset_to_confirmation_on_never_completed_pending_sale() {
    // A pending installment sale that was never confirmed: undo is rejected,
    // but reset-to-confirmation still clears the schedule and keeps the
    // reservation deposit.
    let fixture = Fixture::pending(SalePaymentType::Installment).await;
    for n in 1..=3u32 {
        fixture
            .store
            .insert_installment(Installment::new(
                fixture.sale_id,
                n,
                Money::from_cents(10_000),
                date(2025, 2 + n, 1),
            ))
            .await
            .unwrap();
    }

    let exec = executor(&fixture.store, StaticPermissions::allow_all());
    let undo = exec.undo_sale(fixture.sale_id).await;
    assert!(matches!(undo, Err(OrchestratorError::Domain(_))));

    exec.reset_to_confirmation(fixture.sale_id).await.unwrap();

    let kept = fixture
        .store
        .payments_for_sale(fixture.sale_id)
        .await
        .unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].kind, PaymentKind::SmallAdvance);
    assert_eq!(kept[0].amount_paid.cents(), 5_000);
    assert!(
        fixture
            .store
            .installments_for_sale(fixture.sale_id)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(fixture.unit_status().await, UnitStatus::Reserved);
}

#[tokio::test]
async fn test_reset_installments_is_idempotent() {
    let fixture = Fixture::confirmed().await;
    let exec = executor(&fixture.store, StaticPermissions::none());

    exec.reset_installments(fixture.sale_id).await.unwrap();
    let after_first = fixture
        .store
        .installments_for_sale(fixture.sale_id)
        .await
        .unwrap();
    assert!(after_first.iter().all(|i| i.is_cleared()));

    exec.reset_installments(fixture.sale_id).await.unwrap();
    let after_second = fixture
        .store
        .installments_for_sale(fixture.sale_id)
        .await
        .unwrap();
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn test_delete_sale_orders_writes_money_first_inventory_last() {
    let fixture = Fixture::confirmed().await;
    fixture
        .store
        .insert_rendezvous(Rendezvous::new(
            fixture.sale_id,
            date(2025, 4, 10),
            time(14, 30),
        ))
        .await
        .unwrap();
    fixture.store.clear_journal();

    let exec = executor(&fixture.store, StaticPermissions::allow_all());
    let outcome = exec.delete_sale(fixture.sale_id).await.unwrap();
    assert!(outcome.sale.is_none());

    assert!(
        fixture
            .store
            .get_sale(fixture.sale_id)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        fixture
            .store
            .rendezvous_for_sale(fixture.sale_id)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(fixture.unit_status().await, UnitStatus::Available);

    let journal = fixture.store.journal();
    let position = |op: &str| journal.iter().position(|e| e == op).unwrap();
    assert!(position("payments.delete") < position("installments.delete_by_sale"));
    assert!(position("installments.delete_by_sale") < position("rendezvous.delete_by_sale"));
    assert!(position("rendezvous.delete_by_sale") < position("sales.delete"));
    assert!(position("sales.delete") < position("units.update_status"));
}

#[tokio::test]
async fn test_delete_sale_proceeds_when_verification_read_is_denied() {
    let fixture = Fixture::confirmed().await;
    // The post-delete verification read on installments is blocked by access
    // policy; the committed delete is trusted.
    fixture
        .store
        .fail_next("installments.select", StoreError::AccessDenied);

    let exec = executor(&fixture.store, StaticPermissions::allow_all());
    exec.delete_sale(fixture.sale_id).await.unwrap();

    assert!(
        fixture
            .store
            .get_sale(fixture.sale_id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_delete_sale_requires_capability() {
    let fixture = Fixture::confirmed().await;
    let exec = executor(
        &fixture.store,
        StaticPermissions::none().grant(Capability::UndoSale),
    );

    let result = exec.delete_sale(fixture.sale_id).await;
    assert!(matches!(
        result,
        Err(OrchestratorError::PermissionDenied(Capability::DeleteSale))
    ));
    assert!(fixture.store.journal().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_sale_write_retries_five_times_with_linear_backoff() {
    let fixture = Fixture::pending(SalePaymentType::Full).await;
    fixture.store.fail_times(
        "sales.update",
        StoreError::Transient("timeout".into()),
        5,
    );

    let exec = executor(&fixture.store, StaticPermissions::none());
    let started = tokio::time::Instant::now();
    let result = exec
        .confirm_sale(
            fixture.sale_id,
            &ConfirmationFields {
                big_advance_amount: Some(Money::from_cents(100_000)),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(OrchestratorError::StepFailed { step: "write_sale", .. })
    ));
    assert_eq!(fixture.store.attempts("sales.update"), 5);
    // 1s + 2s + 3s + 4s + 5s of backoff.
    assert_eq!(started.elapsed(), std::time::Duration::from_secs(15));
    assert_eq!(fixture.sale().await.status, SaleStatus::Pending);
}

#[tokio::test(start_paused = true)]
async fn test_sale_write_recovers_within_the_retry_budget() {
    let fixture = Fixture::pending(SalePaymentType::Full).await;
    fixture.store.fail_times(
        "sales.update",
        StoreError::Transient("timeout".into()),
        2,
    );

    let exec = executor(&fixture.store, StaticPermissions::none());
    exec.confirm_sale(
        fixture.sale_id,
        &ConfirmationFields {
            big_advance_amount: Some(Money::from_cents(100_000)),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(fixture.store.attempts("sales.update"), 3);
    assert_eq!(fixture.sale().await.status, SaleStatus::Completed);
}

#[tokio::test]
async fn test_constraint_violation_aborts_undo_without_rollback() {
    let fixture = Fixture::confirmed().await;
    // The chunk delete and every per-row fallback fail hard.
    fixture.store.fail_times(
        "payments.delete",
        StoreError::ConstraintViolation("fk".into()),
        4,
    );

    let exec = executor(&fixture.store, StaticPermissions::allow_all());
    let result = exec.undo_sale(fixture.sale_id).await;

    assert!(matches!(
        result,
        Err(OrchestratorError::StepFailed { step: "delete_payments", .. })
    ));
    // The sale row was never touched; the schedule reset that ran before the
    // failure is not rolled back.
    let sale = fixture.sale().await;
    assert_eq!(sale.status, SaleStatus::Completed);
    assert_eq!(fixture.store.attempts("sales.update"), 0);
}

#[tokio::test]
async fn test_reschedule_chain_keeps_one_scheduled_record() {
    let fixture = Fixture::pending(SalePaymentType::Full).await;
    let first = Rendezvous::new(fixture.sale_id, date(2025, 4, 10), time(14, 30));
    let first_id = first.id;
    fixture.store.insert_rendezvous(first).await.unwrap();

    let exec = executor(&fixture.store, StaticPermissions::none());
    let second = exec
        .reschedule_rendezvous(first_id, date(2025, 4, 17), time(9, 0))
        .await
        .unwrap()
        .rendezvous
        .unwrap();
    let third = exec
        .reschedule_rendezvous(second.id, date(2025, 4, 24), time(11, 0))
        .await
        .unwrap()
        .rendezvous
        .unwrap();

    assert_eq!(second.rescheduled_from, Some(first_id));
    assert_eq!(third.rescheduled_from, Some(second.id));

    let all = fixture
        .store
        .rendezvous_for_sale(fixture.sale_id)
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
    let scheduled: Vec<_> = all
        .iter()
        .filter(|r| r.status == RendezvousStatus::Scheduled)
        .collect();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].id, third.id);
}

#[tokio::test]
async fn test_cancel_rendezvous_cancels_the_sale() {
    let fixture = Fixture::pending(SalePaymentType::Full).await;
    let rendezvous = Rendezvous::new(fixture.sale_id, date(2025, 4, 10), time(14, 30));
    let rendezvous_id = rendezvous.id;
    fixture.store.insert_rendezvous(rendezvous).await.unwrap();

    let exec = executor(&fixture.store, StaticPermissions::none());
    let outcome = exec.cancel_rendezvous(rendezvous_id).await.unwrap();

    assert_eq!(
        outcome.rendezvous.unwrap().status,
        RendezvousStatus::Cancelled
    );
    assert_eq!(outcome.sale.unwrap().status, SaleStatus::Cancelled);
    assert_eq!(fixture.sale().await.status, SaleStatus::Cancelled);
    // Cancellation writes no unit status; the units keep their reservation
    // until an explicit follow-up frees them.
    assert_eq!(fixture.unit_status().await, UnitStatus::Reserved);
}

#[tokio::test]
async fn test_cancel_rendezvous_rejected_when_sale_already_cancelled() {
    let fixture = Fixture::pending(SalePaymentType::Full).await;
    let mut sale = fixture.sale().await;
    sale.status = SaleStatus::Cancelled;
    fixture.store.update_sale(sale).await.unwrap();

    let rendezvous = Rendezvous::new(fixture.sale_id, date(2025, 4, 10), time(14, 30));
    let rendezvous_id = rendezvous.id;
    fixture.store.insert_rendezvous(rendezvous).await.unwrap();

    let exec = executor(&fixture.store, StaticPermissions::none());
    let result = exec.cancel_rendezvous(rendezvous_id).await;

    assert!(matches!(result, Err(OrchestratorError::Domain(_))));
    // The guard is checked before the rendezvous row is touched.
    let rendezvous = fixture
        .store
        .get_rendezvous(rendezvous_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rendezvous.status, RendezvousStatus::Scheduled);
}

#[tokio::test]
async fn test_history_merges_sale_and_rendezvous_timelines() {
    let fixture = Fixture::pending(SalePaymentType::Full).await;
    let rendezvous = Rendezvous::new(fixture.sale_id, date(2025, 4, 10), time(14, 30));
    let rendezvous_id = rendezvous.id;
    fixture.store.insert_rendezvous(rendezvous).await.unwrap();

    let clock = FixedClock::at(Utc::now());
    let exec: Executor = SagaExecutor::new(
        fixture.store.clone(),
        StaticPermissions::none(),
        clock.clone(),
        UserId::new(),
    );

    exec.confirm_sale(
        fixture.sale_id,
        &ConfirmationFields {
            big_advance_amount: Some(Money::from_cents(100_000)),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    clock.advance(chrono::Duration::hours(1));
    exec.reschedule_rendezvous(rendezvous_id, date(2025, 4, 17), time(9, 0))
        .await
        .unwrap();

    let history = exec.get_history(fixture.sale_id).await.unwrap();
    // One sale confirmation plus the two reschedule entries.
    assert_eq!(history.len(), 3);
    assert!(
        history
            .windows(2)
            .all(|w| w[0].changed_at >= w[1].changed_at)
    );
    assert_eq!(history.last().unwrap().change_type, ChangeType::Confirmed);
}
