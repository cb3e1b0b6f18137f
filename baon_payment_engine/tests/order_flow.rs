//! Integration tests for the order processing engine: idempotency, stock and balance conservation,
//! compensation, and the payment lifecycle transitions.
mod common;

use baon_payment_engine::{
    db_types::{Centavos, OrderStatus, PaymentMethod, PaymentStatus, SettlementStatus},
    order_objects::{OrderOutcome, Requester},
    traits::{AccountManagement, PaymentEngineDatabase, PaymentEngineError},
    OrderFlowApi,
};
use chrono::{Duration, Utc};
use common::*;

#[tokio::test]
async fn happy_path_cash_order() {
    let (db, api) = setup().await;
    let student = seed_student(&db, "Ana Santos").await;
    let adobo = seed_product(&db, "Adobo", 65, 10).await;

    let order = one_line_order("cash-1", student, adobo.id, 1, PaymentMethod::Cash);
    let before = Utc::now();
    let outcome = api.process_order(order).await.expect("Order should commit");
    let confirmation = match outcome {
        OrderOutcome::Created(c) => c,
        OrderOutcome::Duplicate(_) => panic!("A fresh key must not replay"),
    };
    assert_eq!(confirmation.status, OrderStatus::AwaitingPayment);
    assert_eq!(confirmation.payment_status, PaymentStatus::AwaitingPayment);
    assert_eq!(confirmation.total_amount, Centavos::from_pesos(65));
    let due = confirmation.payment_due_at.expect("Cash orders carry a payment deadline");
    assert!(due >= before + Duration::minutes(14) && due <= Utc::now() + Duration::minutes(16));
    assert_eq!(stock_of(&db, adobo.id).await, 9);

    // Staff confirms at the counter.
    let paid = api.confirm_cash_payment(confirmation.order_id, Utc::now()).await.expect("Confirmation should land");
    assert_eq!(paid.status, OrderStatus::Pending);
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    let entries = db.ledger_entries_for_order(confirmation.order_id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].settlement, SettlementStatus::Completed);
}

#[tokio::test]
async fn instant_methods_settle_at_checkout() {
    let (db, api) = setup().await;
    let student = seed_student(&db, "Ana Santos").await;
    let siopao = seed_product(&db, "Siopao", 30, 5).await;

    let order = one_line_order("gcash-1", student, siopao.id, 2, PaymentMethod::GCash);
    let confirmation = api.process_order(order).await.unwrap().confirmation().clone();
    assert_eq!(confirmation.status, OrderStatus::Pending);
    assert_eq!(confirmation.payment_status, PaymentStatus::Paid);
    assert!(confirmation.payment_due_at.is_none());
    let entries = db.ledger_entries_for_order(confirmation.order_id).await.unwrap();
    assert_eq!(entries[0].settlement, SettlementStatus::Completed);
}

#[tokio::test]
async fn duplicate_submission_resolves_to_original() {
    let (db, api) = setup().await;
    let student = seed_student(&db, "Ana Santos").await;
    let adobo = seed_product(&db, "Adobo", 65, 10).await;

    let first = api
        .process_order(one_line_order("dup-1", student, adobo.id, 1, PaymentMethod::Cash))
        .await
        .unwrap()
        .confirmation()
        .clone();
    let second = api.process_order(one_line_order("dup-1", student, adobo.id, 1, PaymentMethod::Cash)).await.unwrap();
    assert!(second.is_duplicate());
    assert_eq!(second.confirmation().order_id, first.order_id);
    assert_eq!(second.confirmation().status, first.status);
    // Exactly one order was persisted and the stock moved exactly once.
    assert_eq!(db.fetch_orders_for_parent(PARENT).await.unwrap().len(), 1);
    assert_eq!(stock_of(&db, adobo.id).await, 9);
}

#[tokio::test]
async fn concurrent_duplicate_submissions_persist_one_order() {
    let (db, api) = setup().await;
    let student = seed_student(&db, "Ana Santos").await;
    let adobo = seed_product(&db, "Adobo", 65, 10).await;

    let a = api.process_order(one_line_order("race-1", student, adobo.id, 1, PaymentMethod::Cash));
    let b = api.process_order(one_line_order("race-1", student, adobo.id, 1, PaymentMethod::Cash));
    let (a, b) = tokio::join!(a, b);
    let a = a.expect("Submission A should resolve");
    let b = b.expect("Submission B should resolve");
    assert_eq!(a.confirmation().order_id, b.confirmation().order_id);
    assert_eq!(db.fetch_orders_for_parent(PARENT).await.unwrap().len(), 1);
    assert_eq!(stock_of(&db, adobo.id).await, 9);
}

#[tokio::test]
async fn oversell_attempt_leaves_stock_at_zero() {
    let (db, api) = setup().await;
    let student = seed_student(&db, "Ana Santos").await;
    let other = db.insert_student("Ben Santos").await.unwrap();
    db.link_student(PARENT, other.id).await.unwrap();
    let last_turon = seed_product(&db, "Turon", 15, 1).await;
    db.upsert_wallet(PARENT, Centavos::from_pesos(1000)).await.unwrap();

    let a = api.process_order(one_line_order("sell-a", student, last_turon.id, 1, PaymentMethod::Balance));
    let b = api.process_order(one_line_order("sell-b", other.id, last_turon.id, 1, PaymentMethod::Balance));
    let (a, b) = tokio::join!(a, b);
    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one of the two checkouts may win the last unit");
    let failure = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert!(
        matches!(failure, PaymentEngineError::InsufficientStock { available: 0, .. }),
        "loser should see the post-race availability: {failure}"
    );
    assert_eq!(stock_of(&db, last_turon.id).await, 0);
}

#[tokio::test]
async fn balance_race_commits_exactly_once_and_restores_stock() {
    let (db, api) = setup().await;
    let student = seed_student(&db, "Ana Santos").await;
    let sibling = db.insert_student("Ben Santos").await.unwrap();
    db.link_student(PARENT, sibling.id).await.unwrap();
    let lunch = seed_product(&db, "Silog meal", 80, 5).await;
    db.upsert_wallet(PARENT, Centavos::from_pesos(100)).await.unwrap();

    // Two checkouts of ₱80 each against a ₱100 wallet: only one can fund.
    let a = api.process_order(one_line_order("bal-a", student, lunch.id, 1, PaymentMethod::Balance));
    let b = api.process_order(one_line_order("bal-b", sibling.id, lunch.id, 1, PaymentMethod::Balance));
    let (a, b) = tokio::join!(a, b);
    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one order may spend the balance");
    let failure = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert!(
        matches!(failure, PaymentEngineError::WalletConflict | PaymentEngineError::InsufficientBalance { .. }),
        "loser must surface a funds failure, not commit: {failure}"
    );
    assert_eq!(balance_of(&db, PARENT).await, Centavos::from_pesos(20));
    // Compensation completeness: the loser's reservation was fully returned.
    assert_eq!(stock_of(&db, lunch.id).await, 4);
    assert_eq!(db.fetch_orders_for_parent(PARENT).await.unwrap().len(), 1);
}

#[tokio::test]
async fn stale_balance_observation_loses_the_cas() {
    let (db, _api) = setup().await;
    db.upsert_wallet(PARENT, Centavos::from_pesos(100)).await.unwrap();
    // An observation that no longer matches the stored balance must not debit.
    let debited = db
        .debit_wallet_if_unchanged(PARENT, Centavos::from_pesos(90), Centavos::from_pesos(80))
        .await
        .unwrap();
    assert!(!debited);
    assert_eq!(balance_of(&db, PARENT).await, Centavos::from_pesos(100));
}

#[tokio::test]
async fn ownership_is_checked_before_anything_else() {
    let (db, api) = setup().await;
    let unlinked = db.insert_student("Stranger Kid").await.unwrap();
    let adobo = seed_product(&db, "Adobo", 65, 10).await;

    let err = api
        .process_order(one_line_order("own-1", unlinked.id, adobo.id, 1, PaymentMethod::Cash))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentEngineError::StudentNotLinked { .. }));
    assert_eq!(stock_of(&db, adobo.id).await, 10);
}

#[tokio::test]
async fn validation_and_stock_preconditions() {
    let (db, api) = setup().await;
    let student = seed_student(&db, "Ana Santos").await;
    let adobo = seed_product(&db, "Adobo", 65, 2).await;
    let off_menu = db.insert_product("Halo-halo", Centavos::from_pesos(45), 10, false).await.unwrap();

    let mut empty = one_line_order("v-1", student, adobo.id, 1, PaymentMethod::Cash);
    empty.lines.clear();
    assert!(matches!(api.process_order(empty).await.unwrap_err(), PaymentEngineError::EmptyOrder));

    let zero_qty = one_line_order("v-2", student, adobo.id, 0, PaymentMethod::Cash);
    assert!(matches!(api.process_order(zero_qty).await.unwrap_err(), PaymentEngineError::InvalidQuantity));

    let missing = one_line_order("v-3", student, 9999, 1, PaymentMethod::Cash);
    assert!(matches!(api.process_order(missing).await.unwrap_err(), PaymentEngineError::ProductNotFound(9999)));

    let unavailable = one_line_order("v-4", student, off_menu.id, 1, PaymentMethod::Cash);
    assert!(matches!(api.process_order(unavailable).await.unwrap_err(), PaymentEngineError::ProductUnavailable(_)));

    let err = api.process_order(one_line_order("v-5", student, adobo.id, 3, PaymentMethod::Cash)).await.unwrap_err();
    match err {
        PaymentEngineError::InsufficientStock { product_id, requested, available } => {
            assert_eq!((product_id, requested, available), (adobo.id, 3, 2));
        },
        e => panic!("Expected InsufficientStock, got {e}"),
    }
}

#[tokio::test]
async fn balance_preconditions_surface_the_shortfall() {
    let (db, api) = setup().await;
    let student = seed_student(&db, "Ana Santos").await;
    let adobo = seed_product(&db, "Adobo", 65, 10).await;

    let err = api.process_order(one_line_order("w-1", student, adobo.id, 1, PaymentMethod::Balance)).await.unwrap_err();
    assert!(matches!(err, PaymentEngineError::NoWallet(_)));

    db.upsert_wallet(PARENT, Centavos::from_pesos(50)).await.unwrap();
    let err = api.process_order(one_line_order("w-2", student, adobo.id, 1, PaymentMethod::Balance)).await.unwrap_err();
    match err {
        PaymentEngineError::InsufficientBalance { required, available } => {
            assert_eq!(required, Centavos::from_pesos(65));
            assert_eq!(available, Centavos::from_pesos(50));
        },
        e => panic!("Expected InsufficientBalance, got {e}"),
    }
    assert_eq!(stock_of(&db, adobo.id).await, 10);
}

#[tokio::test]
async fn lines_are_repriced_from_the_catalog() {
    let (db, api) = setup().await;
    let student = seed_student(&db, "Ana Santos").await;
    let adobo = seed_product(&db, "Adobo", 65, 10).await;

    let mut order = one_line_order("price-1", student, adobo.id, 2, PaymentMethod::Cash);
    order.lines[0].price_at_order = Centavos::from_pesos(1); // client-side tampering
    let confirmation = api.process_order(order).await.unwrap().confirmation().clone();
    assert_eq!(confirmation.total_amount, Centavos::from_pesos(130));
    let items = db.fetch_order_items(confirmation.order_id).await.unwrap();
    assert_eq!(items[0].unit_price, Centavos::from_pesos(65));
}

#[tokio::test]
async fn sweep_cancels_expired_cash_orders_and_restores_stock() {
    let (db, api) = setup().await;
    let student = seed_student(&db, "Ana Santos").await;
    let adobo = seed_product(&db, "Adobo", 65, 10).await;
    // A payment window in the past makes the order expire the moment it is created.
    let expiring_api =
        OrderFlowApi::new(db.clone(), Default::default()).with_cash_payment_window(Duration::seconds(-1));

    let confirmation = expiring_api
        .process_order(one_line_order("sweep-1", student, adobo.id, 2, PaymentMethod::Cash))
        .await
        .unwrap()
        .confirmation()
        .clone();
    assert_eq!(stock_of(&db, adobo.id).await, 8);

    let result = api.sweep_unpaid_orders(Utc::now()).await.unwrap();
    assert_eq!(result.count(), 1);
    let swept = &result.cancelled[0];
    assert_eq!(swept.id, confirmation.order_id);
    assert_eq!(swept.status, OrderStatus::Cancelled);
    assert_eq!(swept.payment_status, PaymentStatus::Timeout);
    assert_eq!(stock_of(&db, adobo.id).await, 10);
    let entries = db.ledger_entries_for_order(swept.id).await.unwrap();
    assert_eq!(entries[0].settlement, SettlementStatus::Cancelled);

    // A late-arriving counter confirmation must lose to the sweep.
    let err = api.confirm_cash_payment(swept.id, Utc::now()).await.unwrap_err();
    assert!(matches!(err, PaymentEngineError::PaymentDeadlinePassed(_)));
}

#[tokio::test]
async fn cancelled_orders_are_never_swept_again() {
    let (db, api) = setup().await;
    let student = seed_student(&db, "Ana Santos").await;
    let adobo = seed_product(&db, "Adobo", 65, 10).await;
    let expiring_api =
        OrderFlowApi::new(db.clone(), Default::default()).with_cash_payment_window(Duration::seconds(-1));

    let confirmation = expiring_api
        .process_order(one_line_order("dbl-1", student, adobo.id, 2, PaymentMethod::Cash))
        .await
        .unwrap()
        .confirmation()
        .clone();
    // Parent cancels the expired-but-unswept order; its stock comes back here, once.
    api.cancel_order(confirmation.order_id, &Requester::Parent(PARENT.to_string())).await.unwrap();
    assert_eq!(stock_of(&db, adobo.id).await, 10);

    // The sweep must not match the cancelled order and restore the same stock a second time.
    let result = api.sweep_unpaid_orders(Utc::now()).await.unwrap();
    assert!(result.is_empty());
    assert_eq!(stock_of(&db, adobo.id).await, 10);
}

#[tokio::test]
async fn confirmed_orders_are_never_swept() {
    let (db, api) = setup().await;
    let student = seed_student(&db, "Ana Santos").await;
    let adobo = seed_product(&db, "Adobo", 65, 10).await;

    let confirmation = api
        .process_order(one_line_order("keep-1", student, adobo.id, 1, PaymentMethod::Cash))
        .await
        .unwrap()
        .confirmation()
        .clone();
    api.confirm_cash_payment(confirmation.order_id, Utc::now()).await.unwrap();

    // Even a sweep dated far in the future finds nothing: the order is paid.
    let result = api.sweep_unpaid_orders(Utc::now() + Duration::days(1)).await.unwrap();
    assert!(result.is_empty());
    assert_eq!(stock_of(&db, adobo.id).await, 9);
}

#[tokio::test]
async fn confirmation_state_machine_rejections() {
    let (db, api) = setup().await;
    let student = seed_student(&db, "Ana Santos").await;
    let adobo = seed_product(&db, "Adobo", 65, 10).await;
    db.upsert_wallet(PARENT, Centavos::from_pesos(500)).await.unwrap();

    assert!(matches!(
        api.confirm_cash_payment(404, Utc::now()).await.unwrap_err(),
        PaymentEngineError::OrderNotFound(404)
    ));

    let balance_order = api
        .process_order(one_line_order("sm-1", student, adobo.id, 1, PaymentMethod::Balance))
        .await
        .unwrap()
        .confirmation()
        .clone();
    assert!(matches!(
        api.confirm_cash_payment(balance_order.order_id, Utc::now()).await.unwrap_err(),
        PaymentEngineError::NotACashOrder(_)
    ));

    let cash_order = api
        .process_order(one_line_order("sm-2", student, adobo.id, 1, PaymentMethod::Cash))
        .await
        .unwrap()
        .confirmation()
        .clone();
    api.confirm_cash_payment(cash_order.order_id, Utc::now()).await.unwrap();
    assert!(matches!(
        api.confirm_cash_payment(cash_order.order_id, Utc::now()).await.unwrap_err(),
        PaymentEngineError::AlreadyPaid(_)
    ));

    // One second is enough to miss the deadline; the guard compares timestamps, not sweep passes.
    let expired = OrderFlowApi::new(db.clone(), Default::default())
        .with_cash_payment_window(Duration::seconds(-1))
        .process_order(one_line_order("sm-3", student, adobo.id, 1, PaymentMethod::Cash))
        .await
        .unwrap()
        .confirmation()
        .clone();
    assert!(matches!(
        api.confirm_cash_payment(expired.order_id, Utc::now()).await.unwrap_err(),
        PaymentEngineError::PaymentDeadlinePassed(_)
    ));
}

#[tokio::test]
async fn cancelling_a_paid_balance_order_refunds_the_wallet() {
    let (db, api) = setup().await;
    let student = seed_student(&db, "Ana Santos").await;
    let adobo = seed_product(&db, "Adobo", 65, 10).await;
    db.upsert_wallet(PARENT, Centavos::from_pesos(100)).await.unwrap();

    let confirmation = api
        .process_order(one_line_order("rf-1", student, adobo.id, 1, PaymentMethod::Balance))
        .await
        .unwrap()
        .confirmation()
        .clone();
    assert_eq!(balance_of(&db, PARENT).await, Centavos::from_pesos(35));

    let outcome =
        api.cancel_order(confirmation.order_id, &Requester::Parent(PARENT.to_string())).await.unwrap();
    assert_eq!(outcome.order.status, OrderStatus::Cancelled);
    assert_eq!(outcome.order.payment_status, PaymentStatus::Refunded);
    assert_eq!(outcome.refunded, Some(Centavos::from_pesos(65)));
    assert_eq!(balance_of(&db, PARENT).await, Centavos::from_pesos(100));
    assert_eq!(stock_of(&db, adobo.id).await, 10);
    let entries = db.ledger_entries_for_order(confirmation.order_id).await.unwrap();
    assert_eq!(entries[0].settlement, SettlementStatus::Refunded);
}

#[tokio::test]
async fn cancelling_an_unpaid_cash_order_releases_stock_without_refund() {
    let (db, api) = setup().await;
    let student = seed_student(&db, "Ana Santos").await;
    let adobo = seed_product(&db, "Adobo", 65, 10).await;

    let confirmation = api
        .process_order(one_line_order("rf-2", student, adobo.id, 3, PaymentMethod::Cash))
        .await
        .unwrap()
        .confirmation()
        .clone();
    let outcome = api.cancel_order(confirmation.order_id, &Requester::Staff).await.unwrap();
    assert_eq!(outcome.order.status, OrderStatus::Cancelled);
    assert_eq!(outcome.refunded, None);
    assert_eq!(stock_of(&db, adobo.id).await, 10);
    let entries = db.ledger_entries_for_order(confirmation.order_id).await.unwrap();
    assert_eq!(entries[0].settlement, SettlementStatus::Cancelled);
}

#[tokio::test]
async fn cancellation_is_rejected_once_preparation_started() {
    let (db, api) = setup().await;
    let student = seed_student(&db, "Ana Santos").await;
    let adobo = seed_product(&db, "Adobo", 65, 10).await;

    let confirmation = api
        .process_order(one_line_order("prep-1", student, adobo.id, 1, PaymentMethod::GCash))
        .await
        .unwrap()
        .confirmation()
        .clone();
    // Kitchen picks the order up (kitchen status flow is out of engine scope, so poke the row directly).
    sqlx::query("UPDATE orders SET status = 'preparing' WHERE id = $1")
        .bind(confirmation.order_id)
        .execute(db.pool())
        .await
        .unwrap();

    let err = api.cancel_order(confirmation.order_id, &Requester::Staff).await.unwrap_err();
    assert!(matches!(err, PaymentEngineError::OrderNotCancellable { status: OrderStatus::Preparing }));
    // The guard held: no stock came back.
    assert_eq!(stock_of(&db, adobo.id).await, 9);
}

#[tokio::test]
async fn parents_cannot_cancel_other_parents_orders() {
    let (db, api) = setup().await;
    let student = seed_student(&db, "Ana Santos").await;
    let adobo = seed_product(&db, "Adobo", 65, 10).await;

    let confirmation = api
        .process_order(one_line_order("own-2", student, adobo.id, 1, PaymentMethod::Cash))
        .await
        .unwrap()
        .confirmation()
        .clone();
    let err = api
        .cancel_order(confirmation.order_id, &Requester::Parent(OTHER_PARENT.to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentEngineError::NotOrderOwner(_)));
}
