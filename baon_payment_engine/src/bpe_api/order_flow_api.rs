use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;

use crate::{
    db_types::{
        Centavos,
        NewOrder,
        Order,
        OrderStatus,
        PaymentMethod,
        PaymentStatus,
        PricedLine,
        SettlementStatus,
    },
    events::{CancellationReason, EventProducers, OrderCancelledEvent, OrderCreatedEvent, OrderPaidEvent},
    order_objects::{CancellationOutcome, OrderConfirmation, OrderOutcome, Requester},
    traits::{AccountManagement, PaymentEngineDatabase, PaymentEngineError, SweepResult},
};

/// How long a cash order reserves its stock before the sweep releases it.
pub const DEFAULT_CASH_PAYMENT_WINDOW: Duration = Duration::minutes(15);

/// `OrderFlowApi` is the order processing engine: it accepts order submissions, validates stock and funds,
/// commits each order exactly once, and drives orders through the payment lifecycle.
///
/// The commit is a saga over individually-reversible steps (stock decrements → order insert → wallet debit),
/// with explicit compensation when a later step loses its optimistic-concurrency race. The engine never retries
/// internally; retry decisions belong to the checkout orchestrator or the human caller.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
    cash_payment_window: Duration,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, cash_payment_window: DEFAULT_CASH_PAYMENT_WINDOW }
    }

    /// Overrides the cash payment deadline window (default 15 minutes).
    pub fn with_cash_payment_window(mut self, window: Duration) -> Self {
        self.cash_payment_window = window;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: PaymentEngineDatabase
{
    /// Submit an order to the engine.
    ///
    /// Preconditions are checked in a fixed sequence, each with its own error kind:
    /// 1. The request is well-formed and the parent is linked to the student.
    /// 2. The idempotency key is fresh — a known key returns the existing order as [`OrderOutcome::Duplicate`],
    ///    which is a success, not an error.
    /// 3. Every product exists, is available, and holds enough stock. Lines are re-priced from the catalog here;
    ///    the submitted `price_at_order` is not trusted.
    /// 4. For balance payment, the wallet covers the total. The observed balance feeds the compare-and-swap in
    ///    the commit phase.
    ///
    /// The commit then proceeds stepwise: conditional stock decrements, order + items insert, conditional wallet
    /// debit, ledger append. A lost stock race aborts with the stock of earlier lines restored; a lost wallet
    /// race rolls back stock *and* the inserted order before returning [`PaymentEngineError::WalletConflict`].
    pub async fn process_order(&self, order: NewOrder) -> Result<OrderOutcome, PaymentEngineError> {
        // -- 1. validation & ownership
        if order.lines.is_empty() {
            return Err(PaymentEngineError::EmptyOrder);
        }
        if order.lines.iter().any(|l| l.quantity < 1) {
            return Err(PaymentEngineError::InvalidQuantity);
        }
        if !self.db.owns_student(&order.parent_id, order.student_id).await? {
            warn!(
                "🔐️ Parent {} tried to order for student {} without a link. Rejecting.",
                order.parent_id, order.student_id
            );
            return Err(PaymentEngineError::StudentNotLinked {
                parent_id: order.parent_id.clone(),
                student_id: order.student_id,
            });
        }
        // -- 2. idempotent replay
        if let Some(existing) = self.db.fetch_order_by_client_id(&order.client_order_id).await? {
            debug!("🍱️ Order {} replayed; resolving to existing order {}", order.client_order_id, existing.id);
            return Ok(OrderOutcome::Duplicate(OrderConfirmation::from(&existing)));
        }
        // -- 3. stock validation + re-pricing
        let mut priced = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let product = self
                .db
                .fetch_product(line.product_id)
                .await?
                .ok_or(PaymentEngineError::ProductNotFound(line.product_id))?;
            if !product.available {
                return Err(PaymentEngineError::ProductUnavailable(line.product_id));
            }
            if product.stock_quantity < line.quantity {
                return Err(PaymentEngineError::InsufficientStock {
                    product_id: line.product_id,
                    requested: line.quantity,
                    available: product.stock_quantity,
                });
            }
            priced.push(PricedLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: product.unit_price,
                meal_period: line.meal_period,
            });
        }
        let total: Centavos = priced.iter().map(PricedLine::extension).sum();
        // -- 4. funds validation
        let observed_balance = match order.payment_method {
            PaymentMethod::Balance => {
                let wallet = self
                    .db
                    .fetch_wallet(&order.parent_id)
                    .await?
                    .ok_or_else(|| PaymentEngineError::NoWallet(order.parent_id.clone()))?;
                if wallet.balance < total {
                    return Err(PaymentEngineError::InsufficientBalance {
                        required: total,
                        available: wallet.balance,
                    });
                }
                Some(wallet.balance)
            },
            _ => None,
        };

        // -- commit (a): conditional stock decrements
        let mut reserved: Vec<(i64, i64)> = Vec::with_capacity(priced.len());
        for line in &priced {
            if !self.db.reserve_stock(line.product_id, line.quantity).await? {
                self.release_reserved(&reserved).await?;
                let available =
                    self.db.fetch_product(line.product_id).await?.map(|p| p.stock_quantity).unwrap_or(0);
                debug!(
                    "🍱️ Lost the stock race on product {} ({} requested, {available} left). Order {} aborted.",
                    line.product_id, line.quantity, order.client_order_id
                );
                return Err(PaymentEngineError::InsufficientStock {
                    product_id: line.product_id,
                    requested: line.quantity,
                    available,
                });
            }
            reserved.push((line.product_id, line.quantity));
        }
        // -- commit (b): initial lifecycle state
        let (status, payment_status, due) = if order.payment_method == PaymentMethod::Cash {
            (OrderStatus::AwaitingPayment, PaymentStatus::AwaitingPayment, Some(Utc::now() + self.cash_payment_window))
        } else {
            (OrderStatus::Pending, PaymentStatus::Paid, None)
        };
        // -- commit (c): insert the order and its items
        let inserted = match self.db.insert_order(&order, &priced, total, status, payment_status, due).await {
            Ok(o) => o,
            Err(PaymentEngineError::OrderAlreadyExists(key)) => {
                // A concurrent submission with the same idempotency key won the insert. Hand back its order.
                self.release_reserved(&reserved).await?;
                let existing = self.db.fetch_order_by_client_id(&key).await?.ok_or_else(|| {
                    PaymentEngineError::DatabaseError(format!("Order {key} vanished straight after a duplicate insert"))
                })?;
                debug!("🍱️ Concurrent replay of order {key}; resolving to existing order {}", existing.id);
                return Ok(OrderOutcome::Duplicate(OrderConfirmation::from(&existing)));
            },
            Err(e) => {
                self.release_reserved(&reserved).await?;
                return Err(e);
            },
        };
        // -- commit (d): conditional wallet debit
        if let Some(observed) = observed_balance {
            let debited = self.db.debit_wallet_if_unchanged(&order.parent_id, observed, total).await?;
            if !debited {
                // -- commit (e): compensation, completed before the conflict is surfaced
                info!(
                    "🍱️ Wallet for {} changed mid-commit; rolling back order {} and its stock.",
                    order.parent_id, inserted.id
                );
                self.release_reserved(&reserved).await?;
                self.db.delete_order(inserted.id).await?;
                return Err(PaymentEngineError::WalletConflict);
            }
        }
        // -- commit (f): audit ledger
        let settlement =
            if order.payment_method == PaymentMethod::Cash { SettlementStatus::Pending } else { SettlementStatus::Completed };
        self.db.insert_ledger_entry(inserted.id, order.payment_method, total, settlement).await?;

        debug!(
            "🍱️ Order {} committed as #{} for {} ({}, {})",
            inserted.client_order_id, inserted.id, total, inserted.status, inserted.payment_status
        );
        self.call_order_created_hook(&inserted).await;
        if inserted.payment_status == PaymentStatus::Paid {
            self.call_order_paid_hook(&inserted).await;
        }
        Ok(OrderOutcome::Created(OrderConfirmation::from(&inserted)))
    }

    /// Staff confirmation that a cash order was settled at the counter.
    ///
    /// State machine: only `awaiting_payment` cash orders inside their payment window can be confirmed. The
    /// underlying update is conditional, so a confirmation racing the sweep has exactly one winner; when this
    /// side loses, the order is re-read to report the precise reason.
    pub async fn confirm_cash_payment(&self, order_id: i64, now: DateTime<Utc>) -> Result<Order, PaymentEngineError> {
        let order = self.db.fetch_order_by_id(order_id).await?.ok_or(PaymentEngineError::OrderNotFound(order_id))?;
        if order.payment_method != PaymentMethod::Cash {
            return Err(PaymentEngineError::NotACashOrder(order_id));
        }
        if order.payment_status == PaymentStatus::Paid {
            return Err(PaymentEngineError::AlreadyPaid(order_id));
        }
        match self.db.confirm_cash_payment(order_id, now).await? {
            Some(updated) => {
                self.db.settle_ledger_entry(order_id, SettlementStatus::Completed).await?;
                info!("💵️ Cash payment for order #{order_id} confirmed");
                self.call_order_paid_hook(&updated).await;
                Ok(updated)
            },
            None => {
                // Lost the conditional update. Work out to whom.
                let current =
                    self.db.fetch_order_by_id(order_id).await?.ok_or(PaymentEngineError::OrderNotFound(order_id))?;
                match (current.status, current.payment_status) {
                    (_, PaymentStatus::Paid) => Err(PaymentEngineError::AlreadyPaid(order_id)),
                    (_, PaymentStatus::Timeout) => Err(PaymentEngineError::PaymentDeadlinePassed(order_id)),
                    (OrderStatus::Cancelled, _) => Err(PaymentEngineError::OrderCancelled(order_id)),
                    _ if current.payment_due_at.map(|due| due < now).unwrap_or(false) => {
                        Err(PaymentEngineError::PaymentDeadlinePassed(order_id))
                    },
                    _ => Err(PaymentEngineError::DatabaseError(format!(
                        "Cash confirmation for order {order_id} matched no rows, but the order is {} / {}",
                        current.status, current.payment_status
                    ))),
                }
            },
        }
    }

    /// Cancels an order that has not progressed past a cancellable state, restoring its stock and reversing any
    /// ledger effects.
    ///
    /// The status guard and the mutation are a single conditional update, so an order that staff just moved to
    /// `preparing` cannot slip through. A paid balance-funded order credits the wallet; paid cash/mobile orders
    /// are recorded as refunded and settled out-of-band.
    pub async fn cancel_order(
        &self,
        order_id: i64,
        requester: &Requester,
    ) -> Result<CancellationOutcome, PaymentEngineError> {
        let order = self.db.fetch_order_by_id(order_id).await?.ok_or(PaymentEngineError::OrderNotFound(order_id))?;
        if let Requester::Parent(parent_id) = requester {
            if order.parent_id != *parent_id {
                warn!("🔐️ Parent {parent_id} tried to cancel order #{order_id} belonging to {}", order.parent_id);
                return Err(PaymentEngineError::NotOrderOwner(order_id));
            }
        }
        let cancelled = match self.db.cancel_order_if_active(order_id).await? {
            Some(o) => o,
            None => {
                let current =
                    self.db.fetch_order_by_id(order_id).await?.ok_or(PaymentEngineError::OrderNotFound(order_id))?;
                return Err(PaymentEngineError::OrderNotCancellable { status: current.status });
            },
        };
        self.restore_stock_for(&cancelled).await?;
        let refunded = if cancelled.payment_status == PaymentStatus::Refunded {
            if cancelled.payment_method == PaymentMethod::Balance {
                self.db.credit_wallet(&cancelled.parent_id, cancelled.total_amount).await?;
                info!(
                    "💸️ Refunded {} to the wallet of {} for cancelled order #{order_id}",
                    cancelled.total_amount, cancelled.parent_id
                );
            }
            self.db.settle_ledger_entry(order_id, SettlementStatus::Refunded).await?;
            Some(cancelled.total_amount)
        } else {
            self.db.settle_ledger_entry(order_id, SettlementStatus::Cancelled).await?;
            None
        };
        debug!("🍱️ Order #{order_id} cancelled by {requester:?}");
        self.call_order_cancelled_hook(&cancelled, CancellationReason::Requested).await;
        Ok(CancellationOutcome { order: cancelled, refunded })
    }

    /// One pass of the payment lifecycle sweep: cancels every cash order whose payment deadline has lapsed and
    /// restores its stock, exactly mirroring the decrement made at creation.
    pub async fn sweep_unpaid_orders(&self, now: DateTime<Utc>) -> Result<SweepResult, PaymentEngineError> {
        let expired = self.db.sweep_unpaid_orders(now).await?;
        for order in &expired {
            self.restore_stock_for(order).await?;
            self.db.settle_ledger_entry(order.id, SettlementStatus::Cancelled).await?;
            debug!("🕰️ Order #{} timed out awaiting cash payment (due {:?})", order.id, order.payment_due_at);
            self.call_order_cancelled_hook(order, CancellationReason::PaymentTimeout).await;
        }
        Ok(SweepResult { cancelled: expired })
    }

    async fn restore_stock_for(&self, order: &Order) -> Result<(), PaymentEngineError> {
        let items = self.db.fetch_order_items(order.id).await?;
        for item in &items {
            self.db.release_stock(item.product_id, item.quantity).await?;
        }
        Ok(())
    }

    async fn release_reserved(&self, reserved: &[(i64, i64)]) -> Result<(), PaymentEngineError> {
        for (product_id, quantity) in reserved {
            self.db.release_stock(*product_id, *quantity).await?;
        }
        Ok(())
    }

    async fn call_order_created_hook(&self, order: &Order) {
        for emitter in &self.producers.order_created_producer {
            emitter.publish_event(OrderCreatedEvent::new(order.clone())).await;
        }
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            emitter.publish_event(OrderPaidEvent::new(order.clone())).await;
        }
    }

    async fn call_order_cancelled_hook(&self, order: &Order, reason: CancellationReason) {
        for emitter in &self.producers.order_cancelled_producer {
            emitter.publish_event(OrderCancelledEvent::new(order.clone(), reason)).await;
        }
    }
}
