use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{
        Centavos,
        ClientOrderId,
        LedgerEntry,
        NewOrder,
        Order,
        OrderStatus,
        PaymentMethod,
        PaymentStatus,
        PricedLine,
        Product,
        SettlementStatus,
    },
    traits::{AccountApiError, AccountManagement},
};

/// This trait defines the mutation surface that backends must provide to support the Baon payment engine.
///
/// The design constraint running through every method here is that there is **no** database transaction spanning
/// stock, order and wallet. Each primitive is individually atomic and individually reversible, and the two shared
/// mutable resources — `stock_quantity` and `wallet.balance` — are only ever written through conditional updates
/// keyed on a previously observed value. The engine composes these primitives into a saga and compensates by hand
/// when a later step loses its race.
#[allow(async_fn_in_trait)]
pub trait PaymentEngineDatabase: Clone + AccountManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Looks up an order by its idempotency key.
    async fn fetch_order_by_client_id(&self, id: &ClientOrderId) -> Result<Option<Order>, PaymentEngineError>;

    /// Fetches a catalog product by id.
    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, PaymentEngineError>;

    /// Conditionally decrements a product's stock.
    ///
    /// The decrement only applies while the product is available and still holds at least `quantity` units;
    /// returns `false` (zero rows matched) when a concurrent checkout got there first.
    async fn reserve_stock(&self, product_id: i64, quantity: i64) -> Result<bool, PaymentEngineError>;

    /// Returns previously reserved stock. Must mirror the reserving decrement exactly (same product, same
    /// quantity).
    async fn release_stock(&self, product_id: i64, quantity: i64) -> Result<(), PaymentEngineError>;

    /// Inserts the order and its line items atomically and returns the stored record.
    ///
    /// Fails with [`PaymentEngineError::OrderAlreadyExists`] when another submission with the same idempotency
    /// key committed in the meantime.
    async fn insert_order(
        &self,
        order: &NewOrder,
        lines: &[PricedLine],
        total: Centavos,
        status: OrderStatus,
        payment_status: PaymentStatus,
        payment_due_at: Option<DateTime<Utc>>,
    ) -> Result<Order, PaymentEngineError>;

    /// Removes an order and its line items. Compensation-only: called when a later saga step fails after the
    /// order row was inserted.
    async fn delete_order(&self, order_id: i64) -> Result<(), PaymentEngineError>;

    /// Compare-and-swap wallet debit: subtracts `amount` only if the balance still equals `observed`.
    /// Returns `false` when a concurrent deduction changed the balance since it was read.
    async fn debit_wallet_if_unchanged(
        &self,
        parent_id: &str,
        observed: Centavos,
        amount: Centavos,
    ) -> Result<bool, PaymentEngineError>;

    /// Unconditionally credits a wallet (the refund path).
    async fn credit_wallet(&self, parent_id: &str, amount: Centavos) -> Result<(), PaymentEngineError>;

    /// Appends a payment attempt to the audit ledger.
    async fn insert_ledger_entry(
        &self,
        order_id: i64,
        method: PaymentMethod,
        amount: Centavos,
        settlement: SettlementStatus,
    ) -> Result<LedgerEntry, PaymentEngineError>;

    /// Advances the settlement status of an order's ledger entry.
    async fn settle_ledger_entry(&self, order_id: i64, settlement: SettlementStatus) -> Result<(), PaymentEngineError>;

    /// Marks a cash order as paid, guarded on `payment_status = awaiting_payment` and an unexpired deadline.
    ///
    /// Returns the updated order, or `None` when the guard matched zero rows (already paid, already swept, or
    /// past the deadline) — the caller re-reads to report the precise reason. The guard is what makes a
    /// confirmation racing the sweep single-winner.
    async fn confirm_cash_payment(&self, order_id: i64, now: DateTime<Utc>) -> Result<Option<Order>, PaymentEngineError>;

    /// Cancels an order, guarded on `status ∈ {pending, awaiting_payment}`; a paid order's payment status flips
    /// to `refunded` in the same statement. Returns `None` when the order had already progressed past a
    /// cancellable state.
    async fn cancel_order_if_active(&self, order_id: i64) -> Result<Option<Order>, PaymentEngineError>;

    /// Cancels every cash order whose payment deadline has lapsed, in one guarded update, and returns the swept
    /// orders. Stock restoration is the engine's responsibility, per returned order.
    async fn sweep_unpaid_orders(&self, now: DateTime<Utc>) -> Result<Vec<Order>, PaymentEngineError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PaymentEngineError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentEngineError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("The order must contain at least one line item")]
    EmptyOrder,
    #[error("Order line quantities must be at least 1")]
    InvalidQuantity,
    #[error("Student {student_id} is not linked to parent {parent_id}")]
    StudentNotLinked { parent_id: String, student_id: i64 },
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Product {0} is not available for ordering")]
    ProductUnavailable(i64),
    #[error("Insufficient stock for product {product_id}: requested {requested}, {available} available")]
    InsufficientStock { product_id: i64, requested: i64, available: i64 },
    #[error("Parent {0} has no wallet")]
    NoWallet(String),
    #[error("Insufficient balance: the order total is {required} but the wallet holds {available}")]
    InsufficientBalance { required: Centavos, available: Centavos },
    #[error("The wallet balance changed while the order was being committed. The order was rolled back; try again.")]
    WalletConflict,
    #[error("Cannot insert order, since it already exists with client order id {0}")]
    OrderAlreadyExists(ClientOrderId),
    #[error("The requested order (internal id {0}) does not exist")]
    OrderNotFound(i64),
    #[error("Order {0} is not a cash order")]
    NotACashOrder(i64),
    #[error("Order {0} has already been paid")]
    AlreadyPaid(i64),
    #[error("The cash payment deadline for order {0} has passed")]
    PaymentDeadlinePassed(i64),
    #[error("Order {0} has been cancelled")]
    OrderCancelled(i64),
    #[error("The order cannot be cancelled once it is {status}")]
    OrderNotCancellable { status: OrderStatus },
    #[error("Order {0} does not belong to the caller")]
    NotOrderOwner(i64),
}

impl From<sqlx::Error> for PaymentEngineError {
    fn from(e: sqlx::Error) -> Self {
        PaymentEngineError::DatabaseError(e.to_string())
    }
}

impl From<AccountApiError> for PaymentEngineError {
    fn from(e: AccountApiError) -> Self {
        match e {
            AccountApiError::DatabaseError(e) => PaymentEngineError::DatabaseError(e),
            AccountApiError::QueryError(e) => PaymentEngineError::DatabaseError(e),
        }
    }
}
