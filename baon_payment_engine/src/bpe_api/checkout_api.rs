use std::fmt::Debug;

use chrono::NaiveDate;
use futures_util::future::join_all;
use log::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    bpe_api::{
        cart::{partition_cart, Cart, CartLine, CartPartition},
        order_flow_api::OrderFlowApi,
        order_objects::OrderConfirmation,
    },
    db_types::{Centavos, PaymentMethod},
    traits::{AccountApiError, AccountManagement, PaymentEngineDatabase, PaymentEngineError},
};

/// A full checkout attempt: the parent's cart, how to pay, and optionally which delivery dates to check out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub parent_id: String,
    /// Client-generated id for this checkout *attempt*. Retries of the same attempt must reuse it; a fresh
    /// checkout click generates a new one.
    pub checkout_id: Uuid,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    /// Restricts checkout to these delivery dates; lines for other dates stay in the cart (partial checkout).
    pub dates: Option<Vec<NaiveDate>>,
    pub lines: Vec<CartLine>,
}

/// A partition that checked out. `replayed` marks partitions that resolved to an order committed by an earlier
/// retry of the same attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionSuccess {
    pub student_id: i64,
    pub scheduled_for: NaiveDate,
    pub replayed: bool,
    pub order: OrderConfirmation,
}

/// A partition that failed. The order engine's error is carried verbatim so the caller can distinguish
/// permanent validation failures from retryable conflicts.
#[derive(Debug, Clone)]
pub struct PartitionFailure {
    pub student_id: i64,
    pub scheduled_for: NaiveDate,
    pub error: PaymentEngineError,
}

/// Aggregate result of a checkout. Partitions succeed and fail independently; the caller clears succeeded
/// partitions from its cart and leaves failed ones in place for retry.
#[derive(Debug, Clone, Default)]
pub struct CheckoutResult {
    pub orders: Vec<PartitionSuccess>,
    pub failures: Vec<PartitionFailure>,
}

impl CheckoutResult {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("The cart has no lines for the requested checkout")]
    NothingToCheckout,
    #[error("Parent {0} has no wallet")]
    NoWallet(String),
    #[error("Insufficient balance for the combined checkout: total is {required} but the wallet holds {available}")]
    InsufficientBalance { required: Centavos, available: Centavos },
    #[error("{0}")]
    AccountError(#[from] AccountApiError),
}

/// `CheckoutApi` is the checkout orchestrator. It partitions a cart by (student, delivery date), derives a
/// stable idempotency key per partition, and submits every partition to the order engine independently — one
/// child's sold-out lunch never rolls back a sibling's committed order.
pub struct CheckoutApi<B> {
    orders: OrderFlowApi<B>,
}

impl<B> Debug for CheckoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

impl<B> CheckoutApi<B> {
    pub fn new(orders: OrderFlowApi<B>) -> Self {
        Self { orders }
    }
}

impl<B> CheckoutApi<B>
where B: PaymentEngineDatabase
{
    /// Runs a checkout attempt.
    ///
    /// For balance payment the *combined* total of every partition is checked against the wallet up front and
    /// the whole checkout rejected when it does not fit — partially-funded multi-order checkouts would otherwise
    /// commit an arbitrary prefix of the children's orders. (The per-order debit remains individually guarded;
    /// this pre-check is a fail-fast, not the safety mechanism.)
    ///
    /// Partitions are submitted concurrently. Stock rows they share are safe because every decrement is
    /// individually conditional.
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutResult, CheckoutError> {
        let cart = Cart::new(request.lines.clone());
        let partitions = partition_cart(&cart, request.dates.as_deref());
        if partitions.is_empty() {
            return Err(CheckoutError::NothingToCheckout);
        }
        if request.payment_method == PaymentMethod::Balance {
            let combined: Centavos = partitions.iter().map(CartPartition::estimated_total).sum();
            let wallet = self
                .orders
                .db()
                .fetch_wallet(&request.parent_id)
                .await?
                .ok_or_else(|| CheckoutError::NoWallet(request.parent_id.clone()))?;
            if wallet.balance < combined {
                debug!(
                    "🛒️ Fail-fast: checkout {} needs {combined} across {} orders but the wallet holds {}",
                    request.checkout_id,
                    partitions.len(),
                    wallet.balance
                );
                return Err(CheckoutError::InsufficientBalance { required: combined, available: wallet.balance });
            }
        }
        let submissions = partitions.iter().map(|partition| {
            let order = partition.to_new_order(
                &request.parent_id,
                &request.checkout_id,
                request.payment_method,
                request.notes.as_deref(),
            );
            async move { (partition.student_id, partition.scheduled_for, self.orders.process_order(order).await) }
        });
        let mut result = CheckoutResult::default();
        for (student_id, scheduled_for, outcome) in join_all(submissions).await {
            match outcome {
                Ok(outcome) => {
                    let replayed = outcome.is_duplicate();
                    let order = outcome.confirmation().clone();
                    result.orders.push(PartitionSuccess { student_id, scheduled_for, replayed, order });
                },
                Err(error) => {
                    debug!("🛒️ Partition (student {student_id}, {scheduled_for}) failed: {error}");
                    result.failures.push(PartitionFailure { student_id, scheduled_for, error });
                },
            }
        }
        info!(
            "🛒️ Checkout {} complete: {} orders placed, {} partitions failed",
            request.checkout_id,
            result.orders.len(),
            result.failures.len()
        );
        Ok(result)
    }
}
