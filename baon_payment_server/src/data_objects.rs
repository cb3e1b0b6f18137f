//! Request and response shapes for the HTTP routes.
use baon_payment_engine::{
    cart::CartLine,
    checkout_api::{CheckoutRequest, CheckoutResult},
    db_types::{Centavos, MealPeriod, NewOrder, OrderStatus, PaymentMethod, PaymentStatus, Wallet},
    order_objects::{CancellationOutcome, OrderConfirmation},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::order_error_code;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemPayload {
    pub product_id: i64,
    pub quantity: i64,
    pub price_at_order: Centavos,
    pub meal_period: MealPeriod,
}

/// `POST /orders` body. The parent id comes from the bearer token, never from the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPayload {
    pub student_id: i64,
    pub client_order_id: String,
    pub scheduled_for: NaiveDate,
    pub items: Vec<OrderItemPayload>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

impl OrderPayload {
    pub fn into_new_order(self, parent_id: String) -> NewOrder {
        let mut order = NewOrder::new(
            parent_id,
            self.student_id,
            self.client_order_id.into(),
            self.scheduled_for,
            self.payment_method,
        );
        order.notes = self.notes;
        for item in self.items {
            order = order.with_line(item.product_id, item.quantity, item.price_at_order, item.meal_period);
        }
        order
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order_id: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_due_at: Option<DateTime<Utc>>,
    pub total_amount: Centavos,
}

impl From<OrderConfirmation> for OrderResponse {
    fn from(c: OrderConfirmation) -> Self {
        Self {
            order_id: c.order_id,
            status: c.status,
            payment_status: c.payment_status,
            payment_due_at: c.payment_due_at,
            total_amount: c.total_amount,
        }
    }
}

/// `POST /checkout` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutPayload {
    /// Client-generated id for this checkout attempt; reuse it when retrying the same attempt.
    pub checkout_id: Uuid,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    /// Restrict checkout to these delivery dates (partial checkout).
    pub dates: Option<Vec<NaiveDate>>,
    pub lines: Vec<CartLine>,
}

impl CheckoutPayload {
    pub fn into_request(self, parent_id: String) -> CheckoutRequest {
        CheckoutRequest {
            parent_id,
            checkout_id: self.checkout_id,
            payment_method: self.payment_method,
            notes: self.notes,
            dates: self.dates,
            lines: self.lines,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionSuccessResponse {
    pub student_id: i64,
    pub scheduled_for: NaiveDate,
    pub replayed: bool,
    pub order: OrderResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionFailureResponse {
    pub student_id: i64,
    pub scheduled_for: NaiveDate,
    pub error: String,
    pub message: String,
}

/// Aggregate checkout result: which (student, date) partitions became orders and which stayed in the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub orders: Vec<PartitionSuccessResponse>,
    pub failures: Vec<PartitionFailureResponse>,
}

impl From<CheckoutResult> for CheckoutResponse {
    fn from(result: CheckoutResult) -> Self {
        let orders = result
            .orders
            .into_iter()
            .map(|s| PartitionSuccessResponse {
                student_id: s.student_id,
                scheduled_for: s.scheduled_for,
                replayed: s.replayed,
                order: OrderResponse::from(s.order),
            })
            .collect();
        let failures = result
            .failures
            .into_iter()
            .map(|f| PartitionFailureResponse {
                student_id: f.student_id,
                scheduled_for: f.scheduled_for,
                error: order_error_code(&f.error).to_string(),
                message: f.error.to_string(),
            })
            .collect();
        Self { orders, failures }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmResponse {
    pub order_id: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub order_id: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// The amount reversed for an already-paid order (wallet credit for balance orders, recorded for
    /// out-of-band settlement otherwise).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded: Option<Centavos>,
}

impl From<CancellationOutcome> for CancelResponse {
    fn from(outcome: CancellationOutcome) -> Self {
        Self {
            order_id: outcome.order.id,
            status: outcome.order.status,
            payment_status: outcome.order.payment_status,
            refunded: outcome.refunded,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletResponse {
    pub parent_id: String,
    pub balance: Centavos,
}

impl From<Wallet> for WalletResponse {
    fn from(w: Wallet) -> Self {
        Self { parent_id: w.parent_id, balance: w.balance }
    }
}
