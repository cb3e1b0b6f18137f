use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

pub use baon_common::Centavos;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(String);

//--------------------------------------     ClientOrderId       -----------------------------------------------------
/// The caller-supplied idempotency key for an order.
///
/// Globally unique (enforced by the database). Submitting the same `ClientOrderId` twice returns the original order
/// rather than creating a second one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct ClientOrderId(pub String);

impl FromStr for ClientOrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for ClientOrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for ClientOrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl ClientOrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      MealPeriod       -------------------------------------------------------
/// The serving window a line item is ordered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MealPeriod {
    Recess,
    Lunch,
    Merienda,
}

impl Display for MealPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MealPeriod::Recess => write!(f, "recess"),
            MealPeriod::Lunch => write!(f, "lunch"),
            MealPeriod::Merienda => write!(f, "merienda"),
        }
    }
}

impl FromStr for MealPeriod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recess" => Ok(Self::Recess),
            "lunch" => Ok(Self::Lunch),
            "merienda" => Ok(Self::Merienda),
            s => Err(ConversionError(format!("Invalid meal period: {s}"))),
        }
    }
}

//--------------------------------------     PaymentMethod       -----------------------------------------------------
/// How the parent chose to pay for an order.
///
/// Everything except [`PaymentMethod::Cash`] settles at checkout time. Cash orders are reserved against stock and
/// must be confirmed at the canteen counter before the payment deadline lapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Balance,
    GCash,
    PayMaya,
    Card,
}

impl PaymentMethod {
    /// True for methods that settle immediately at checkout.
    pub fn is_instant(&self) -> bool {
        !matches!(self, PaymentMethod::Cash)
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Balance => write!(f, "balance"),
            PaymentMethod::GCash => write!(f, "gcash"),
            PaymentMethod::PayMaya => write!(f, "paymaya"),
            PaymentMethod::Card => write!(f, "card"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(Self::Cash),
            "balance" => Ok(Self::Balance),
            "gcash" => Ok(Self::GCash),
            "paymaya" => Ok(Self::PayMaya),
            "card" => Ok(Self::Card),
            s => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

//--------------------------------------     OrderStatus       -------------------------------------------------------
/// The fulfilment lifecycle of an order.
///
/// `Preparing`, `Ready` and `Completed` are driven by kitchen operations and are reachable only from a paid order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// A cash order waiting for payment at the counter.
    AwaitingPayment,
    /// Paid for and queued for the kitchen.
    Pending,
    Preparing,
    Ready,
    Completed,
    /// Cancelled by the parent, by staff, or by the payment-timeout sweep.
    Cancelled,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::AwaitingPayment => write!(f, "awaiting_payment"),
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Preparing => write!(f, "preparing"),
            OrderStatus::Ready => write!(f, "ready"),
            OrderStatus::Completed => write!(f, "completed"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaiting_payment" => Ok(Self::AwaitingPayment),
            "pending" => Ok(Self::Pending),
            "preparing" => Ok(Self::Preparing),
            "ready" => Ok(Self::Ready),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Cancelled");
            OrderStatus::Cancelled
        })
    }
}

//--------------------------------------    PaymentStatus       ------------------------------------------------------
/// The payment lifecycle of an order: `awaiting_payment → {paid, timeout}` and `paid → refunded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    AwaitingPayment,
    Paid,
    /// The cash payment deadline lapsed and the sweep cancelled the order.
    Timeout,
    Refunded,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::AwaitingPayment => write!(f, "awaiting_payment"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Timeout => write!(f, "timeout"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaiting_payment" => Ok(Self::AwaitingPayment),
            "paid" => Ok(Self::Paid),
            "timeout" => Ok(Self::Timeout),
            "refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------   SettlementStatus     ------------------------------------------------------
/// Settlement state of a ledger entry. The only mutable column of the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Pending,
    Completed,
    Refunded,
    Cancelled,
}

impl Display for SettlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlementStatus::Pending => write!(f, "pending"),
            SettlementStatus::Completed => write!(f, "completed"),
            SettlementStatus::Refunded => write!(f, "refunded"),
            SettlementStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

//--------------------------------------       Product        --------------------------------------------------------
/// A catalog item. `stock_quantity` never goes negative; it is only mutated through the conditional
/// reserve/release updates in the sqlite backend.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub unit_price: Centavos,
    pub stock_quantity: i64,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       Student        --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------        Wallet        --------------------------------------------------------
/// A parent's stored-value account. The balance is non-negative and is only mutated via the compare-and-swap
/// debit and the credit operation in the sqlite backend.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Wallet {
    pub parent_id: String,
    pub balance: Centavos,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      NewOrder        --------------------------------------------------------
/// A single line of an order request: what, how many, and for which serving window.
///
/// `price_at_order` is the price the client saw when the line was added to the cart. It is advisory; the engine
/// re-prices every line from the catalog at commit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub product_id: i64,
    pub quantity: i64,
    pub price_at_order: Centavos,
    pub meal_period: MealPeriod,
}

/// An order submission, as handed to [`crate::OrderFlowApi::process_order`]. One order covers exactly one
/// (student, delivery date) pair.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub parent_id: String,
    pub student_id: i64,
    /// The idempotency key for this submission.
    pub client_order_id: ClientOrderId,
    pub scheduled_for: NaiveDate,
    pub payment_method: PaymentMethod,
    /// Free-text note from the parent, e.g. "no peanuts please".
    pub notes: Option<String>,
    pub lines: Vec<NewOrderLine>,
}

impl NewOrder {
    pub fn new(
        parent_id: impl Into<String>,
        student_id: i64,
        client_order_id: ClientOrderId,
        scheduled_for: NaiveDate,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            parent_id: parent_id.into(),
            student_id,
            client_order_id,
            scheduled_for,
            payment_method,
            notes: None,
            lines: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes = Some(note.into());
        self
    }

    pub fn with_line(mut self, product_id: i64, quantity: i64, price_at_order: Centavos, meal_period: MealPeriod) -> Self {
        self.lines.push(NewOrderLine { product_id, quantity, price_at_order, meal_period });
        self
    }
}

/// An order line after re-pricing against the catalog. `unit_price` is the value frozen into the order.
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Centavos,
    pub meal_period: MealPeriod,
}

impl PricedLine {
    pub fn extension(&self) -> Centavos {
        self.unit_price * self.quantity
    }
}

//--------------------------------------        Order         --------------------------------------------------------
/// A committed order.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub client_order_id: ClientOrderId,
    pub parent_id: String,
    pub student_id: i64,
    pub scheduled_for: NaiveDate,
    pub total_amount: Centavos,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// Deadline for settling at the counter. Set only for cash orders.
    pub payment_due_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line item of a committed order. `unit_price` is frozen at commit time and is immune to later catalog price
/// changes.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Centavos,
    pub meal_period: MealPeriod,
}

//--------------------------------------     LedgerEntry      --------------------------------------------------------
/// Append-only audit record of a payment attempt. Amounts are never mutated after insert; only the settlement
/// status advances.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub order_id: i64,
    pub payment_method: PaymentMethod,
    pub amount: Centavos,
    pub settlement: SettlementStatus,
    pub created_at: DateTime<Utc>,
}
