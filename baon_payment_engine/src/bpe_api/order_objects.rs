use std::fmt::Display;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Centavos, ClientOrderId, Order, OrderStatus, PaymentStatus};

/// The engine's answer to a successful order submission: everything the caller needs to show a confirmation
/// screen or to resolve a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub order_id: i64,
    pub client_order_id: ClientOrderId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_due_at: Option<DateTime<Utc>>,
    pub total_amount: Centavos,
}

impl From<&Order> for OrderConfirmation {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            client_order_id: order.client_order_id.clone(),
            status: order.status,
            payment_status: order.payment_status,
            payment_due_at: order.payment_due_at,
            total_amount: order.total_amount,
        }
    }
}

/// Result of [`crate::OrderFlowApi::process_order`]. A replayed idempotency key is a `Duplicate`, which is a
/// success from the caller's point of view — it resolves to the original order.
#[derive(Debug, Clone)]
pub enum OrderOutcome {
    Created(OrderConfirmation),
    Duplicate(OrderConfirmation),
}

impl OrderOutcome {
    pub fn confirmation(&self) -> &OrderConfirmation {
        match self {
            OrderOutcome::Created(c) | OrderOutcome::Duplicate(c) => c,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, OrderOutcome::Duplicate(_))
    }
}

/// Who is asking for a cancellation. Parents may only cancel their own orders; staff may cancel any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requester {
    Parent(String),
    Staff,
}

/// Result of a cancellation. `refunded` is the amount reversed for an already-paid order: credited straight back
/// to the wallet for balance-funded orders, recorded for out-of-band settlement otherwise. `None` for orders
/// that were never paid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationOutcome {
    pub order: Order,
    pub refunded: Option<Centavos>,
}

/// Fetches orders according to criteria. Empty criteria match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub parent_id: Option<String>,
    pub student_id: Option<i64>,
    pub scheduled_for: Option<NaiveDate>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<Vec<OrderStatus>>,
    pub payment_status: Option<Vec<PaymentStatus>>,
}

impl OrderQueryFilter {
    pub fn with_parent_id(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_student_id(mut self, student_id: i64) -> Self {
        self.student_id = Some(student_id);
        self
    }

    pub fn with_scheduled_for(mut self, date: NaiveDate) -> Self {
        self.scheduled_for = Some(date);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn with_payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parent_id.is_none() &&
            self.student_id.is_none() &&
            self.scheduled_for.is_none() &&
            self.since.is_none() &&
            self.until.is_none() &&
            self.status.is_none() &&
            self.payment_status.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(parent_id) = &self.parent_id {
            write!(f, "parent_id: {parent_id}. ")?;
        }
        if let Some(student_id) = &self.student_id {
            write!(f, "student_id: {student_id}. ")?;
        }
        if let Some(date) = &self.scheduled_for {
            write!(f, "scheduled_for: {date}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until {until}. ")?;
        }
        if let Some(statuses) = &self.status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "statuses: [{statuses}]. ")?;
        }
        if let Some(statuses) = &self.payment_status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "payment statuses: [{statuses}]. ")?;
        }
        Ok(())
    }
}
