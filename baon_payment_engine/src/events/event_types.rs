use serde::{Deserialize, Serialize};

use crate::db_types::Order;

/// Why an order was cancelled. Lets subscribers word parent notifications accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    /// A parent or staff member cancelled the order.
    Requested,
    /// The cash payment deadline lapsed and the sweep cancelled the order.
    PaymentTimeout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub order: Order,
    pub reason: CancellationReason,
}

impl OrderCancelledEvent {
    pub fn new(order: Order, reason: CancellationReason) -> Self {
        Self { order, reason }
    }
}
