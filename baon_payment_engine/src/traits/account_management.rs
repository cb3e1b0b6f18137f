use thiserror::Error;

use crate::{
    db_types::{Order, OrderItem, Wallet},
    order_objects::OrderQueryFilter,
};

#[derive(Debug, Clone, Error)]
pub enum AccountApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User error constructing query: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for AccountApiError {
    fn from(e: sqlx::Error) -> Self {
        AccountApiError::DatabaseError(e.to_string())
    }
}

/// Read-only queries over parents, wallets and orders.
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    /// Whether the given parent is linked to the given student. Order submissions and cancellations on behalf of
    /// a student the caller is not linked to are rejected.
    async fn owns_student(&self, parent_id: &str, student_id: i64) -> Result<bool, AccountApiError>;

    /// Fetches the parent's stored-value wallet, if one exists.
    async fn fetch_wallet(&self, parent_id: &str) -> Result<Option<Wallet>, AccountApiError>;

    /// Fetches an order by its internal id.
    async fn fetch_order_by_id(&self, order_id: i64) -> Result<Option<Order>, AccountApiError>;

    /// Fetches the line items of an order.
    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, AccountApiError>;

    /// All orders placed by the given parent, oldest first.
    async fn fetch_orders_for_parent(&self, parent_id: &str) -> Result<Vec<Order>, AccountApiError>;

    /// Fetches orders according to the criteria in the filter, ordered by creation time ascending.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, AccountApiError>;
}
