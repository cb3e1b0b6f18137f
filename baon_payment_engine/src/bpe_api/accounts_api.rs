use crate::{
    db_types::{Order, OrderItem, Wallet},
    order_objects::OrderQueryFilter,
    traits::{AccountApiError, AccountManagement},
};

/// Read-only queries over orders and wallets, for dashboards and the "my orders" views.
#[derive(Debug, Clone)]
pub struct AccountApi<B> {
    db: B,
}

impl<B> AccountApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> AccountApi<B>
where B: AccountManagement
{
    pub async fn orders_for_parent(&self, parent_id: &str) -> Result<Vec<Order>, AccountApiError> {
        self.db.fetch_orders_for_parent(parent_id).await
    }

    pub async fn order_by_id(&self, order_id: i64) -> Result<Option<Order>, AccountApiError> {
        self.db.fetch_order_by_id(order_id).await
    }

    pub async fn order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, AccountApiError> {
        self.db.fetch_order_items(order_id).await
    }

    pub async fn wallet(&self, parent_id: &str) -> Result<Option<Wallet>, AccountApiError> {
        self.db.fetch_wallet(parent_id).await
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, AccountApiError> {
        self.db.search_orders(query).await
    }
}
