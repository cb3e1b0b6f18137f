//! `SqliteDatabase` is the concrete SQLite implementation of the Baon payment engine backend.
//!
//! It implements all the traits defined in the [`crate::traits`] module by delegating to the low-level functions
//! in [`super::db`]. Only [`Self::insert_order`] opens a transaction (the order row and its items must appear
//! together); everything else is a single, individually-atomic statement — the engine's saga depends on that.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::db::{db_url, ledger, new_pool, orders, products, students, wallets};
use crate::{
    db_types::{
        Centavos,
        ClientOrderId,
        LedgerEntry,
        NewOrder,
        Order,
        OrderItem,
        OrderStatus,
        PaymentMethod,
        PaymentStatus,
        PricedLine,
        Product,
        SettlementStatus,
        Student,
        Wallet,
    },
    order_objects::OrderQueryFilter,
    traits::{AccountApiError, AccountManagement, PaymentEngineDatabase, PaymentEngineError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database at `BAON_DATABASE_URL` (or the default path).
    pub async fn new(max_connections: u32) -> Result<Self, PaymentEngineError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, PaymentEngineError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ---- Seeding helpers for catalog, students and wallets. The managing flows for these live outside the
    // ---- engine (inventory admin, enrollment, top-up channels); the engine only needs a way to get fixtures in.

    pub async fn insert_product(
        &self,
        name: &str,
        unit_price: Centavos,
        stock_quantity: i64,
        available: bool,
    ) -> Result<Product, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        products::insert_product(name, unit_price, stock_quantity, available, &mut conn).await
    }

    pub async fn insert_student(&self, full_name: &str) -> Result<Student, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        students::insert_student(full_name, &mut conn).await
    }

    pub async fn link_student(&self, parent_id: &str, student_id: i64) -> Result<(), PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        students::link_student(parent_id, student_id, &mut conn).await
    }

    pub async fn upsert_wallet(&self, parent_id: &str, balance: Centavos) -> Result<Wallet, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        wallets::upsert_wallet(parent_id, balance, &mut conn).await
    }

    pub async fn ledger_entries_for_order(&self, order_id: i64) -> Result<Vec<LedgerEntry>, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        let entries = ledger::fetch_entries_for_order(order_id, &mut conn).await?;
        Ok(entries)
    }
}

impl AccountManagement for SqliteDatabase {
    async fn owns_student(&self, parent_id: &str, student_id: i64) -> Result<bool, AccountApiError> {
        let mut conn = self.pool.acquire().await.map_err(|e| AccountApiError::DatabaseError(e.to_string()))?;
        let owns = students::owns_student(parent_id, student_id, &mut conn).await?;
        Ok(owns)
    }

    async fn fetch_wallet(&self, parent_id: &str) -> Result<Option<Wallet>, AccountApiError> {
        let mut conn = self.pool.acquire().await.map_err(|e| AccountApiError::DatabaseError(e.to_string()))?;
        let wallet = wallets::fetch_wallet(parent_id, &mut conn).await?;
        Ok(wallet)
    }

    async fn fetch_order_by_id(&self, order_id: i64) -> Result<Option<Order>, AccountApiError> {
        let mut conn = self.pool.acquire().await.map_err(|e| AccountApiError::DatabaseError(e.to_string()))?;
        let order = orders::fetch_order_by_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, AccountApiError> {
        let mut conn = self.pool.acquire().await.map_err(|e| AccountApiError::DatabaseError(e.to_string()))?;
        let items = orders::fetch_order_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn fetch_orders_for_parent(&self, parent_id: &str) -> Result<Vec<Order>, AccountApiError> {
        let mut conn = self.pool.acquire().await.map_err(|e| AccountApiError::DatabaseError(e.to_string()))?;
        let orders = orders::fetch_orders_for_parent(parent_id, &mut conn).await?;
        Ok(orders)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, AccountApiError> {
        let mut conn = self.pool.acquire().await.map_err(|e| AccountApiError::DatabaseError(e.to_string()))?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }
}

impl PaymentEngineDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_order_by_client_id(&self, id: &ClientOrderId) -> Result<Option<Order>, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_client_id(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(product_id, &mut conn).await?;
        Ok(product)
    }

    async fn reserve_stock(&self, product_id: i64, quantity: i64) -> Result<bool, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        products::reserve_stock(product_id, quantity, &mut conn).await
    }

    async fn release_stock(&self, product_id: i64, quantity: i64) -> Result<(), PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        products::release_stock(product_id, quantity, &mut conn).await
    }

    async fn insert_order(
        &self,
        order: &NewOrder,
        lines: &[PricedLine],
        total: Centavos,
        status: OrderStatus,
        payment_status: PaymentStatus,
        payment_due_at: Option<DateTime<Utc>>,
    ) -> Result<Order, PaymentEngineError> {
        let mut tx = self.pool.begin().await?;
        let inserted =
            orders::insert_order(order, lines, total, status, payment_status, payment_due_at, &mut tx).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn delete_order(&self, order_id: i64) -> Result<(), PaymentEngineError> {
        let mut tx = self.pool.begin().await?;
        orders::delete_order(order_id, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn debit_wallet_if_unchanged(
        &self,
        parent_id: &str,
        observed: Centavos,
        amount: Centavos,
    ) -> Result<bool, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        wallets::debit_if_unchanged(parent_id, observed, amount, &mut conn).await
    }

    async fn credit_wallet(&self, parent_id: &str, amount: Centavos) -> Result<(), PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        wallets::credit(parent_id, amount, &mut conn).await
    }

    async fn insert_ledger_entry(
        &self,
        order_id: i64,
        method: PaymentMethod,
        amount: Centavos,
        settlement: SettlementStatus,
    ) -> Result<LedgerEntry, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        ledger::insert_entry(order_id, method, amount, settlement, &mut conn).await
    }

    async fn settle_ledger_entry(&self, order_id: i64, settlement: SettlementStatus) -> Result<(), PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        ledger::settle_entry(order_id, settlement, &mut conn).await
    }

    async fn confirm_cash_payment(
        &self,
        order_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        orders::confirm_cash_payment(order_id, now, &mut conn).await
    }

    async fn cancel_order_if_active(&self, order_id: i64) -> Result<Option<Order>, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        orders::cancel_order_if_active(order_id, &mut conn).await
    }

    async fn sweep_unpaid_orders(&self, now: DateTime<Utc>) -> Result<Vec<Order>, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        orders::sweep_unpaid_orders(now, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), PaymentEngineError> {
        self.pool.close().await;
        Ok(())
    }
}
