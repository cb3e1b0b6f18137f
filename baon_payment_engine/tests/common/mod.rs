//! Shared fixtures for the engine integration tests. Each test gets its own throwaway SQLite database.
#![allow(dead_code)]

use baon_payment_engine::{
    db_types::{Centavos, MealPeriod, NewOrder, PaymentMethod, Product},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    OrderFlowApi,
    SqliteDatabase,
};
use chrono::NaiveDate;

pub const PARENT: &str = "parent-maria";
pub const OTHER_PARENT: &str = "parent-jose";

pub async fn setup() -> (SqliteDatabase, OrderFlowApi<SqliteDatabase>) {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 10).await.expect("Error creating database");
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    (db, api)
}

/// Seeds a student linked to [`PARENT`] and returns its id.
pub async fn seed_student(db: &SqliteDatabase, name: &str) -> i64 {
    let student = db.insert_student(name).await.expect("Error inserting student");
    db.link_student(PARENT, student.id).await.expect("Error linking student");
    student.id
}

pub async fn seed_product(db: &SqliteDatabase, name: &str, price_pesos: i64, stock: i64) -> Product {
    db.insert_product(name, Centavos::from_pesos(price_pesos), stock, true).await.expect("Error inserting product")
}

pub fn delivery_date() -> NaiveDate {
    "2024-06-03".parse().unwrap()
}

/// A one-line order for [`PARENT`], keyed by `key` so tests control idempotency explicitly.
pub fn one_line_order(
    key: &str,
    student_id: i64,
    product_id: i64,
    quantity: i64,
    method: PaymentMethod,
) -> NewOrder {
    NewOrder::new(PARENT, student_id, key.to_string().into(), delivery_date(), method).with_line(
        product_id,
        quantity,
        Centavos::from_pesos(65),
        MealPeriod::Lunch,
    )
}

pub async fn stock_of(db: &SqliteDatabase, product_id: i64) -> i64 {
    use baon_payment_engine::traits::PaymentEngineDatabase;
    db.fetch_product(product_id).await.expect("Error fetching product").expect("Product missing").stock_quantity
}

pub async fn balance_of(db: &SqliteDatabase, parent_id: &str) -> Centavos {
    use baon_payment_engine::traits::AccountManagement;
    db.fetch_wallet(parent_id).await.expect("Error fetching wallet").expect("Wallet missing").balance
}
