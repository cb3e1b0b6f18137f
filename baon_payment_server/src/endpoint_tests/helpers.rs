//! Fixtures for the endpoint tests: a migrated throwaway database and a fully-wired test app.
use actix_web::web::{self, ServiceConfig};
use baon_common::Secret;
use baon_payment_engine::{
    db_types::Centavos,
    events::EventProducers,
    test_utils::prepare_env::prepare_test_env,
    AccountApi,
    CheckoutApi,
    OrderFlowApi,
    SqliteDatabase,
};
use chrono::Duration;
use tempfile::TempDir;

use crate::{
    auth::{Role, TokenIssuer},
    routes::{cancel_order, checkout, confirm_cash_payment, health, my_orders, my_wallet, submit_order},
};

pub const PARENT: &str = "parent-maria";
pub const OTHER_PARENT: &str = "parent-jose";
pub const STAFF: &str = "staff-lita";

/// The TempDir must outlive the test or the database file disappears from under the pool.
pub async fn test_db() -> (TempDir, SqliteDatabase) {
    let dir = tempfile::tempdir().expect("Could not create temp dir");
    let url = format!("sqlite://{}/baon_endpoint_test.db", dir.path().display());
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    (dir, db)
}

pub fn issuer() -> TokenIssuer {
    TokenIssuer::new(&Secret::new("endpoint-test-secret".to_string()))
}

pub fn token_for(issuer: &TokenIssuer, sub: &str, role: Role) -> String {
    issuer.issue_token(sub, role, Duration::hours(1)).expect("Could not issue token")
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

/// Wires the same services as the production app factory, against the given database.
pub fn configure(db: SqliteDatabase, issuer: TokenIssuer) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let orders_api = OrderFlowApi::new(db.clone(), EventProducers::default());
        let checkout_api = CheckoutApi::new(OrderFlowApi::new(db.clone(), EventProducers::default()));
        let accounts_api = AccountApi::new(db.clone());
        cfg.app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(accounts_api))
            .app_data(web::Data::new(issuer))
            .service(health)
            .service(submit_order)
            .service(checkout)
            .service(confirm_cash_payment)
            .service(cancel_order)
            .service(my_orders)
            .service(my_wallet);
    }
}

/// Seeds a student linked to [`PARENT`] plus a product, and returns their ids.
pub async fn seed_catalog(db: &SqliteDatabase, product: &str, price_pesos: i64, stock: i64) -> (i64, i64) {
    let student = db.insert_student("Ana Santos").await.expect("Error inserting student");
    db.link_student(PARENT, student.id).await.expect("Error linking student");
    let product =
        db.insert_product(product, Centavos::from_pesos(price_pesos), stock, true).await.expect("Error inserting product");
    (student.id, product.id)
}
