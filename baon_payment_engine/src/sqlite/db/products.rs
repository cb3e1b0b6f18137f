use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Centavos, Product},
    traits::PaymentEngineError,
};

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product =
        sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?;
    Ok(product)
}

/// Conditionally reserves stock for an order line.
///
/// The WHERE clause is the optimistic-concurrency guard: the decrement only lands while the product is still
/// available and still holds at least `quantity` units. Two simultaneous checkouts contending for the last unit
/// therefore resolve to exactly one winner; the loser matches zero rows and gets `false`.
pub async fn reserve_stock(
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, PaymentEngineError> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity - $2, updated_at = CURRENT_TIMESTAMP
        WHERE id = $1 AND available AND stock_quantity >= $2
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .execute(conn)
    .await?;
    let reserved = result.rows_affected() == 1;
    trace!("📦️ Reserve {quantity} x product {product_id}: {}", if reserved { "ok" } else { "lost race" });
    Ok(reserved)
}

/// Returns previously reserved stock. Must mirror the decrement exactly: same product, same quantity.
pub async fn release_stock(
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), PaymentEngineError> {
    sqlx::query("UPDATE products SET stock_quantity = stock_quantity + $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1")
        .bind(product_id)
        .bind(quantity)
        .execute(conn)
        .await?;
    trace!("📦️ Released {quantity} x product {product_id}");
    Ok(())
}

/// Adds a catalog item. Inventory management proper lives outside the engine; this is used by seeding and tests.
pub async fn insert_product(
    name: &str,
    unit_price: Centavos,
    stock_quantity: i64,
    available: bool,
    conn: &mut SqliteConnection,
) -> Result<Product, PaymentEngineError> {
    let product = sqlx::query_as(
        r#"
        INSERT INTO products (name, unit_price, stock_quantity, available) VALUES ($1, $2, $3, $4)
        RETURNING *;
        "#,
    )
    .bind(name)
    .bind(unit_price)
    .bind(stock_quantity)
    .bind(available)
    .fetch_one(conn)
    .await?;
    Ok(product)
}
