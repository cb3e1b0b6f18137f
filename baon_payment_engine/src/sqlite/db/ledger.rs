use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Centavos, LedgerEntry, PaymentMethod, SettlementStatus},
    traits::PaymentEngineError,
};

/// Appends a payment attempt to the audit trail. Rows are never deleted and the amount is never mutated; only
/// the settlement status advances.
pub async fn insert_entry(
    order_id: i64,
    method: PaymentMethod,
    amount: Centavos,
    settlement: SettlementStatus,
    conn: &mut SqliteConnection,
) -> Result<LedgerEntry, PaymentEngineError> {
    let entry: LedgerEntry = sqlx::query_as(
        r#"
        INSERT INTO payment_ledger (order_id, payment_method, amount, settlement) VALUES ($1, $2, $3, $4)
        RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(method.to_string())
    .bind(amount)
    .bind(settlement.to_string())
    .fetch_one(conn)
    .await?;
    trace!("🧾️ Ledger entry {} recorded for order #{order_id}: {amount} via {method} ({settlement})", entry.id);
    Ok(entry)
}

pub async fn settle_entry(
    order_id: i64,
    settlement: SettlementStatus,
    conn: &mut SqliteConnection,
) -> Result<(), PaymentEngineError> {
    sqlx::query("UPDATE payment_ledger SET settlement = $2 WHERE order_id = $1")
        .bind(order_id)
        .bind(settlement.to_string())
        .execute(conn)
        .await?;
    trace!("🧾️ Ledger entry for order #{order_id} settled as {settlement}");
    Ok(())
}

pub async fn fetch_entries_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM payment_ledger WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}
