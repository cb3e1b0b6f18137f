use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Centavos, Wallet},
    traits::PaymentEngineError,
};

pub async fn fetch_wallet(parent_id: &str, conn: &mut SqliteConnection) -> Result<Option<Wallet>, sqlx::Error> {
    let wallet =
        sqlx::query_as("SELECT * FROM wallets WHERE parent_id = $1").bind(parent_id).fetch_optional(conn).await?;
    Ok(wallet)
}

/// Compare-and-swap debit: subtracts `amount` only while the balance still equals the value observed at
/// validation time. A concurrent deduction in the check-to-use window makes this match zero rows, and the caller
/// must compensate and retry rather than double-spend.
pub async fn debit_if_unchanged(
    parent_id: &str,
    observed: Centavos,
    amount: Centavos,
    conn: &mut SqliteConnection,
) -> Result<bool, PaymentEngineError> {
    let result = sqlx::query(
        r#"
        UPDATE wallets
        SET balance = balance - $3, updated_at = CURRENT_TIMESTAMP
        WHERE parent_id = $1 AND balance = $2
        "#,
    )
    .bind(parent_id)
    .bind(observed)
    .bind(amount)
    .execute(conn)
    .await?;
    let debited = result.rows_affected() == 1;
    trace!("💰️ Debit {amount} from wallet of {parent_id}: {}", if debited { "ok" } else { "lost race" });
    Ok(debited)
}

/// Unconditionally credits a wallet. Used by the refund path, where adding funds cannot conflict with the
/// non-negativity invariant.
pub async fn credit(parent_id: &str, amount: Centavos, conn: &mut SqliteConnection) -> Result<(), PaymentEngineError> {
    sqlx::query("UPDATE wallets SET balance = balance + $2, updated_at = CURRENT_TIMESTAMP WHERE parent_id = $1")
        .bind(parent_id)
        .bind(amount)
        .execute(conn)
        .await?;
    trace!("💰️ Credited {amount} to wallet of {parent_id}");
    Ok(())
}

/// Creates a wallet, or resets its balance when one exists. Top-ups proper are handled by out-of-scope payment
/// channels; this is used by seeding and tests.
pub async fn upsert_wallet(
    parent_id: &str,
    balance: Centavos,
    conn: &mut SqliteConnection,
) -> Result<Wallet, PaymentEngineError> {
    let wallet = sqlx::query_as(
        r#"
        INSERT INTO wallets (parent_id, balance) VALUES ($1, $2)
        ON CONFLICT (parent_id) DO UPDATE SET balance = excluded.balance, updated_at = CURRENT_TIMESTAMP
        RETURNING *;
        "#,
    )
    .bind(parent_id)
    .bind(balance)
    .fetch_one(conn)
    .await?;
    Ok(wallet)
}
