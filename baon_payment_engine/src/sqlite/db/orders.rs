use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{
        Centavos,
        ClientOrderId,
        NewOrder,
        Order,
        OrderItem,
        OrderStatus,
        PaymentStatus,
        PricedLine,
    },
    order_objects::OrderQueryFilter,
    traits::PaymentEngineError,
};

/// Returns the order carrying the given idempotency key, if any.
pub async fn fetch_order_by_client_id(
    id: &ClientOrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE client_order_id = $1")
        .bind(id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_by_id(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Inserts a new order and its line items using the given connection. Not atomic on its own: embed the call in a
/// transaction and pass `&mut *tx` as the connection argument.
///
/// A unique violation on the idempotency key maps to [`PaymentEngineError::OrderAlreadyExists`], which the engine
/// resolves as a concurrent idempotent replay.
pub async fn insert_order(
    order: &NewOrder,
    lines: &[PricedLine],
    total: Centavos,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_due_at: Option<DateTime<Utc>>,
    conn: &mut SqliteConnection,
) -> Result<Order, PaymentEngineError> {
    let inserted: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                client_order_id,
                parent_id,
                student_id,
                scheduled_for,
                total_amount,
                payment_method,
                status,
                payment_status,
                payment_due_at,
                notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *;
        "#,
    )
    .bind(order.client_order_id.as_str())
    .bind(&order.parent_id)
    .bind(order.student_id)
    .bind(order.scheduled_for)
    .bind(total)
    .bind(order.payment_method.to_string())
    .bind(status.to_string())
    .bind(payment_status.to_string())
    .bind(payment_due_at)
    .bind(&order.notes)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            PaymentEngineError::OrderAlreadyExists(order.client_order_id.clone())
        },
        _ => PaymentEngineError::from(e),
    })?;
    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, unit_price, meal_period)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(inserted.id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.meal_period.to_string())
        .execute(&mut *conn)
        .await?;
    }
    debug!("📝️ Order {} inserted with id {}", inserted.client_order_id, inserted.id);
    Ok(inserted)
}

/// Removes an order and its items. Compensation path only: called when the wallet debit fails after the order
/// row was already inserted.
pub async fn delete_order(order_id: i64, conn: &mut SqliteConnection) -> Result<(), PaymentEngineError> {
    sqlx::query("DELETE FROM order_items WHERE order_id = $1").bind(order_id).execute(&mut *conn).await?;
    sqlx::query("DELETE FROM orders WHERE id = $1").bind(order_id).execute(conn).await?;
    debug!("📝️ Order #{order_id} deleted (compensation)");
    Ok(())
}

/// Marks a cash order as paid, iff it is still awaiting payment and inside its payment window.
///
/// The conditional WHERE clause doubles as the guard against racing the timeout sweep: whichever transition
/// lands first wins and the other matches zero rows.
pub async fn confirm_cash_payment(
    order_id: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, PaymentEngineError> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders
        SET status = 'pending', payment_status = 'paid', updated_at = CURRENT_TIMESTAMP
        WHERE id = $1
          AND payment_method = 'cash'
          AND status = 'awaiting_payment'
          AND payment_status = 'awaiting_payment'
          AND payment_due_at >= $2
        RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(now)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Cancels an order iff it has not progressed past a cancellable state. The guard and the mutation are one
/// statement, so an order that the kitchen just moved to `preparing` cannot be cancelled by a racing request.
/// A paid order's payment status flips to `refunded` in the same statement.
pub async fn cancel_order_if_active(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, PaymentEngineError> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders
        SET status = 'cancelled',
            payment_status = CASE WHEN payment_status = 'paid' THEN 'refunded' ELSE payment_status END,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $1 AND status IN ('pending', 'awaiting_payment')
        RETURNING *;
        "#,
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Cancels every cash order whose payment deadline has lapsed, in a single guarded update, and returns them.
///
/// The `status` guard matters: an order the parent already cancelled keeps `payment_status = 'awaiting_payment'`
/// and had its stock restored at cancellation time, so it must never match a sweep.
pub async fn sweep_unpaid_orders(
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, PaymentEngineError> {
    let rows = sqlx::query_as(
        r#"
        UPDATE orders
        SET status = 'cancelled', payment_status = 'timeout', updated_at = CURRENT_TIMESTAMP
        WHERE status = 'awaiting_payment' AND payment_status = 'awaiting_payment' AND payment_due_at < $1
        RETURNING *;
        "#,
    )
    .bind(now)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn fetch_orders_for_parent(parent_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE parent_id = $1 ORDER BY created_at ASC")
        .bind(parent_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`.
///
/// Resulting orders are ordered by `created_at` in ascending order.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(parent_id) = query.parent_id {
        where_clause.push("parent_id = ");
        where_clause.push_bind_unseparated(parent_id);
    }
    if let Some(student_id) = query.student_id {
        where_clause.push("student_id = ");
        where_clause.push_bind_unseparated(student_id);
    }
    if let Some(date) = query.scheduled_for {
        where_clause.push("scheduled_for = ");
        where_clause.push_bind_unseparated(date);
    }
    if query.status.as_ref().map(|s| !s.is_empty()).unwrap_or(false) {
        let statuses =
            query.status.as_ref().unwrap().iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    if query.payment_status.as_ref().map(|s| !s.is_empty()).unwrap_or(false) {
        let statuses =
            query.payment_status.as_ref().unwrap().iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
        where_clause.push(format!("payment_status IN ({statuses})"));
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at ASC");

    trace!("📝️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("📝️ Result of search_orders: {} rows", orders.len());
    Ok(orders)
}
