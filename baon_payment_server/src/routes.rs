//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers are async and delegate every long operation (all database work) to the engine APIs; nothing here may
//! block a worker thread.
use actix_web::{get, post, web, HttpResponse, Responder};
use baon_payment_engine::{
    order_objects::{OrderOutcome, Requester},
    AccountApi,
    CheckoutApi,
    OrderFlowApi,
    SqliteDatabase,
};
use chrono::Utc;
use log::*;
use serde_json::json;

use crate::{
    auth::JwtClaims,
    data_objects::{
        CancelResponse,
        CheckoutPayload,
        CheckoutResponse,
        ConfirmResponse,
        OrderPayload,
        OrderResponse,
        WalletResponse,
    },
    errors::ServerError,
};

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

/// Route handler for single-order submission.
///
/// Duplicate submissions (same `client_order_id`) are resolved to the original order and reported as a 409 with
/// the existing order's id and state, per the idempotency contract.
#[post("/orders")]
pub async fn submit_order(
    claims: JwtClaims,
    api: web::Data<OrderFlowApi<SqliteDatabase>>,
    body: web::Json<OrderPayload>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received order submission from {}", claims.sub);
    let order = body.into_inner().into_new_order(claims.sub);
    match api.process_order(order).await? {
        OrderOutcome::Created(confirmation) => Ok(HttpResponse::Ok().json(OrderResponse::from(confirmation))),
        OrderOutcome::Duplicate(existing) => Ok(HttpResponse::Conflict().json(json!({
            "error": "DUPLICATE_ORDER",
            "existing_order_id": existing.order_id,
            "status": existing.status,
            "total_amount": existing.total_amount,
        }))),
    }
}

/// Route handler for cart checkout.
///
/// The cart is partitioned by (student, delivery date) and each partition is submitted independently; the
/// response lists the partitions that became orders and the ones that failed (and therefore stay in the cart).
#[post("/checkout")]
pub async fn checkout(
    claims: JwtClaims,
    api: web::Data<CheckoutApi<SqliteDatabase>>,
    body: web::Json<CheckoutPayload>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received checkout from {}", claims.sub);
    let request = body.into_inner().into_request(claims.sub);
    let result = api.checkout(request).await?;
    Ok(HttpResponse::Ok().json(CheckoutResponse::from(result)))
}

/// Route handler for counter staff confirming a cash payment.
#[post("/orders/{id}/confirm-cash-payment")]
pub async fn confirm_cash_payment(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    if !claims.is_staff() {
        warn!("💻️ {} tried to confirm a cash payment without the staff role", claims.sub);
        return Err(ServerError::InsufficientPermissions("Only staff may confirm cash payments".to_string()));
    }
    let order_id = path.into_inner();
    let order = api.confirm_cash_payment(order_id, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(ConfirmResponse {
        order_id: order.id,
        status: order.status,
        payment_status: order.payment_status,
    }))
}

/// Route handler for cancelling an order. Parents may cancel their own orders; staff may cancel any order that
/// has not progressed past a cancellable state.
#[post("/orders/{id}/cancel")]
pub async fn cancel_order(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let requester = if claims.is_staff() { Requester::Staff } else { Requester::Parent(claims.sub) };
    let outcome = api.cancel_order(order_id, &requester).await?;
    Ok(HttpResponse::Ok().json(CancelResponse::from(outcome)))
}

/// Route handler for the calling parent's order history.
#[get("/orders")]
pub async fn my_orders(
    claims: JwtClaims,
    api: web::Data<AccountApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let orders = api.orders_for_parent(&claims.sub).await.map_err(|e| ServerError::BackendError(e.to_string()))?;
    Ok(HttpResponse::Ok().json(orders))
}

/// Route handler for the calling parent's wallet.
#[get("/wallet")]
pub async fn my_wallet(
    claims: JwtClaims,
    api: web::Data<AccountApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let wallet = api.wallet(&claims.sub).await.map_err(|e| ServerError::BackendError(e.to_string()))?;
    match wallet {
        Some(w) => Ok(HttpResponse::Ok().json(WalletResponse::from(w))),
        None => Ok(HttpResponse::NotFound().json(json!({ "error": "NO_WALLET" }))),
    }
}
