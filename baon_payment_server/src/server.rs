use std::{pin::Pin, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use baon_payment_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    AccountApi,
    CheckoutApi,
    OrderFlowApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    auth::TokenIssuer,
    config::ServerConfig,
    errors::ServerError,
    routes::{cancel_order, checkout, confirm_cash_payment, health, my_orders, my_wallet, submit_order},
    sweeper::start_sweeper_worker,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(16, default_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    start_sweeper_worker(db.clone(), producers.clone(), config.sweep_interval_secs);
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::BackendError(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone())
            .with_cash_payment_window(config.cash_payment_window);
        let checkout_api = CheckoutApi::new(
            OrderFlowApi::new(db.clone(), producers.clone()).with_cash_payment_window(config.cash_payment_window),
        );
        let accounts_api = AccountApi::new(db.clone());
        let token_issuer = TokenIssuer::new(&config.jwt_secret);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("baon::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(accounts_api))
            .app_data(web::Data::new(token_issuer))
            .service(health)
            .service(submit_order)
            .service(checkout)
            .service(confirm_cash_payment)
            .service(cancel_order)
            .service(my_orders)
            .service(my_wallet)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// The stock hooks: log-only. Real notification channels (push, SMS) subscribe here without touching the engine.
fn default_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(|ev| {
        Box::pin(async move {
            info!("📣️ Order #{} is paid ({})", ev.order.id, ev.order.total_amount);
        }) as Pin<Box<dyn std::future::Future<Output = ()> + Send>>
    });
    hooks.on_order_cancelled(|ev| {
        Box::pin(async move {
            info!("📣️ Order #{} cancelled ({:?})", ev.order.id, ev.reason);
        }) as Pin<Box<dyn std::future::Future<Output = ()> + Send>>
    });
    hooks
}
