use baon_payment_engine::{events::EventProducers, OrderFlowApi, SqliteDatabase};
use chrono::Utc;
use log::*;
use tokio::task::JoinHandle;

/// Starts the payment lifecycle sweeper. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every tick, the sweeper cancels cash orders whose payment deadline has lapsed and restores their stock.
/// Persistence failures are treated as transient: the pass is logged and retried on the next tick.
pub fn start_sweeper_worker(db: SqliteDatabase, producers: EventProducers, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        let api = OrderFlowApi::new(db, producers);
        info!("🕰️ Unpaid order sweeper started (every {interval_secs}s)");
        loop {
            timer.tick().await;
            trace!("🕰️ Running unpaid order sweep");
            match api.sweep_unpaid_orders(Utc::now()).await {
                Ok(result) if result.is_empty() => {
                    trace!("🕰️ Nothing to sweep");
                },
                Ok(result) => {
                    info!("🕰️ {} unpaid cash orders cancelled", result.count());
                    debug!("🕰️ Swept orders: {}", order_list(&result.cancelled));
                },
                Err(e) => {
                    error!("🕰️ Error running unpaid order sweep: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[baon_payment_engine::db_types::Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] {} for student {} due {:?}", o.id, o.client_order_id, o.student_id, o.payment_due_at))
        .collect::<Vec<String>>()
        .join(", ")
}
