use chrono::Duration;
use log::*;
use token_sale_engine::{db_types::Order, OrderFlowApi, SqliteDatabase, WalletApi};
use tokio::task::JoinHandle;

const SWEEP_INTERVAL_SECS: u64 = 60;

/// Starts the order expiry worker. Do not await the returned JoinHandle, as it will run
/// indefinitely.
pub fn start_expiry_worker(db: SqliteDatabase, unpaid_timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(SWEEP_INTERVAL_SECS));
        let api = OrderFlowApi::new(db);
        info!("🕰️ Order expiry worker started");
        loop {
            timer.tick().await;
            trace!("🕰️ Running order expiry job");
            match api.expire_old_orders(unpaid_timeout).await {
                Ok(expired) if expired.is_empty() => {},
                Ok(expired) => {
                    info!("🕰️ {} orders expired", expired.len());
                    debug!("🕰️ Expired orders: {}", order_list(&expired));
                },
                Err(e) => {
                    error!("🕰️ Error running order expiry job: {e}");
                },
            }
        }
    })
}

/// Starts the crediting worker, which sweeps for confirmed-but-uncredited payments and applies
/// them to wallets. Safe against overlap with the admin-triggered sweep: crediting is gated per
/// payment by the atomic `credited` flip.
pub fn start_credit_worker(db: SqliteDatabase, min_confirmations: i64, referral_rates: Vec<f64>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(SWEEP_INTERVAL_SECS));
        let api = WalletApi::new(db);
        info!("🕰️ Payment crediting worker started");
        loop {
            timer.tick().await;
            trace!("🕰️ Running crediting job");
            match api.credit_eligible_payments(min_confirmations, &referral_rates).await {
                Ok(summary) if summary.total() == 0 => {},
                Ok(summary) => {
                    info!("🕰️ Crediting sweep: {} credited, {} skipped", summary.credited, summary.skipped);
                },
                Err(e) => {
                    error!("🕰️ Error running crediting job: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] user: {} address: {}", o.id, o.user_id, o.address))
        .collect::<Vec<String>>()
        .join(", ")
}
