use chrono::{DateTime, Days, NaiveTime, TimeZone, Utc};
use log::*;
use takeout_engine::{traits::SweepResult, ReconciliationApi, SqliteDatabase};
use tokio::task::JoinHandle;

use crate::config::SweepConfig;

/// Starts the unpaid order sweep. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_timeout_sweeper(db: SqliteDatabase, config: SweepConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(config.timeout_sweep_interval);
        let api = ReconciliationApi::new(db);
        info!("🕰️ Unpaid order sweep started");
        loop {
            timer.tick().await;
            trace!("🕰️ Running unpaid order sweep");
            match api.run_timeout_sweep(config.pending_payment_timeout).await {
                Ok(result) => log_sweep("Unpaid order sweep", &result),
                Err(e) => error!("🕰️ Error running unpaid order sweep: {e}"),
            }
        }
    })
}

/// Starts the daily stuck-delivery sweep. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_delivery_sweeper(db: SqliteDatabase, config: SweepConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let api = ReconciliationApi::new(db);
        info!("🕰️ Stuck delivery sweep started. It runs daily at {:02}:00 UTC", config.delivery_sweep_hour);
        loop {
            let now = Utc::now();
            let next = next_daily_run(now, config.delivery_sweep_hour);
            let wait = (next - now).to_std().unwrap_or_default();
            debug!("🕰️ Next stuck delivery sweep at {next}");
            tokio::time::sleep(wait).await;
            match api.run_stuck_delivery_sweep(config.stuck_delivery_timeout).await {
                Ok(result) => log_sweep("Stuck delivery sweep", &result),
                Err(e) => error!("🕰️ Error running stuck delivery sweep: {e}"),
            }
        }
    })
}

/// The first `hour`:00 UTC that is strictly after `now`.
pub fn next_daily_run(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or_default();
    let today = Utc.from_utc_datetime(&now.date_naive().and_time(time));
    if today > now {
        today
    } else {
        today.checked_add_days(Days::new(1)).unwrap_or(today)
    }
}

fn log_sweep(name: &str, result: &SweepResult) {
    if result.processed.is_empty() && result.skipped.is_empty() && result.failed.is_empty() {
        trace!("🕰️ {name}: nothing to do");
        return;
    }
    info!(
        "🕰️ {name}: {} processed, {} skipped, {} failed",
        result.processed_count(),
        result.skipped_count(),
        result.failed_count()
    );
    if !result.processed.is_empty() {
        let orders = result.processed.iter().map(|o| format!("[{}] {}", o.id, o.number)).collect::<Vec<_>>();
        debug!("🕰️ {name} updated: {}", orders.join(", "));
    }
    for failure in &result.failed {
        warn!("🕰️ {name} could not update order #{}. {}. It will be retried.", failure.order_id, failure.reason);
    }
}
