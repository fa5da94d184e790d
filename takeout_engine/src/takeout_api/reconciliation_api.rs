use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    db_types::OrderStatus,
    order_objects::{OrderUpdate, TIMEOUT_CANCEL_REASON},
    takeout_api::{
        errors::OrderFlowError,
        lifecycle::{next_status, OrderAction},
    },
    traits::{OrderManagement, SweepFailure, SweepResult},
};

/// The two housekeeping sweeps: cancelling orders that were never paid for, and completing deliveries that nobody
/// marked as done.
///
/// Each candidate is updated on its own. A failure on one order is recorded in the [`SweepResult`] and the sweep moves
/// on; the order is picked up again by the next sweep.
#[derive(Clone)]
pub struct ReconciliationApi<B> {
    db: B,
}

impl<B> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B> ReconciliationApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> ReconciliationApi<B>
where B: OrderManagement
{
    /// Cancels every `PendingPayment` order placed more than `threshold` ago, with the reason "order timeout".
    pub async fn run_timeout_sweep(&self, threshold: Duration) -> Result<SweepResult, OrderFlowError> {
        self.sweep(OrderStatus::PendingPayment, threshold, OrderAction::PaymentTimeout, || {
            let now = Utc::now();
            OrderUpdate::default().with_cancel_reason(TIMEOUT_CANCEL_REASON).with_cancel_time(now)
        })
        .await
    }

    /// Completes every `DeliveryInProgress` order placed more than `threshold` ago.
    pub async fn run_stuck_delivery_sweep(&self, threshold: Duration) -> Result<SweepResult, OrderFlowError> {
        self.sweep(OrderStatus::DeliveryInProgress, threshold, OrderAction::DeliveryOverdue, || {
            OrderUpdate::default().with_delivery_time(Utc::now())
        })
        .await
    }

    async fn sweep<F>(
        &self,
        status: OrderStatus,
        threshold: Duration,
        action: OrderAction,
        update: F,
    ) -> Result<SweepResult, OrderFlowError>
    where
        F: Fn() -> OrderUpdate,
    {
        let cutoff = Utc::now() - threshold;
        let candidates = self.db.fetch_stale_orders(status, cutoff).await?;
        trace!("🕰️ {} {status} orders placed before {cutoff} are due for {action}", candidates.len());
        let mut result = SweepResult::default();
        for order in candidates {
            let target = match next_status(order.status, action) {
                Ok(target) => target,
                Err(e) => {
                    result.failed.push(SweepFailure { order_id: order.id, reason: e.to_string() });
                    continue;
                },
            };
            let changes = OrderUpdate { status: Some(target), ..update() };
            match self.db.update_order(order.id, order.version, changes).await {
                Ok(Some(updated)) => {
                    debug!("🕰️ Order [{}] moved to {} ({action})", updated.number, updated.status);
                    result.processed.push(updated);
                },
                Ok(None) => {
                    debug!("🕰️ Order [{}] changed during the sweep. Skipping it.", order.number);
                    result.skipped.push(order.id);
                },
                Err(e) => {
                    warn!("🕰️ Could not apply {action} to order [{}]. It will be retried. {e}", order.number);
                    result.failed.push(SweepFailure { order_id: order.id, reason: e.to_string() });
                },
            }
        }
        Ok(result)
    }
}
