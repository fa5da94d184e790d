use std::{
    fmt::Debug,
    sync::atomic::{AtomicI64, Ordering},
};

use chrono::{DateTime, Utc};
use log::*;
use rand::{distributions::Alphanumeric, Rng};

use crate::{
    db_types::{Order, OrderDraft, OrderStatus, PayStatus},
    notifications::{NotificationHub, OrderNotification},
    order_objects::{
        order_dishes_summary,
        OrderQueryFilter,
        OrderSearchRecord,
        OrderStatistics,
        OrderSubmitted,
        OrderUpdate,
        OrderWithLines,
        PageResult,
        Pagination,
        PaymentMode,
        SubmitOrderRequest,
        USER_CANCEL_REASON,
    },
    takeout_api::{
        errors::{BusinessError, OrderFlowError},
        lifecycle::{next_status, OrderAction},
    },
    traits::{OrderManagement, PaymentIntent, PaymentProvider, PaymentSigningMaterial, RefundRequest},
};

static LAST_ORDER_NUMBER: AtomicI64 = AtomicI64::new(0);

const MAX_SETTLE_ATTEMPTS: usize = 5;

/// Order numbers are the submission time in milliseconds. Two submissions in the same millisecond get consecutive
/// numbers, so numbers handed out by this process are strictly increasing.
pub fn next_order_number(now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis();
    let previous = LAST_ORDER_NUMBER
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(millis.max(last + 1)))
        .unwrap_or_else(|last| last);
    millis.max(previous + 1).to_string()
}

/// `OrderFlowApi` is the order lifecycle engine. It turns carts into orders, records payments, and applies every
/// operator and customer action to an order, refunding through the payment provider where needed.
///
/// Every status change goes through [`next_status`] and is written as a compare-and-set against the version that was
/// read, so two concurrent actions on the same order can never both take effect.
#[derive(Clone)]
pub struct OrderFlowApi<B, P> {
    db: B,
    provider: P,
    hub: NotificationHub,
    payment_mode: PaymentMode,
}

impl<B, P> Debug for OrderFlowApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({:?} payments, {:?})", self.payment_mode, self.hub)
    }
}

impl<B, P> OrderFlowApi<B, P> {
    pub fn new(db: B, provider: P, hub: NotificationHub, payment_mode: PaymentMode) -> Self {
        Self { db, provider, hub, payment_mode }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    pub fn payment_mode(&self) -> PaymentMode {
        self.payment_mode
    }
}

impl<B, P> OrderFlowApi<B, P>
where
    B: OrderManagement,
    P: PaymentProvider,
{
    /// Converts the user's cart into a new order, in a single transaction.
    pub async fn submit_order(&self, user_id: i64, req: SubmitOrderRequest) -> Result<OrderSubmitted, OrderFlowError> {
        let now = Utc::now();
        let draft = OrderDraft {
            number: next_order_number(now),
            user_id,
            address_book_id: req.address_book_id,
            order_time: now,
            pay_method: req.pay_method,
            amount: req.amount,
            pack_amount: req.pack_amount,
            remark: req.remark,
            estimated_delivery_time: req.estimated_delivery_time,
            delivery_status: req.delivery_status,
            tableware_number: req.tableware_number,
            tableware_status: req.tableware_status,
        };
        let (order, lines) = self.db.create_order_from_cart(draft).await.map_err(|e| {
            info!("🧾️ User #{user_id} could not submit an order. {e}");
            OrderFlowError::from(e)
        })?;
        info!(
            "🧾️ Order [{}] submitted by user #{user_id}. {} lines, {} in total.",
            order.number,
            lines.len(),
            order.amount
        );
        Ok(OrderSubmitted::from(&order))
    }

    /// Starts the payment for one of the user's own orders.
    ///
    /// In [`PaymentMode::Bypass`], the order is marked as paid immediately and placeholder signing material is
    /// returned. In [`PaymentMode::Gateway`], a payment intent is opened at the provider and the order is marked as
    /// paid when the provider's callback arrives.
    pub async fn request_payment(
        &self,
        user_id: i64,
        order_number: &str,
    ) -> Result<PaymentSigningMaterial, OrderFlowError> {
        let order = self
            .db
            .fetch_order_by_number(order_number)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(BusinessError::OrderNotFound)?;
        if order.is_paid() {
            return Err(BusinessError::OrderPaid.into());
        }
        if order.status != OrderStatus::PendingPayment {
            return Err(BusinessError::OrderStatusError.into());
        }
        match self.payment_mode {
            PaymentMode::Bypass => {
                debug!("🧾️ Payment gateway is bypassed. Order [{order_number}] is treated as paid.");
                self.pay_success(order_number).await?;
                Ok(bypass_signing_material(order_number))
            },
            PaymentMode::Gateway => {
                let payer_ref = self
                    .db
                    .fetch_user(user_id)
                    .await?
                    .and_then(|u| u.openid)
                    .filter(|openid| !openid.is_empty())
                    .ok_or(BusinessError::MissingPayerReference)?;
                let intent = PaymentIntent {
                    order_number: order.number.clone(),
                    description: format!("Takeout order {}", order.number),
                    amount: order.amount,
                    payer_ref,
                };
                let material = self.provider.create_payment_intent(intent).await.map_err(|e| {
                    warn!("🧾️ Could not open a payment for order [{order_number}]. {e}");
                    OrderFlowError::from(e)
                })?;
                debug!("🧾️ Payment intent opened for order [{order_number}]");
                Ok(material)
            },
        }
    }

    /// Records a successful payment for the order with the given number and notifies the dashboards.
    ///
    /// Only a `PendingPayment` order moves to `ToBeConfirmed`, and only then are the dashboards notified and the order
    /// returned. For an order that is already paid or refunded this is a no-op. A payment for an order that was
    /// cancelled before the money arrived is refunded straight away and recorded as `Refunded`; the order stays
    /// cancelled and `None` is returned.
    ///
    /// If the order keeps changing underneath, an [`OrderFlowError::Internal`] is returned so that the provider
    /// delivers the payment again.
    pub async fn pay_success(&self, order_number: &str) -> Result<Option<Order>, OrderFlowError> {
        for _ in 0..MAX_SETTLE_ATTEMPTS {
            let order = self.db.fetch_order_by_number(order_number).await?.ok_or(BusinessError::OrderNotFound)?;
            if order.is_paid() || order.pay_status == PayStatus::Refunded {
                debug!("🧾️ Order [{order_number}] is already {}. Nothing to do.", order.pay_status);
                return Ok(None);
            }
            if order.status != OrderStatus::PendingPayment {
                warn!(
                    "🧾️ A payment arrived for order [{order_number}], which is {}. The money will be returned.",
                    order.status
                );
                self.refund(&order).await?;
                let update = OrderUpdate::default().with_pay_status(PayStatus::Refunded);
                self.settle_refund(order.id, OrderAction::RefundIssued, update).await?;
                return Ok(None);
            }
            let update = OrderUpdate::default().with_pay_status(PayStatus::Paid).with_checkout_time(Utc::now());
            match self.apply(&order, OrderAction::PaymentSucceeded, update).await {
                Ok(paid) => {
                    info!("🧾️ Order [{order_number}] has been paid");
                    let report = self.hub.broadcast(&OrderNotification::new_order(paid.id, &paid.number));
                    trace!("🧾️ New order notification sent to {} dashboards", report.delivered);
                    return Ok(Some(paid));
                },
                // A redelivery of the same callback or a timeout cancel got there first. Look again.
                Err(OrderFlowError::Business(BusinessError::ConcurrentModification)) => continue,
                Err(e) => return Err(e),
            }
        }
        error!("🧾️ Order [{order_number}] kept changing while its payment was being recorded");
        Err(OrderFlowError::Internal(format!("payment for order [{order_number}] could not be recorded")))
    }

    //-----------------------------------------   Queries    --------------------------------------------------------
    /// A page of the user's own orders, newest first, each with its lines.
    pub async fn user_history(
        &self,
        user_id: i64,
        page: Pagination,
        status: Option<OrderStatus>,
    ) -> Result<PageResult<OrderWithLines>, OrderFlowError> {
        let mut query = OrderQueryFilter::default().with_user_id(user_id);
        if let Some(status) = status {
            query = query.with_status(status);
        }
        let (total, orders) = self.db.search_orders(query, page).await?;
        let mut records = Vec::with_capacity(orders.len());
        for order in orders {
            let order_detail_list = self.db.fetch_order_lines(order.id).await?;
            records.push(OrderWithLines { order, order_detail_list });
        }
        Ok(PageResult { total, records })
    }

    /// Any order with its lines. For the back office.
    pub async fn order_detail(&self, order_id: i64) -> Result<OrderWithLines, OrderFlowError> {
        let order = self.fetch_order(order_id).await?;
        let order_detail_list = self.db.fetch_order_lines(order.id).await?;
        Ok(OrderWithLines { order, order_detail_list })
    }

    /// One of the user's own orders with its lines. Orders of other users are reported as not found.
    pub async fn user_order_detail(&self, user_id: i64, order_id: i64) -> Result<OrderWithLines, OrderFlowError> {
        let order = self.fetch_user_order(user_id, order_id).await?;
        let order_detail_list = self.db.fetch_order_lines(order.id).await?;
        Ok(OrderWithLines { order, order_detail_list })
    }

    pub async fn search_orders(
        &self,
        query: OrderQueryFilter,
        page: Pagination,
    ) -> Result<PageResult<OrderSearchRecord>, OrderFlowError> {
        trace!("🧾️ Searching orders. {query}");
        let (total, orders) = self.db.search_orders(query, page).await?;
        let mut records = Vec::with_capacity(orders.len());
        for order in orders {
            let lines = self.db.fetch_order_lines(order.id).await?;
            records.push(OrderSearchRecord { order_dishes: order_dishes_summary(&lines), order });
        }
        Ok(PageResult { total, records })
    }

    pub async fn statistics(&self) -> Result<OrderStatistics, OrderFlowError> {
        Ok(OrderStatistics {
            to_be_confirmed: self.db.count_orders_with_status(OrderStatus::ToBeConfirmed).await?,
            confirmed: self.db.count_orders_with_status(OrderStatus::Confirmed).await?,
            delivery_in_progress: self.db.count_orders_with_status(OrderStatus::DeliveryInProgress).await?,
        })
    }

    //---------------------------------------   Back office   -------------------------------------------------------
    pub async fn confirm(&self, order_id: i64) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(order_id).await?;
        let confirmed = self.apply(&order, OrderAction::Confirm, OrderUpdate::default()).await?;
        info!("🧾️ Order [{}] confirmed", confirmed.number);
        Ok(confirmed)
    }

    /// Rejects an order that has not left the shop yet. A paid order is refunded first.
    pub async fn reject(&self, order_id: i64, reason: &str) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(order_id).await?;
        let update = OrderUpdate::default().with_rejection_reason(reason).with_cancel_time(Utc::now());
        let rejected = self.cancel_with_refund(&order, OrderAction::Reject, update).await?;
        info!("🧾️ Order [{}] rejected. {reason}", rejected.number);
        Ok(rejected)
    }

    /// Cancels an order that has not left the shop yet. A paid order is refunded first.
    pub async fn admin_cancel(&self, order_id: i64, reason: &str) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(order_id).await?;
        let update = OrderUpdate::default().with_cancel_reason(reason).with_cancel_time(Utc::now());
        let cancelled = self.cancel_with_refund(&order, OrderAction::AdminCancel, update).await?;
        info!("🧾️ Order [{}] cancelled by the shop. {reason}", cancelled.number);
        Ok(cancelled)
    }

    pub async fn deliver(&self, order_id: i64) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(order_id).await?;
        let delivering = self.apply(&order, OrderAction::Deliver, OrderUpdate::default()).await?;
        info!("🧾️ Order [{}] is out for delivery", delivering.number);
        Ok(delivering)
    }

    pub async fn complete(&self, order_id: i64) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(order_id).await?;
        let update = OrderUpdate::default().with_delivery_time(Utc::now());
        let completed = self.apply(&order, OrderAction::Complete, update).await?;
        info!("🧾️ Order [{}] completed", completed.number);
        Ok(completed)
    }

    //---------------------------------------    Customer     -------------------------------------------------------
    /// Cancels one of the user's own orders, as long as the shop has not accepted it yet. A paid order is refunded
    /// first.
    pub async fn user_cancel(&self, user_id: i64, order_id: i64) -> Result<Order, OrderFlowError> {
        let order = self.fetch_user_order(user_id, order_id).await?;
        let update = OrderUpdate::default().with_cancel_reason(USER_CANCEL_REASON).with_cancel_time(Utc::now());
        let cancelled = self.cancel_with_refund(&order, OrderAction::UserCancel, update).await?;
        info!("🧾️ Order [{}] cancelled by user #{user_id}", cancelled.number);
        Ok(cancelled)
    }

    /// Pushes a reminder for one of the user's own orders to the dashboards. The order itself does not change.
    pub async fn remind(&self, user_id: i64, order_id: i64) -> Result<(), OrderFlowError> {
        let order = self.fetch_user_order(user_id, order_id).await?;
        let report = self.hub.broadcast(&OrderNotification::reminder(order.id, &order.number));
        debug!("🧾️ Reminder for order [{}] sent to {} dashboards", order.number, report.delivered);
        Ok(())
    }

    //---------------------------------------    Internals    -------------------------------------------------------
    async fn fetch_order(&self, order_id: i64) -> Result<Order, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(BusinessError::OrderNotFound)?;
        Ok(order)
    }

    async fn fetch_user_order(&self, user_id: i64, order_id: i64) -> Result<Order, OrderFlowError> {
        let order = self
            .db
            .fetch_order(order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(BusinessError::OrderNotFound)?;
        Ok(order)
    }

    /// Moves `order` along `action`, writing `update` in the same statement. Fails if the transition is not allowed
    /// from the order's current status, or if the order changed since it was read.
    pub(crate) async fn apply(
        &self,
        order: &Order,
        action: OrderAction,
        update: OrderUpdate,
    ) -> Result<Order, OrderFlowError> {
        let status = next_status(order.status, action).map_err(|e| {
            info!("🧾️ Cannot {action} order [{}] while it is {}", order.number, order.status);
            e
        })?;
        let update = OrderUpdate { status: Some(status), ..update };
        let updated = self.db.update_order(order.id, order.version, update).await?.ok_or_else(|| {
            warn!("🧾️ Order [{}] changed while trying to {action} it. No change was made.", order.number);
            BusinessError::ConcurrentModification
        })?;
        Ok(updated)
    }

    /// Cancels via `action`, refunding the full amount first if the order has been paid. If the refund fails, the order
    /// is left untouched.
    async fn cancel_with_refund(
        &self,
        order: &Order,
        action: OrderAction,
        update: OrderUpdate,
    ) -> Result<Order, OrderFlowError> {
        next_status(order.status, action)?;
        if !order.is_paid() {
            return self.apply(order, action, update).await;
        }
        self.refund(order).await.map_err(|e| {
            error!("🧾️ The order [{}] was not cancelled. {e}", order.number);
            e
        })?;
        let update = update.with_pay_status(PayStatus::Refunded);
        match self.apply(order, action, update.clone()).await {
            Err(OrderFlowError::Business(BusinessError::ConcurrentModification)) => {
                self.settle_refund(order.id, action, update).await
            },
            result => result,
        }
    }

    async fn refund(&self, order: &Order) -> Result<(), OrderFlowError> {
        let refund = RefundRequest {
            order_number: order.number.clone(),
            refund_number: format!("{}-refund", order.number),
            refund: order.amount,
            total: order.amount,
        };
        self.provider.create_refund(refund).await.map_err(|e| {
            error!("🧾️ Refund for order [{}] failed. {e}", order.number);
            OrderFlowError::ExternalService(e.to_string())
        })?;
        info!("🧾️ {} refunded for order [{}]", order.amount, order.number);
        Ok(())
    }

    /// Records a refund that has already gone out for order `id`, re-reading the order until the write lands.
    ///
    /// `action` is applied if the order still allows it. An order that has moved on but is still in progress is
    /// cancelled with [`OrderAction::RefundIssued`]. A finished order keeps its status and only its pay status changes.
    async fn settle_refund(&self, id: i64, action: OrderAction, update: OrderUpdate) -> Result<Order, OrderFlowError> {
        for _ in 0..MAX_SETTLE_ATTEMPTS {
            let current = self.fetch_order(id).await?;
            if current.pay_status == PayStatus::Refunded {
                debug!("🧾️ The refund for order [{}] is already recorded", current.number);
                return Ok(current);
            }
            let result = if action.permits(current.status) {
                self.apply(&current, action, update.clone()).await
            } else if OrderAction::RefundIssued.permits(current.status) {
                warn!(
                    "🧾️ Order [{}] became {} while it was being refunded. It is cancelled, as the payment was returned.",
                    current.number, current.status
                );
                self.apply(&current, OrderAction::RefundIssued, update.clone()).await
            } else {
                let refunded = OrderUpdate::default().with_pay_status(PayStatus::Refunded);
                self.db
                    .update_order(current.id, current.version, refunded)
                    .await?
                    .ok_or(OrderFlowError::from(BusinessError::ConcurrentModification))
            };
            match result {
                Err(OrderFlowError::Business(BusinessError::ConcurrentModification)) => {
                    trace!("🧾️ Order [{}] changed again while recording its refund", current.number);
                },
                result => return result,
            }
        }
        error!("🧾️ Order #{id} has been refunded, but the refund could not be recorded against it");
        Err(OrderFlowError::Internal(format!("refund for order #{id} could not be recorded")))
    }
}

fn bypass_signing_material(order_number: &str) -> PaymentSigningMaterial {
    let nonce_str = rand::thread_rng().sample_iter(&Alphanumeric).take(32).map(char::from).collect::<String>();
    PaymentSigningMaterial {
        time_stamp: Utc::now().timestamp().to_string(),
        nonce_str,
        package: format!("prepay_id=bypass-{order_number}"),
        sign_type: "BYPASS".to_string(),
        pay_sign: String::new(),
    }
}
