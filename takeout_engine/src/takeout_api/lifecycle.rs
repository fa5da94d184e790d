//! The order status state machine.
//!
//! ```text
//!  PendingPayment ──pay──▶ ToBeConfirmed ──confirm──▶ Confirmed ──deliver──▶ DeliveryInProgress ──complete──▶ Completed
//!        │                       │                        │
//!        └───────────────────────┴──── cancel/reject ─────┴──────────▶ Cancelled
//! ```
//!
//! Pay status is orthogonal and is handled by the callers of [`next_status`]. The one exception is
//! [`OrderAction::RefundIssued`]: once the money is back with the customer, any order still in progress is cancelled.
use std::fmt::Display;

use crate::{db_types::OrderStatus, takeout_api::errors::BusinessError};

/// Everything that can move an order from one status to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    PaymentSucceeded,
    Confirm,
    Reject,
    AdminCancel,
    Deliver,
    Complete,
    UserCancel,
    PaymentTimeout,
    DeliveryOverdue,
    RefundIssued,
}

impl OrderAction {
    /// The status an order ends up in after this action.
    pub fn target(&self) -> OrderStatus {
        use OrderAction::*;
        match self {
            PaymentSucceeded => OrderStatus::ToBeConfirmed,
            Confirm => OrderStatus::Confirmed,
            Reject | AdminCancel | UserCancel | PaymentTimeout | RefundIssued => OrderStatus::Cancelled,
            Deliver => OrderStatus::DeliveryInProgress,
            Complete | DeliveryOverdue => OrderStatus::Completed,
        }
    }

    /// Whether this action may be applied to an order that is currently in `from`.
    pub fn permits(&self, from: OrderStatus) -> bool {
        use OrderAction::*;
        use OrderStatus::*;
        match self {
            PaymentSucceeded | PaymentTimeout => from == PendingPayment,
            Confirm => from == ToBeConfirmed,
            Reject | AdminCancel => matches!(from, PendingPayment | ToBeConfirmed | Confirmed),
            UserCancel => matches!(from, PendingPayment | ToBeConfirmed),
            Deliver => from == Confirmed,
            Complete | DeliveryOverdue => from == DeliveryInProgress,
            RefundIssued => matches!(from, PendingPayment | ToBeConfirmed | Confirmed | DeliveryInProgress),
        }
    }
}

impl Display for OrderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrderAction::PaymentSucceeded => "payment succeeded",
            OrderAction::Confirm => "confirm",
            OrderAction::Reject => "reject",
            OrderAction::AdminCancel => "admin cancel",
            OrderAction::Deliver => "deliver",
            OrderAction::Complete => "complete",
            OrderAction::UserCancel => "user cancel",
            OrderAction::PaymentTimeout => "payment timeout",
            OrderAction::DeliveryOverdue => "delivery overdue",
            OrderAction::RefundIssued => "refund issued",
        };
        f.write_str(name)
    }
}

/// Returns the status that `action` moves an order in `from` to, or [`BusinessError::OrderStatusError`] if the
/// transition is not allowed.
pub fn next_status(from: OrderStatus, action: OrderAction) -> Result<OrderStatus, BusinessError> {
    if action.permits(from) {
        Ok(action.target())
    } else {
        Err(BusinessError::OrderStatusError)
    }
}
