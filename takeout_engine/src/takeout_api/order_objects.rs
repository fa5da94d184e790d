use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use takeout_common::Cents;

use crate::db_types::{Order, OrderLine, OrderStatus, PayMethod, PayStatus};

pub const USER_CANCEL_REASON: &str = "user cancelled";
pub const TIMEOUT_CANCEL_REASON: &str = "order timeout";
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

//--------------------------------------   OrderQueryFilter   ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderQueryFilter {
    /// Matches any order whose number contains this string
    pub number: Option<String>,
    /// Matches any order whose phone contains this string
    pub phone: Option<String>,
    pub user_id: Option<i64>,
    pub status: Option<Vec<OrderStatus>>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_number<S: Into<String>>(mut self, number: S) -> Self {
        self.number = Some(number.into());
        self
    }

    pub fn with_phone<S: Into<String>>(mut self, phone: S) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.number.is_none() &&
            self.phone.is_none() &&
            self.user_id.is_none() &&
            self.status.as_ref().map(|s| s.is_empty()).unwrap_or(true) &&
            self.since.is_none() &&
            self.until.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(number) = &self.number {
            write!(f, "number: {number}. ")?;
        }
        if let Some(phone) = &self.phone {
            write!(f, "phone: {phone}. ")?;
        }
        if let Some(user_id) = &self.user_id {
            write!(f, "user_id: {user_id}. ")?;
        }
        if let Some(status) = &self.status {
            let statuses = status.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "status: {statuses}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since: {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until: {until}. ")?;
        }
        Ok(())
    }
}

//--------------------------------------      Pagination      ---------------------------------------------------------
/// A 1-based page request. Sizes are clamped to `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, page_size: DEFAULT_PAGE_SIZE }
    }
}

impl Pagination {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page: page.max(1), page_size: page_size.clamp(1, MAX_PAGE_SIZE) }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult<T> {
    pub total: i64,
    pub records: Vec<T>,
}

//--------------------------------------      OrderUpdate     ---------------------------------------------------------
/// The set of columns a lifecycle transition changes. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub pay_status: Option<PayStatus>,
    pub checkout_time: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub rejection_reason: Option<String>,
    pub cancel_time: Option<DateTime<Utc>>,
    pub delivery_time: Option<DateTime<Utc>>,
}

impl OrderUpdate {
    pub fn status(status: OrderStatus) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    pub fn with_pay_status(mut self, pay_status: PayStatus) -> Self {
        self.pay_status = Some(pay_status);
        self
    }

    pub fn with_checkout_time(mut self, time: DateTime<Utc>) -> Self {
        self.checkout_time = Some(time);
        self
    }

    pub fn with_cancel_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.cancel_reason = Some(reason.into());
        self
    }

    pub fn with_rejection_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.rejection_reason = Some(reason.into());
        self
    }

    pub fn with_cancel_time(mut self, time: DateTime<Utc>) -> Self {
        self.cancel_time = Some(time);
        self
    }

    pub fn with_delivery_time(mut self, time: DateTime<Utc>) -> Self {
        self.delivery_time = Some(time);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

//--------------------------------------  Submission objects  ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderRequest {
    pub address_book_id: i64,
    #[serde(default)]
    pub pay_method: PayMethod,
    #[serde(default)]
    pub remark: String,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    /// `true` to deliver as soon as possible
    #[serde(default = "default_true")]
    pub delivery_status: bool,
    #[serde(default)]
    pub pack_amount: Cents,
    pub amount: Cents,
    #[serde(default)]
    pub tableware_number: i32,
    #[serde(default = "default_true")]
    pub tableware_status: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmitted {
    pub id: i64,
    pub order_number: String,
    pub order_amount: Cents,
    pub order_time: DateTime<Utc>,
}

impl From<&Order> for OrderSubmitted {
    fn from(order: &Order) -> Self {
        Self { id: order.id, order_number: order.number.clone(), order_amount: order.amount, order_time: order.order_time }
    }
}

//--------------------------------------    Query results     ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithLines {
    #[serde(flatten)]
    pub order: Order,
    pub order_detail_list: Vec<OrderLine>,
}

/// An order as shown in the back-office search, with a one-line summary of its contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSearchRecord {
    #[serde(flatten)]
    pub order: Order,
    pub order_dishes: String,
}

/// Summarises order lines as `name*qty;name*qty;`
pub fn order_dishes_summary(lines: &[OrderLine]) -> String {
    lines.iter().map(|l| format!("{}*{};", l.name, l.number)).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatistics {
    pub to_be_confirmed: i64,
    pub confirmed: i64,
    pub delivery_in_progress: i64,
}

//--------------------------------------       Payments       ---------------------------------------------------------
/// How `request_payment` settles an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaymentMode {
    /// No gateway is wired in: requesting a payment marks the order as paid straight away.
    #[default]
    Bypass,
    /// A payment intent is opened at the provider and the order is marked as paid by the provider's callback.
    Gateway,
}

/// The answer given to a provider callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAck {
    /// The notification was authentic and has been recorded (or deliberately ignored). The provider must stop
    /// retrying.
    Accepted(String),
    /// The notification could not be parsed or authenticated. Nothing was changed.
    Rejected(String),
    /// The notification was authentic, but a transient fault prevented it from being recorded. The provider should
    /// retry.
    Retry(String),
}

impl CallbackAck {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CallbackAck::Accepted(_))
    }

    pub fn message(&self) -> &str {
        match self {
            CallbackAck::Accepted(m) | CallbackAck::Rejected(m) | CallbackAck::Retry(m) => m.as_str(),
        }
    }
}
