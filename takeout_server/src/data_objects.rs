use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use takeout_engine::{
    db_types::{OrderStatus, PayMethod},
    order_objects::{CallbackAck, OrderQueryFilter, Pagination, DEFAULT_PAGE_SIZE},
};

pub const CODE_SUCCESS: i32 = 1;
pub const CODE_BUSINESS_ERROR: i32 = -1;
pub const CODE_UNAUTHENTICATED: i32 = 401;
pub const CODE_BAD_REQUEST: i32 = 400;
pub const CODE_DATABASE_ERROR: i32 = 900;
pub const CODE_INTERNAL_ERROR: i32 = 50;

/// The envelope every JSON route answers with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { code: CODE_SUCCESS, msg: None, data: Some(data) }
    }
}

impl ApiResponse<()> {
    pub fn ok() -> Self {
        Self { code: CODE_SUCCESS, msg: None, data: None }
    }

    pub fn failure<S: Into<String>>(code: i32, msg: S) -> Self {
        Self { code, msg: Some(msg.into()), data: None }
    }
}

/// The answer the payment provider expects from a callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackAckBody {
    pub code: String,
    pub message: String,
}

impl From<&CallbackAck> for CallbackAckBody {
    fn from(ack: &CallbackAck) -> Self {
        let code = if ack.is_accepted() { "SUCCESS" } else { "FAIL" };
        Self { code: code.to_string(), message: ack.message().to_string() }
    }
}

//----------------------------------------------   Requests  ----------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentParams {
    pub order_number: String,
    #[serde(default)]
    pub pay_method: PayMethod,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub status: Option<OrderStatus>,
}

impl HistoryParams {
    pub fn pagination(&self) -> Pagination {
        pagination(self.page, self.page_size)
    }
}

/// Query string of the back-office order search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionSearchParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub number: Option<String>,
    pub phone: Option<String>,
    pub status: Option<OrderStatus>,
    pub begin_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl ConditionSearchParams {
    pub fn pagination(&self) -> Pagination {
        pagination(self.page, self.page_size)
    }

    pub fn filter(&self) -> OrderQueryFilter {
        let mut filter = OrderQueryFilter::default();
        if let Some(number) = self.number.as_ref().filter(|s| !s.is_empty()) {
            filter = filter.with_number(number.as_str());
        }
        if let Some(phone) = self.phone.as_ref().filter(|s| !s.is_empty()) {
            filter = filter.with_phone(phone.as_str());
        }
        if let Some(status) = self.status {
            filter = filter.with_status(status);
        }
        if let Some(since) = self.begin_time {
            filter = filter.since(since);
        }
        if let Some(until) = self.end_time {
            filter = filter.until(until);
        }
        filter
    }
}

fn pagination(page: Option<u32>, page_size: Option<u32>) -> Pagination {
    Pagination::new(page.unwrap_or(1), page_size.unwrap_or(DEFAULT_PAGE_SIZE))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderIdParams {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionParams {
    pub id: i64,
    pub rejection_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelParams {
    pub id: i64,
    pub cancel_reason: String,
}
