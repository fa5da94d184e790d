use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    /// A new order has been paid for and is waiting to be accepted
    NewOrder = 1,
    /// The customer is chasing an order
    Reminder = 2,
}

impl Serialize for NotificationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// The event pushed to operator dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNotification {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub order_id: i64,
    pub content: String,
}

impl OrderNotification {
    pub fn new_order(order_id: i64, number: &str) -> Self {
        Self { kind: NotificationType::NewOrder, order_id, content: format!("order number: {number}") }
    }

    pub fn reminder(order_id: i64, number: &str) -> Self {
        Self { kind: NotificationType::Reminder, order_id, content: format!("order number: {number}") }
    }
}
