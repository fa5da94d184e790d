use chrono::{DateTime, TimeZone, Utc};
use mockall::mock;
use takeout_common::Cents;
use takeout_engine::{
    db_types::{CartItem, CartItemKey, Order, OrderDraft, OrderLine, OrderStatus, PayMethod, PayStatus, User},
    order_objects::{OrderQueryFilter, OrderUpdate, Pagination},
    traits::{
        CallbackEnvelope,
        CartManagement,
        OrderManagement,
        OrderRepositoryError,
        PaymentIntent,
        PaymentProvider,
        PaymentResult,
        PaymentSigningMaterial,
        ProviderError,
        RefundRequest,
        RefundResult,
    },
};

mock! {
    pub OrderStore {}
    impl Clone for OrderStore {
        fn clone(&self) -> Self;
    }
    impl OrderManagement for OrderStore {
        async fn create_order_from_cart(&self, draft: OrderDraft) -> Result<(Order, Vec<OrderLine>), OrderRepositoryError>;
        async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderRepositoryError>;
        async fn fetch_order_by_number(&self, number: &str) -> Result<Option<Order>, OrderRepositoryError>;
        async fn fetch_order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>, OrderRepositoryError>;
        async fn search_orders(&self, query: OrderQueryFilter, page: Pagination) -> Result<(i64, Vec<Order>), OrderRepositoryError>;
        async fn count_orders_with_status(&self, status: OrderStatus) -> Result<i64, OrderRepositoryError>;
        async fn update_order(&self, id: i64, expected_version: i64, update: OrderUpdate) -> Result<Option<Order>, OrderRepositoryError>;
        async fn fetch_stale_orders(&self, status: OrderStatus, placed_before: DateTime<Utc>) -> Result<Vec<Order>, OrderRepositoryError>;
        async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, OrderRepositoryError>;
    }
}

mock! {
    pub CartStore {}
    impl Clone for CartStore {
        fn clone(&self) -> Self;
    }
    impl CartManagement for CartStore {
        async fn fetch_cart(&self, user_id: i64) -> Result<Vec<CartItem>, OrderRepositoryError>;
        async fn add_to_cart(&self, user_id: i64, key: &CartItemKey) -> Result<CartItem, OrderRepositoryError>;
        async fn subtract_from_cart(&self, user_id: i64, key: &CartItemKey) -> Result<Option<CartItem>, OrderRepositoryError>;
        async fn clear_cart(&self, user_id: i64) -> Result<u64, OrderRepositoryError>;
        async fn reorder_into_cart(&self, user_id: i64, order_id: i64) -> Result<Vec<CartItem>, OrderRepositoryError>;
    }
}

mock! {
    pub Provider {}
    impl Clone for Provider {
        fn clone(&self) -> Self;
    }
    impl PaymentProvider for Provider {
        async fn create_payment_intent(&self, intent: PaymentIntent) -> Result<PaymentSigningMaterial, ProviderError>;
        fn verify_callback_signature(&self, envelope: &CallbackEnvelope) -> bool;
        fn decrypt_payment_result(&self, envelope: &CallbackEnvelope) -> Result<PaymentResult, ProviderError>;
        fn decrypt_refund_result(&self, envelope: &CallbackEnvelope) -> Result<RefundResult, ProviderError>;
        async fn create_refund(&self, refund: RefundRequest) -> Result<(), ProviderError>;
    }
}

pub const ORDER_TIME: i64 = 1_729_065_600;

/// A freshly submitted order #`id` of user #1.
pub fn order(id: i64, status: OrderStatus, pay_status: PayStatus) -> Order {
    Order {
        id,
        number: format!("172906560000{id}"),
        status,
        user_id: 1,
        address_book_id: 1,
        order_time: Utc.timestamp_opt(ORDER_TIME, 0).unwrap(),
        checkout_time: None,
        pay_method: PayMethod::WeChat,
        pay_status,
        amount: Cents::from(7900),
        remark: String::new(),
        phone: "13800000001".to_string(),
        address: "GuangdongShenzhenNanshanKeyuan Rd 1".to_string(),
        user_name: Some("Alice".to_string()),
        consignee: "Alice".to_string(),
        cancel_reason: None,
        rejection_reason: None,
        cancel_time: None,
        estimated_delivery_time: None,
        delivery_status: true,
        delivery_time: None,
        pack_amount: Cents::from(100),
        tableware_number: 0,
        tableware_status: true,
        version: 0,
    }
}

pub fn cart_item(id: i64, number: i32) -> CartItem {
    CartItem {
        id,
        user_id: 1,
        name: "Kung Pao Chicken".to_string(),
        image: "kpc.png".to_string(),
        dish_id: Some(1),
        setmeal_id: None,
        dish_flavor: Some("spicy".to_string()),
        number,
        amount: Cents::from(3800),
        created_at: Utc.timestamp_opt(ORDER_TIME, 0).unwrap(),
    }
}

/// Returns `order` as it would look after `update`, with its version bumped.
pub fn updated(mut order: Order, update: OrderUpdate) -> Order {
    if let Some(status) = update.status {
        order.status = status;
    }
    if let Some(pay_status) = update.pay_status {
        order.pay_status = pay_status;
    }
    order.checkout_time = update.checkout_time.or(order.checkout_time);
    order.cancel_reason = update.cancel_reason.or(order.cancel_reason);
    order.rejection_reason = update.rejection_reason.or(order.rejection_reason);
    order.cancel_time = update.cancel_time.or(order.cancel_time);
    order.delivery_time = update.delivery_time.or(order.delivery_time);
    order.version += 1;
    order
}
