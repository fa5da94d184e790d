#![allow(dead_code)]
use chrono::{DateTime, Utc};
use mockall::mock;
use takeout_common::Cents;
use takeout_engine::{
    db_types::{CartItemKey, Order, OrderDraft, OrderLine, OrderStatus, User},
    notifications::{ChannelPusher, NotificationHub},
    order_objects::{OrderQueryFilter, OrderSubmitted, OrderUpdate, Pagination, PaymentMode, SubmitOrderRequest},
    test_utils::{
        fixtures::{ALICE, ALICE_ADDRESS, KUNG_PAO_CHICKEN, STEAMED_RICE},
        prepare_env::{prepare_test_env, random_db_path},
    },
    traits::{
        CallbackEnvelope,
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
    CartApi,
    OrderFlowApi,
    SqliteDatabase,
};
use tokio::sync::mpsc;

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

mock! {
    pub Store {}
    impl Clone for Store {
        fn clone(&self) -> Self;
    }
    impl OrderManagement for Store {
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

pub const POOL_SIZE: usize = 5;

pub async fn new_database() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, POOL_SIZE as u32).await.expect("Error creating database")
}

/// Reads the status and version of order `id` through every connection in the pool at the same time, so that at least
/// one of the reads happens on a connection other than the one that last wrote the order.
pub async fn seen_by_every_connection(db: &SqliteDatabase, id: i64) -> Vec<(OrderStatus, i64)> {
    let mut connections = Vec::with_capacity(POOL_SIZE);
    for _ in 0..POOL_SIZE {
        connections.push(db.pool().acquire().await.expect("Error acquiring connection"));
    }
    let mut seen = Vec::with_capacity(POOL_SIZE);
    for conn in connections.iter_mut() {
        let row: (OrderStatus, i64) = sqlx::query_as("SELECT status, version FROM orders WHERE id = $1")
            .bind(id)
            .fetch_one(&mut **conn)
            .await
            .expect("Error reading order");
        seen.push(row);
    }
    seen
}

pub fn order_api<P: PaymentProvider>(
    db: &SqliteDatabase,
    provider: P,
    mode: PaymentMode,
) -> OrderFlowApi<SqliteDatabase, P> {
    OrderFlowApi::new(db.clone(), provider, NotificationHub::new(), mode)
}

/// Registers a dashboard on the api's hub and returns the receiving end of its connection.
pub fn connect_dashboard<B, P>(api: &OrderFlowApi<B, P>, id: &str) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    api.hub().register(id, Box::new(ChannelPusher::new(tx)));
    rx
}

/// Drains everything currently buffered on a dashboard connection.
pub fn received(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        messages.push(message);
    }
    messages
}

pub fn submit_request(amount: i64) -> SubmitOrderRequest {
    SubmitOrderRequest {
        address_book_id: ALICE_ADDRESS,
        pay_method: Default::default(),
        remark: "no coriander".to_string(),
        estimated_delivery_time: None,
        delivery_status: true,
        pack_amount: Cents::from(100),
        amount: Cents::from(amount),
        tableware_number: 0,
        tableware_status: true,
    }
}

/// Fills Alice's cart with two Kung Pao Chicken (one spicy) and a rice, then submits it.
pub async fn place_alice_order<P: PaymentProvider>(
    db: &SqliteDatabase,
    api: &OrderFlowApi<SqliteDatabase, P>,
) -> OrderSubmitted {
    let cart = CartApi::new(db.clone());
    cart.add(ALICE, &CartItemKey::dish(KUNG_PAO_CHICKEN, Some("spicy"))).await.unwrap();
    cart.add(ALICE, &CartItemKey::dish(KUNG_PAO_CHICKEN, None::<String>)).await.unwrap();
    cart.add(ALICE, &CartItemKey::dish(STEAMED_RICE, None::<String>)).await.unwrap();
    api.submit_order(ALICE, submit_request(7900)).await.unwrap()
}
