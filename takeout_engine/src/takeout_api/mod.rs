//! # Takeout engine public API
//!
//! * [`order_flow_api`] is the order lifecycle engine: submission, payment, queries, and every operator and customer
//!   action on an order.
//! * [`payment_callback_api`] authenticates and applies the payment provider's asynchronous notifications.
//! * [`cart_api`] manages the shopping cart that submissions are built from.
//! * [`reconciliation_api`] holds the periodic timeout and stuck-delivery sweeps.
//!
//! Every API is created by handing it a backend that implements the traits it needs, e.g.
//!
//! ```rust,ignore
//! let db = SqliteDatabase::new_with_url(url, 5).await?;
//! let api = CartApi::new(db);
//! let items = api.list(user_id).await?;
//! ```
pub mod cart_api;
pub mod errors;
pub mod lifecycle;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_callback_api;
pub mod reconciliation_api;
