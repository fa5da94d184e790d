//! Takeout Engine
//!
//! The core of the takeout ordering backend. It is storage- and provider-agnostic.
//!
//! The library is divided into these sections:
//! 1. Storage. The backend contracts live in [`mod@traits`]; [`SqliteDatabase`] implements them. The row types are in
//!    [`mod@db_types`].
//! 2. The engine's public API: [`OrderFlowApi`], [`PaymentCallbackApi`], [`CartApi`] and [`ReconciliationApi`].
//! 3. The notification sink ([`mod@notifications`]) that pushes order events to operator dashboards.
pub mod db_types;
pub mod notifications;
#[cfg(feature = "sqlite")]
pub mod sqlite;
mod takeout_api;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use takeout_api::{
    cart_api::CartApi,
    errors::{BusinessError, OrderFlowError},
    lifecycle,
    order_flow_api::{next_order_number, OrderFlowApi},
    order_objects,
    payment_callback_api::PaymentCallbackApi,
    reconciliation_api::ReconciliationApi,
};
