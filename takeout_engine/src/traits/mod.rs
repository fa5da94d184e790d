//! # Backend contracts
//!
//! This module defines the interfaces the lifecycle engine consumes from its collaborators.
//!
//! * [`OrderManagement`] covers orders and their lines, including the transactional cart-to-order conversion.
//! * [`CartManagement`] covers the per-user shopping cart.
//! * [`PaymentProvider`] is the seam to the external payment gateway: payment intents, callback authenticity and
//!   payload decryption, and refunds.
//!
//! [`crate::SqliteDatabase`] implements the storage traits. The provider is implemented outside the engine.
mod cart_management;
mod data_objects;
mod order_management;
mod payment_provider;

pub use cart_management::CartManagement;
pub use data_objects::{SweepFailure, SweepResult};
pub use order_management::{OrderManagement, OrderRepositoryError};
pub use payment_provider::{
    CallbackEnvelope,
    CallbackHeaders,
    CallbackNotification,
    EncryptedResource,
    PaymentIntent,
    PaymentProvider,
    PaymentResult,
    PaymentSigningMaterial,
    ProviderError,
    RefundRequest,
    RefundResult,
};
