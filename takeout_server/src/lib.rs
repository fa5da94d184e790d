//! # Takeout server
//! The HTTP face of the takeout ordering backend. It is responsible for:
//! * Binding the customer and back-office operations of the order lifecycle engine to REST routes.
//! * Receiving the payment provider's payment and refund callbacks.
//! * Streaming new-order and reminder events to operator dashboards over websockets.
//! * Running the reconciliation sweeps in the background.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! See [routes](routes/index.html). Every JSON response is wrapped in the `{code, msg, data}` envelope, except the
//! provider callbacks, which answer in the provider's own `{code, message}` format.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod reconciliation_worker;
pub mod routes;
pub mod server;
pub mod ws;

#[cfg(test)]
mod endpoint_tests;
