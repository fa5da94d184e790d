//! # Notification sink
//!
//! A registry of live, push-capable connections to operator dashboards. Events are serialized to JSON once and written
//! to every registered connection. Delivery is best effort: a connection whose write fails is removed from the
//! registry and closed, and the caller is never told about it beyond the returned [`BroadcastReport`].
//!
//! The transport is abstracted behind [`PushChannel`]. [`ChannelPusher`] adapts a tokio mpsc sender, which is how the
//! websocket endpoint feeds its socket.
mod channel;
mod hub;
mod message;

pub use channel::ChannelPusher;
pub use hub::{BroadcastReport, NotificationHub, PushChannel, PushError};
pub use message::{NotificationType, OrderNotification};
