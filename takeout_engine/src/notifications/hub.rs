use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, Mutex, MutexGuard},
};

use log::*;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PushError {
    #[error("The connection is closed")]
    Closed,
    #[error("The consumer is not keeping up")]
    Backpressure,
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("No connection is registered under {0}")]
    UnknownConnection(String),
}

/// One live connection that messages can be pushed to.
///
/// Implementations must not block: a write either succeeds, or fails straight away.
pub trait PushChannel: Send {
    fn push(&mut self, message: &str) -> Result<(), PushError>;

    /// Releases the underlying transport. Called once, when the connection leaves the registry.
    fn close(&mut self);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Ids of the connections that failed and were removed
    pub pruned: Vec<String>,
}

struct Connection {
    serial: u64,
    channel: Box<dyn PushChannel>,
}

#[derive(Default)]
struct Registry {
    connections: HashMap<String, Connection>,
    next_serial: u64,
}

/// The connection registry. Cloning the hub is cheap, and all clones share the same registry.
///
/// A single mutex guards the registry, and is held for the whole of a register, unregister or broadcast. Pushes are
/// non-blocking, so the lock is never held across I/O waits.
#[derive(Clone, Default)]
pub struct NotificationHub {
    registry: Arc<Mutex<Registry>>,
}

impl Debug for NotificationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationHub ({} connections)", self.connection_count())
    }
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the map half-updated, so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|poisoned| {
            warn!("📣️ Notification registry lock was poisoned. Recovering.");
            poisoned.into_inner()
        })
    }

    /// Adds a connection under `id`. A connection already registered under the same id is closed and replaced.
    ///
    /// Returns a serial number that identifies this particular connection. See [`Self::release`].
    pub fn register(&self, id: &str, channel: Box<dyn PushChannel>) -> u64 {
        let mut registry = self.lock();
        registry.next_serial += 1;
        let serial = registry.next_serial;
        if let Some(mut old) = registry.connections.insert(id.to_string(), Connection { serial, channel }) {
            debug!("📣️ Connection {id} re-registered. Closing the previous connection.");
            old.channel.close();
        }
        info!("📣️ Client {id} connected. {} connections are live.", registry.connections.len());
        serial
    }

    /// Removes and closes the connection registered under `id`. Returns false if there was none.
    pub fn unregister(&self, id: &str) -> bool {
        let mut registry = self.lock();
        match registry.connections.remove(id) {
            Some(mut conn) => {
                conn.channel.close();
                info!("📣️ Client {id} disconnected. {} connections are live.", registry.connections.len());
                true
            },
            None => false,
        }
    }

    /// Like [`Self::unregister`], but only if `id` still refers to the connection with the given serial. A transport
    /// that is shutting down uses this so that it cannot evict a newer connection that re-used its id.
    pub fn release(&self, id: &str, serial: u64) -> bool {
        let mut registry = self.lock();
        let is_current = registry.connections.get(id).map(|c| c.serial == serial).unwrap_or(false);
        if !is_current {
            return false;
        }
        if let Some(mut conn) = registry.connections.remove(id) {
            conn.channel.close();
        }
        info!("📣️ Client {id} disconnected. {} connections are live.", registry.connections.len());
        true
    }

    pub fn connection_count(&self) -> usize {
        self.lock().connections.len()
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.lock().connections.contains_key(id)
    }

    /// Serializes `event` to JSON and pushes it to every live connection. Failing connections are pruned.
    pub fn broadcast<T: Serialize>(&self, event: &T) -> BroadcastReport {
        match serde_json::to_string(event) {
            Ok(message) => self.broadcast_text(&message),
            Err(e) => {
                error!("📣️ Could not serialize notification. It was not sent. {e}");
                BroadcastReport::default()
            },
        }
    }

    pub fn broadcast_text(&self, message: &str) -> BroadcastReport {
        let mut registry = self.lock();
        let mut report = BroadcastReport::default();
        for (id, conn) in registry.connections.iter_mut() {
            match conn.channel.push(message) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("📣️ Could not push to client {id}. Dropping the connection. {e}");
                    report.pruned.push(id.clone());
                },
            }
        }
        for id in &report.pruned {
            if let Some(mut conn) = registry.connections.remove(id) {
                conn.channel.close();
            }
        }
        trace!("📣️ Broadcast delivered to {} clients, {} pruned", report.delivered, report.pruned.len());
        report
    }

    /// Pushes `event` to the single connection registered under `id`. A failing connection is pruned.
    pub fn send_to<T: Serialize>(&self, id: &str, event: &T) -> Result<(), PushError> {
        let message = serde_json::to_string(event).map_err(|e| PushError::Transport(e.to_string()))?;
        let mut registry = self.lock();
        let result = registry
            .connections
            .get_mut(id)
            .ok_or_else(|| PushError::UnknownConnection(id.to_string()))?
            .channel
            .push(&message);
        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("📣️ Could not push to client {id}. Dropping the connection. {e}");
                if let Some(mut conn) = registry.connections.remove(id) {
                    conn.channel.close();
                }
                Err(e)
            },
        }
    }
}
