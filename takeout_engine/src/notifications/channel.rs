use tokio::sync::mpsc::{error::TrySendError, Sender};

use super::{PushChannel, PushError};

/// A [`PushChannel`] backed by a bounded tokio mpsc channel. Whoever owns the receiving half forwards the messages to
/// the real transport.
///
/// Writes never wait: a full buffer means the consumer is not keeping up, and is reported as a failure so that the hub
/// drops the connection. Closing the pusher drops the sender, which ends the receiver's stream.
#[derive(Debug)]
pub struct ChannelPusher {
    sender: Option<Sender<String>>,
}

impl ChannelPusher {
    pub fn new(sender: Sender<String>) -> Self {
        Self { sender: Some(sender) }
    }
}

impl PushChannel for ChannelPusher {
    fn push(&mut self, message: &str) -> Result<(), PushError> {
        let sender = self.sender.as_ref().ok_or(PushError::Closed)?;
        sender.try_send(message.to_string()).map_err(|e| match e {
            TrySendError::Full(_) => PushError::Backpressure,
            TrySendError::Closed(_) => PushError::Closed,
        })
    }

    fn close(&mut self) {
        self.sender.take();
    }
}
