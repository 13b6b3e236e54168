//! Non-owning handles to connected clients.

use crate::messages::ServerMessage;
use derive_more::{Display, Error};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// The client behind a handle has disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
#[display("Client connection is gone")]
pub struct ClientGone;

/// Outbound channel to one connected client.
///
/// Cloning the handle never keeps the connection alive: the transport task
/// owns the socket and drops the receiving end when it exits, after which
/// every `send` fails with [`ClientGone`].
#[derive(Debug, Clone)]
pub struct ClientHandle {
    tx: UnboundedSender<ServerMessage>,
}

impl ClientHandle {
    /// Creates a handle together with the receiver the transport drains.
    pub fn channel() -> (Self, UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queues a message for the client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientGone`] if the client has disconnected.
    pub fn send(&self, message: ServerMessage) -> Result<(), ClientGone> {
        self.tx.send(message).map_err(|_| ClientGone)
    }
}
