//! Per-connection outbound queue.

use clanforge_protocol::{Codec, JsonCodec, MessageType};
use clanforge_transport::{ConnectionId, Frame};
use serde::Serialize;
use tokio::sync::mpsc;

/// Receiving half of an [`Outbox`], drained by the connection's writer task.
pub type OutboxReceiver = mpsc::UnboundedReceiver<Frame>;

/// Sender side of a connection's outbound frame queue.
///
/// Enqueueing never blocks, so components may push frames while holding
/// their own lock; the frames reach the socket in enqueue order. Cheap to
/// clone.
#[derive(Debug, Clone)]
pub struct Outbox {
    conn: ConnectionId,
    tx: mpsc::UnboundedSender<Frame>,
}

impl Outbox {
    /// Creates an outbox and the receiver its writer task drains.
    pub fn channel(conn: ConnectionId) -> (Self, OutboxReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { conn, tx }, rx)
    }

    /// The connection this outbox delivers to.
    pub fn connection(&self) -> ConnectionId {
        self.conn
    }

    /// Encodes `body` as JSON and queues it. Returns `false` if the frame
    /// could not be encoded or the connection is gone.
    pub fn send<T: Serialize>(&self, kind: MessageType, body: &T) -> bool {
        match JsonCodec.frame(kind, body) {
            Ok(frame) => self.send_frame(frame),
            Err(e) => {
                tracing::warn!(conn = %self.conn, %kind, error = %e, "failed to encode outbound body");
                false
            }
        }
    }

    /// Queues a pre-built frame, such as a verbatim forward.
    pub fn send_frame(&self, frame: Frame) -> bool {
        if self.tx.send(frame).is_err() {
            tracing::debug!(conn = %self.conn, "outbox closed, dropping frame");
            return false;
        }
        true
    }

    /// Returns `true` once the writer task has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
