//! Transport layer for Clanforge.
//!
//! Provides the [`Transport`] and [`Connection`] traits and the TCP
//! implementation game clients speak: one persistent socket per player,
//! carrying length-prefixed [`Frame`]s.
//!
//! ```text
//! ┌──────────────┬────────────────┬──────────────────────┐
//! │ type: u32 BE │ length: u32 BE │ body: `length` bytes │
//! └──────────────┴────────────────┴──────────────────────┘
//! ```
//!
//! Both header integers are big-endian (network byte order). The
//! transport does not interpret `type` or the body; that is the protocol
//! layer's job.

#![allow(async_fn_in_trait)]

mod error;
mod frame;
mod tcp;

pub use error::TransportError;
pub use frame::{DEFAULT_MAX_FRAME_LEN, FRAME_HEADER_LEN, Frame};
pub use tcp::{TcpConnection, TcpTransport};

use std::fmt;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that exchanges whole frames.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame to the remote peer.
    ///
    /// Header and body go out as a single unit: concurrent callers on the
    /// same connection never interleave bytes.
    async fn send(&self, frame: &Frame) -> Result<(), Self::Error>;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly on a
    /// frame boundary. A close in the middle of a frame is an error.
    async fn recv(&self) -> Result<Option<Frame>, Self::Error>;

    /// Closes the sending side of the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "alice");
        map.insert(ConnectionId::new(2), "bob");
        assert_eq!(map[&ConnectionId::new(1)], "alice");
    }
}
