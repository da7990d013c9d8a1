//! Error types for the protocol layer.
//!
//! Each crate in Clanforge defines its own error enum, so a
//! `ProtocolError` always means the problem is in the bytes themselves,
//! never in networking or game state.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, wrong
    /// data types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame header carried a type code this server does not know.
    #[error("unknown message type {0}")]
    UnknownMessageType(u32),

    /// The message decoded but violates protocol rules, such as an
    /// empty player id.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
