//! Wire protocol for Clanforge.
//!
//! This crate defines the "language" that game clients and the server
//! speak on top of the transport's frames:
//!
//! - **Types** ([`MessageType`], [`PlayerId`], [`ClanId`], [`WarId`],
//!   [`ErrorCode`]): the frame header's type table and the identities
//!   that appear in bodies.
//! - **Messages** ([`LoginRequest`], [`PvpStart`], [`WarMemberList`],
//!   ...): one struct or tagged enum per body shape.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how bodies are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (Frame) → Protocol (MessageType + body) → handlers
//! ```

mod codec;
mod error;
mod messages;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use messages::*;
pub use types::{ClanId, ErrorCode, MessageType, PlayerId, WarId};
