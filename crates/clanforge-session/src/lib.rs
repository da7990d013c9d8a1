//! Player session management for Clanforge.
//!
//! This crate knows who is connected:
//!
//! 1. **Authentication**: validating a login ([`Authenticator`] trait)
//! 2. **Registry**: the live directory of players by connection and by
//!    id ([`PlayerRegistry`])
//! 3. **Delivery**: each connection's outbound queue ([`Outbox`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Arena / ClanHall / ClanWarRoom (above)  ← look players up, push frames
//!     ↕
//! Session Layer (this crate)  ← player identity and connection state
//!     ↕
//! Protocol Layer (below)  ← PlayerId, MessageType, bodies
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod outbox;
mod player;
mod registry;

pub use auth::{Authenticator, LoginAuthenticator};
pub use error::SessionError;
pub use outbox::{Outbox, OutboxReceiver};
pub use player::{DEFAULT_RESOURCES, PlayerContext, PlayerProfile};
pub use registry::{PlayerHandle, PlayerRegistry, Registration};
