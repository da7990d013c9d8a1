//! # Clanforge
//!
//! Backend for a clan-based strategy game: accounts and base layouts,
//! trophy matchmaking, live 1v1 battles with spectators, a persistent
//! clan directory, and clan-versus-clan wars.
//!
//! Clients speak length-prefixed frames over TCP; every subsystem lives
//! in its own crate and this one wires them behind a single
//! [`ClanforgeServer`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clanforge::prelude::*;
//!
//! # async fn start() -> Result<(), ClanforgeError> {
//! let server = ClanforgeServer::builder()
//!     .bind("0.0.0.0:8888")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod connection;
mod error;
mod handlers;
mod router;
mod server;
mod state;

pub use config::ServerConfig;
pub use error::ClanforgeError;
pub use server::{ClanforgeServer, ClanforgeServerBuilder};

/// Everything needed to embed a server or write a test client.
pub mod prelude {
    pub use crate::{ClanforgeError, ClanforgeServer, ClanforgeServerBuilder, ServerConfig};
    pub use clanforge_protocol::{ClanId, ErrorCode, MessageType, PlayerId, WarId};
    pub use clanforge_session::{Authenticator, LoginAuthenticator, SessionError};
    pub use clanforge_transport::{FRAME_HEADER_LEN, Frame};
}
