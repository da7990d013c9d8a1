//! Error types for the session layer.

use clanforge_protocol::{ErrorCode, PlayerId};
use clanforge_transport::ConnectionId;

/// Errors that can occur while resolving or authenticating players.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The login was rejected by the [`Authenticator`](crate::Authenticator).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The connection has not completed a login.
    #[error("{0} is not logged in")]
    NotLoggedIn(ConnectionId),

    /// No live connection is bound to this player id.
    #[error("player {0} is offline")]
    PlayerOffline(PlayerId),
}

impl SessionError {
    /// The wire code reported to the client.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::AuthFailed(_) => ErrorCode::MalformedBody,
            Self::NotLoggedIn(_) => ErrorCode::NotLoggedIn,
            Self::PlayerOffline(_) => ErrorCode::TargetOffline,
        }
    }
}
