use clanforge_protocol::{ErrorCode, PlayerId};
use clanforge_transport::ConnectionId;

/// Errors returned by [`Arena`](crate::Arena) operations.
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    #[error("{0} is not logged in")]
    NotLoggedIn(ConnectionId),

    #[error("target {0} is offline")]
    TargetOffline(PlayerId),

    #[error("target {0} has no base layout")]
    NoMap(PlayerId),

    #[error("player {0} is already in a battle")]
    AlreadyInBattle(PlayerId),

    #[error("a player cannot attack themselves")]
    InvalidTarget,

    #[error("no active battle for {0}")]
    NoActiveBattle(PlayerId),
}

impl ArenaError {
    /// The wire code reported to the client.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotLoggedIn(_) => ErrorCode::NotLoggedIn,
            Self::TargetOffline(_) => ErrorCode::TargetOffline,
            Self::NoMap(_) => ErrorCode::NoMap,
            Self::AlreadyInBattle(_) => ErrorCode::AlreadyInBattle,
            Self::InvalidTarget => ErrorCode::InvalidTarget,
            Self::NoActiveBattle(_) => ErrorCode::NoActiveBattle,
        }
    }
}
