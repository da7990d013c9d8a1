use clanforge_protocol::{ErrorCode, PlayerId, WarId};
use clanforge_transport::ConnectionId;

/// Errors returned by [`ClanWarRoom`](crate::ClanWarRoom) operations.
#[derive(Debug, thiserror::Error)]
pub enum WarError {
    #[error("{0} is not logged in")]
    NotLoggedIn(ConnectionId),

    #[error("war {0} not found")]
    WarNotFound(WarId),

    /// The target is not on a frozen roster, or has no layout.
    #[error("no layout for war target {0}")]
    NoMapData(PlayerId),

    #[error("player {0} already has an attack in progress")]
    AlreadyInBattle(PlayerId),

    /// The target is on the attacker's own side.
    #[error("player {0} is on the attacker's side")]
    InvalidTarget(PlayerId),

    /// The attacker belongs to neither clan in the war.
    #[error("player {0} is not fighting in this war")]
    NotInWar(PlayerId),

    #[error("no active war attack for {0}")]
    NoActiveBattle(PlayerId),

    /// No active battle involves the spectate target.
    #[error("no war battle involves {0}")]
    NothingToWatch(PlayerId),
}

impl WarError {
    /// The wire code reported to the client.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotLoggedIn(_) => ErrorCode::NotLoggedIn,
            Self::WarNotFound(_) => ErrorCode::WarNotFound,
            Self::NoMapData(_) => ErrorCode::NoMapData,
            Self::AlreadyInBattle(_) => ErrorCode::AlreadyInBattle,
            Self::InvalidTarget(_) | Self::NotInWar(_) => ErrorCode::InvalidTarget,
            Self::NoActiveBattle(_) | Self::NothingToWatch(_) => ErrorCode::NoActiveBattle,
        }
    }
}
