//! Error types for the clan directory.

use clanforge_protocol::{ClanId, ErrorCode, PlayerId};

/// Failures of the persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("clan store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("clan store encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The blocking save task panicked or was cancelled.
    #[error("clan store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors returned by [`ClanHall`](crate::ClanHall) operations.
#[derive(Debug, thiserror::Error)]
pub enum ClanError {
    /// The player is not online, so their trophies are unknown.
    #[error("player {0} is not known")]
    UnknownPlayer(PlayerId),

    #[error("player {player_id} is already in clan {clan_id}")]
    AlreadyInClan { player_id: PlayerId, clan_id: ClanId },

    #[error("clan {0} not found")]
    ClanNotFound(ClanId),

    #[error("clan {0} is closed")]
    ClanClosed(ClanId),

    #[error("clan requires {required} trophies, player has {actual}")]
    TrophiesTooLow { required: u32, actual: u32 },

    #[error("player {0} is not in a clan")]
    NotInClan(PlayerId),

    /// Saving the table failed; the in-memory table was left unchanged.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ClanError {
    /// The wire code reported to the client.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownPlayer(_) => ErrorCode::UnknownPlayer,
            Self::AlreadyInClan { .. } => ErrorCode::AlreadyInClan,
            Self::ClanNotFound(_) => ErrorCode::ClanNotFound,
            Self::ClanClosed(_) => ErrorCode::ClanClosed,
            Self::TrophiesTooLow { .. } => ErrorCode::TrophiesTooLow,
            Self::NotInClan(_) => ErrorCode::NotInClan,
            Self::Storage(_) => ErrorCode::StorageFailure,
        }
    }
}
