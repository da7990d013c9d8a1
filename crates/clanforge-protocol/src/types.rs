//! Core protocol types: identities, the message table, and error codes.
//!
//! Every type here travels "on the wire", either in the frame header
//! ([`MessageType`]) or inside JSON bodies (the ids and [`ErrorCode`]).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Declares a string-backed identifier.
///
/// Each id is a newtype wrapper around `String`, so a `ClanId` can never be
/// passed where a `PlayerId` is expected even though both are strings
/// underneath. `#[serde(transparent)]` makes the JSON form a bare string:
/// `"p1"`, not `{ "0": "p1" }`.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw string id.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrows the raw string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` for the empty id.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

string_id! {
    /// A stable player identity, chosen by the client at login.
    PlayerId
}

string_id! {
    /// A clan identity, allocated by the server as `CLAN_<n>`.
    ClanId
}

string_id! {
    /// A clan war identity, allocated by the server as `WAR_<n>`.
    WarId
}

// ---------------------------------------------------------------------------
// MessageType: the frame header's `type` field
// ---------------------------------------------------------------------------

/// Every message type the server knows, with its wire id.
///
/// `#[repr(u32)]` pins each discriminant to the value that appears in the
/// frame header, so `MessageType::Login as u32 == 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageType {
    // -- Account & layout --
    Login = 1,
    UploadMap = 2,
    QueryMap = 3,
    /// Legacy, accepted and logged.
    AttackData = 4,
    UserListRequest = 5,
    UserListResponse = 6,

    // -- Matchmaking & direct attacks --
    FindMatch = 10,
    MatchFound = 11,
    CancelMatch = 12,
    AttackStart = 13,
    AttackResult = 14,
    /// Legacy, accepted and logged.
    BattleReplay = 15,

    // -- Clans --
    CreateClan = 20,
    JoinClan = 21,
    LeaveClan = 22,
    ClanList = 23,
    ClanMembers = 24,
    ClanInfo = 25,

    // -- Clan war (first generation) --
    ClanWarSearch = 30,
    ClanWarMatch = 31,
    ClanWarAttack = 32,
    ClanWarResult = 33,
    ClanWarStatus = 34,
    ClanWarEnd = 35,

    // -- 1v1 arena --
    PvpRequest = 40,
    PvpStart = 41,
    PvpAction = 42,
    PvpEnd = 43,
    SpectateRequest = 44,
    SpectateJoin = 45,

    // -- Clan war (current) --
    ClanWarMemberList = 50,
    ClanWarAttackStart = 51,
    ClanWarAttackEnd = 52,
    ClanWarSpectate = 53,
    ClanWarStateUpdate = 54,

    // -- Battle status --
    BattleStatusList = 60,
    BattleStatusUpdate = 61,
}

impl MessageType {
    /// All known message types, in wire-id order.
    pub const ALL: [MessageType; 37] = [
        Self::Login,
        Self::UploadMap,
        Self::QueryMap,
        Self::AttackData,
        Self::UserListRequest,
        Self::UserListResponse,
        Self::FindMatch,
        Self::MatchFound,
        Self::CancelMatch,
        Self::AttackStart,
        Self::AttackResult,
        Self::BattleReplay,
        Self::CreateClan,
        Self::JoinClan,
        Self::LeaveClan,
        Self::ClanList,
        Self::ClanMembers,
        Self::ClanInfo,
        Self::ClanWarSearch,
        Self::ClanWarMatch,
        Self::ClanWarAttack,
        Self::ClanWarResult,
        Self::ClanWarStatus,
        Self::ClanWarEnd,
        Self::PvpRequest,
        Self::PvpStart,
        Self::PvpAction,
        Self::PvpEnd,
        Self::SpectateRequest,
        Self::SpectateJoin,
        Self::ClanWarMemberList,
        Self::ClanWarAttackStart,
        Self::ClanWarAttackEnd,
        Self::ClanWarSpectate,
        Self::ClanWarStateUpdate,
        Self::BattleStatusList,
        Self::BattleStatusUpdate,
    ];

    /// Returns the wire id.
    pub fn id(self) -> u32 {
        self as u32
    }
}

impl From<MessageType> for u32 {
    fn from(kind: MessageType) -> u32 {
        kind as u32
    }
}

impl TryFrom<u32> for MessageType {
    type Error = ProtocolError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id() == id)
            .ok_or(ProtocolError::UnknownMessageType(id))
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.id())
    }
}

// ---------------------------------------------------------------------------
// ErrorCode: typed, non-fatal failures
// ---------------------------------------------------------------------------

/// A domain failure reported back to the client.
///
/// None of these close the connection. On the wire they are
/// SCREAMING_SNAKE_CASE strings such as `"ALREADY_IN_BATTLE"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotLoggedIn,
    TargetOffline,
    NoMap,
    AlreadyInBattle,
    InvalidTarget,
    NoActiveBattle,
    WarNotFound,
    NoMapData,
    AlreadyInClan,
    ClanNotFound,
    ClanClosed,
    TrophiesTooLow,
    NotInClan,
    UnknownPlayer,
    NoClan,
    StorageFailure,
    MalformedBody,
}

impl ErrorCode {
    /// The wire spelling of this code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotLoggedIn => "NOT_LOGGED_IN",
            Self::TargetOffline => "TARGET_OFFLINE",
            Self::NoMap => "NO_MAP",
            Self::AlreadyInBattle => "ALREADY_IN_BATTLE",
            Self::InvalidTarget => "INVALID_TARGET",
            Self::NoActiveBattle => "NO_ACTIVE_BATTLE",
            Self::WarNotFound => "WAR_NOT_FOUND",
            Self::NoMapData => "NO_MAP_DATA",
            Self::AlreadyInClan => "ALREADY_IN_CLAN",
            Self::ClanNotFound => "CLAN_NOT_FOUND",
            Self::ClanClosed => "CLAN_CLOSED",
            Self::TrophiesTooLow => "TROPHIES_TOO_LOW",
            Self::NotInClan => "NOT_IN_CLAN",
            Self::UnknownPlayer => "UNKNOWN_PLAYER",
            Self::NoClan => "NO_CLAN",
            Self::StorageFailure => "STORAGE_FAILURE",
            Self::MalformedBody => "MALFORMED_BODY",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_try_from_known_id() {
        assert_eq!(MessageType::try_from(42).unwrap(), MessageType::PvpAction);
        assert_eq!(MessageType::try_from(35).unwrap(), MessageType::ClanWarEnd);
    }

    #[test]
    fn test_message_type_try_from_unknown_id_is_error() {
        assert!(matches!(
            MessageType::try_from(99),
            Err(ProtocolError::UnknownMessageType(99))
        ));
    }

    #[test]
    fn test_message_type_all_ids_are_unique() {
        let mut ids: Vec<u32> = MessageType::ALL.iter().map(|k| k.id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), MessageType::ALL.len());
    }

    #[test]
    fn test_player_id_serializes_as_bare_string() {
        let json = serde_json::to_string(&PlayerId::new("p1")).unwrap();
        assert_eq!(json, r#""p1""#);
    }

    #[test]
    fn test_error_code_serde_matches_as_str() {
        for code in [
            ErrorCode::NotLoggedIn,
            ErrorCode::TrophiesTooLow,
            ErrorCode::NoMapData,
            ErrorCode::MalformedBody,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }
}
