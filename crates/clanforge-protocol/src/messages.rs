//! JSON bodies for every message in the table.
//!
//! Field names are camelCase on the wire (`playerId`, `clan1TotalStars`).
//! Results that can succeed or fail in different shapes are internally
//! tagged enums, so a failure never carries half-filled success fields.

use serde::{Deserialize, Serialize};

use crate::{ClanId, ErrorCode, PlayerId, WarId};

/// An opaque battle action, forwarded without interpretation.
pub type ActionData = serde_json::Value;

// ---------------------------------------------------------------------------
// Account & layout
// ---------------------------------------------------------------------------

/// Client → Server (1): "this is who I am."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub player_id: PlayerId,
    #[serde(default)]
    pub player_name: String,
    #[serde(default)]
    pub trophies: u32,
    /// The clan the client last knew it belonged to.
    #[serde(default)]
    pub clan_id: Option<ClanId>,
    #[serde(default)]
    pub gold: Option<u32>,
    #[serde(default)]
    pub elixir: Option<u32>,
}

/// Server → Client (1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginReply {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clan_id: Option<ClanId>,
}

/// Client → Server (2): the player's serialized base layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMap {
    pub map_data: String,
}

/// Client → Server: a request naming one player (3, 13, 40, 44).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRequest {
    pub target_id: PlayerId,
}

/// Server → Client (3). `map_data` is empty when nothing is saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapReply {
    pub target_id: PlayerId,
    pub map_data: String,
}

/// One row of the online user list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntry {
    pub id: PlayerId,
    pub name: String,
    pub trophies: u32,
    pub clan_id: Option<ClanId>,
    pub has_map: bool,
    pub in_battle: bool,
}

/// Server → Client (6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserList {
    pub users: Vec<UserEntry>,
}

// ---------------------------------------------------------------------------
// Matchmaking & direct attacks
// ---------------------------------------------------------------------------

/// Server → Client (11).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFound {
    pub opponent_id: PlayerId,
    pub opponent_trophies: u32,
    pub opponent_name: String,
    pub map_data: String,
}

/// Server → Client (13).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackStartReply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
}

impl AttackStartReply {
    pub fn ok(target_id: PlayerId, map_data: String) -> Self {
        Self {
            ok: true,
            target_id: Some(target_id),
            map_data: Some(map_data),
            error: None,
        }
    }

    pub fn fail(error: ErrorCode) -> Self {
        Self {
            ok: false,
            target_id: None,
            map_data: None,
            error: Some(error),
        }
    }
}

/// Client → Server (14), forwarded to the defender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackResult {
    pub attacker_id: PlayerId,
    pub defender_id: PlayerId,
    pub stars_earned: u32,
    #[serde(default)]
    pub gold_looted: u32,
    #[serde(default)]
    pub elixir_looted: u32,
    #[serde(default)]
    pub trophy_change: i32,
    #[serde(default)]
    pub replay_data: String,
}

// ---------------------------------------------------------------------------
// Clans
// ---------------------------------------------------------------------------

/// Client → Server (20).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClanRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required_trophies: u32,
    #[serde(default = "default_open")]
    pub is_open: bool,
}

fn default_open() -> bool {
    true
}

/// Client → Server: a request naming one clan (21, 24, 25).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClanIdRequest {
    pub clan_id: ClanId,
}

/// Alias kept for readability at the join call site.
pub type JoinClanRequest = ClanIdRequest;

/// Server → Client (20, 21, 22).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClanReply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clan_id: Option<ClanId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
}

impl ClanReply {
    pub fn ok(clan_id: ClanId) -> Self {
        Self {
            ok: true,
            clan_id: Some(clan_id),
            error: None,
        }
    }

    pub fn fail(error: ErrorCode) -> Self {
        Self {
            ok: false,
            clan_id: None,
            error: Some(error),
        }
    }
}

/// One row of the clan list (23).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClanListEntry {
    pub id: ClanId,
    pub name: String,
    pub members: usize,
    pub trophies: u32,
    pub required: u32,
    pub open: bool,
}

/// One member in a clan member listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClanMemberEntry {
    pub id: PlayerId,
    pub name: String,
    pub trophies: u32,
    pub online: bool,
}

/// Server → Client (24).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClanMembers {
    pub clan_id: ClanId,
    pub name: String,
    pub leader: Option<PlayerId>,
    pub members: Vec<ClanMemberEntry>,
}

/// Server → Client (25).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClanInfo {
    pub id: ClanId,
    pub name: String,
    pub leader: Option<PlayerId>,
    pub description: String,
    pub members: usize,
    pub trophies: u32,
    pub required: u32,
    pub open: bool,
}

/// Server → Client: `{"error": CODE}` for lookups without a success flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: ErrorCode,
}

// ---------------------------------------------------------------------------
// Clan war
// ---------------------------------------------------------------------------

/// Outcome of a war search (30).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarSearchStatus {
    Searching,
    NoClan,
}

/// Server → Client (30).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarSearchReply {
    pub status: WarSearchStatus,
}

/// Server → Client (31), sent to every member of both clans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarMatch {
    pub war_id: WarId,
    pub clan1_id: ClanId,
    pub clan2_id: ClanId,
    pub opponent_clan_id: ClanId,
}

/// Client → Server: a request naming one war (50).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarIdRequest {
    pub war_id: WarId,
}

/// Client → Server (32, 51, 53).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarTargetRequest {
    pub war_id: WarId,
    pub target_id: PlayerId,
}

/// Server → Client (32, 51).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result")]
pub enum WarAttackReply {
    #[serde(rename = "ATTACK", rename_all = "camelCase")]
    Attack { target_id: PlayerId, map_data: String },
    #[serde(rename = "FAIL")]
    Fail { reason: ErrorCode },
}

/// Client → Server (33, 52). Attacker identity comes from the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarAttackEnd {
    pub war_id: WarId,
    pub stars_earned: u32,
    #[serde(default)]
    pub destruction_rate: f32,
}

/// Server → Client (34, 54): running star totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarState {
    pub war_id: WarId,
    pub clan1_stars: u32,
    pub clan2_stars: u32,
}

/// Server → Client (35).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarEnd {
    pub war_id: WarId,
    pub clan1_id: ClanId,
    pub clan2_id: ClanId,
    pub clan1_stars: u32,
    pub clan2_stars: u32,
    /// `None` on a tie.
    pub winner_clan_id: Option<ClanId>,
}

/// One enemy roster entry in the war member list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarMemberEntry {
    pub id: PlayerId,
    pub name: String,
    pub best_stars: u32,
    pub best_destruction: f32,
    pub can_attack: bool,
}

/// Server → Client (50).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarMemberList {
    pub war_id: WarId,
    pub clan1_total_stars: u32,
    pub clan2_total_stars: u32,
    pub enemy_members: Vec<WarMemberEntry>,
}

// ---------------------------------------------------------------------------
// 1v1 arena
// ---------------------------------------------------------------------------

/// Server → Client (41).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result")]
pub enum PvpStart {
    /// To the requester: the defender's frozen layout.
    #[serde(rename = "ATTACK", rename_all = "camelCase")]
    Attack { target_id: PlayerId, map_data: String },
    /// To the defender.
    #[serde(rename = "DEFEND", rename_all = "camelCase")]
    Defend { attacker_id: PlayerId },
    #[serde(rename = "FAIL")]
    Fail { reason: ErrorCode },
}

/// Client → Server (42).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvpAction {
    pub action: ActionData,
}

/// Why a battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndReason {
    BattleEnded,
    OpponentDisconnected,
    DefenderDisconnected,
}

/// Server → Client (43).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PvpEnd {
    pub reason: EndReason,
}

/// Server → Client (45, 53).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum SpectateJoin {
    #[serde(rename = "JOINED", rename_all = "camelCase")]
    Joined {
        attacker_id: PlayerId,
        defender_id: PlayerId,
        map_data: String,
        /// Every action so far, in order. Absent for war spectating.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        history: Option<Vec<ActionData>>,
    },
    #[serde(rename = "UNAVAILABLE")]
    Unavailable,
}

// ---------------------------------------------------------------------------
// Battle status
// ---------------------------------------------------------------------------

/// One player's role in an active 1v1 battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleStatus {
    pub user_id: PlayerId,
    pub in_battle: bool,
    pub opponent_id: PlayerId,
    pub is_attacker: bool,
}

/// Server → Client (60).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BattleStatusList {
    pub statuses: Vec<BattleStatus>,
}
