//! The per-connection player record.

use clanforge_protocol::{ClanId, PlayerId};
use clanforge_transport::ConnectionId;
use tokio::time::Instant;

/// Starting gold and elixir when the login body carries none.
pub const DEFAULT_RESOURCES: u32 = 1000;

/// Everything the server knows about one logged-in connection.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerContext {
    pub conn: ConnectionId,
    pub player_id: PlayerId,
    pub player_name: String,
    pub clan_id: Option<ClanId>,
    /// Last uploaded base layout. Empty until the client sends one.
    pub map_data: String,
    pub trophies: u32,
    pub gold: u32,
    pub elixir: u32,
    pub is_searching_match: bool,
    pub match_started_at: Option<Instant>,
}

impl PlayerContext {
    /// A freshly logged-in player with default resources and no layout.
    pub fn new(
        conn: ConnectionId,
        player_id: PlayerId,
        player_name: impl Into<String>,
        trophies: u32,
    ) -> Self {
        Self {
            conn,
            player_id,
            player_name: player_name.into(),
            clan_id: None,
            map_data: String::new(),
            trophies,
            gold: DEFAULT_RESOURCES,
            elixir: DEFAULT_RESOURCES,
            is_searching_match: false,
            match_started_at: None,
        }
    }

    pub fn has_map(&self) -> bool {
        !self.map_data.is_empty()
    }
}

/// Public view of a player, online or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerProfile {
    pub player_id: PlayerId,
    /// Display name, or the id itself when the player is offline.
    pub name: String,
    pub trophies: u32,
    /// Live layout when online, else the last archived upload.
    pub map_data: String,
    pub online: bool,
}
