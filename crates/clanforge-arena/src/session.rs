//! One live 1v1 battle.

use clanforge_protocol::{ActionData, BattleStatus, PlayerId};

/// A battle between an attacker and a defender.
///
/// The layout is frozen when the battle starts; later uploads by the
/// defender do not affect it. Spectators and history are kept in arrival
/// order so a late spectator can replay to the live state.
#[derive(Debug, Clone, PartialEq)]
pub struct PvpSession {
    pub attacker_id: PlayerId,
    pub defender_id: PlayerId,
    pub map_data: String,
    pub spectators: Vec<PlayerId>,
    pub history: Vec<ActionData>,
    pub is_active: bool,
}

impl PvpSession {
    pub fn new(attacker_id: PlayerId, defender_id: PlayerId, map_data: String) -> Self {
        Self {
            attacker_id,
            defender_id,
            map_data,
            spectators: Vec::new(),
            history: Vec::new(),
            is_active: true,
        }
    }

    /// `true` if `player_id` is the attacker or the defender.
    pub fn involves(&self, player_id: &PlayerId) -> bool {
        &self.attacker_id == player_id || &self.defender_id == player_id
    }

    /// Status rows for both sides.
    pub fn statuses(&self) -> [BattleStatus; 2] {
        [
            BattleStatus {
                user_id: self.attacker_id.clone(),
                in_battle: true,
                opponent_id: self.defender_id.clone(),
                is_attacker: true,
            },
            BattleStatus {
                user_id: self.defender_id.clone(),
                in_battle: true,
                opponent_id: self.attacker_id.clone(),
                is_attacker: false,
            },
        ]
    }
}
