//! The persisted clan table.

use std::collections::BTreeMap;

use clanforge_protocol::{ClanId, PlayerId};
use serde::{Deserialize, Serialize};

/// One clan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clan {
    pub id: ClanId,
    pub name: String,
    pub leader_id: Option<PlayerId>,
    #[serde(default)]
    pub description: String,
    /// Members in join order; the first is the earliest joiner.
    pub member_ids: Vec<PlayerId>,
    pub clan_trophies: u32,
    pub required_trophies: u32,
    pub is_open: bool,
}

impl Clan {
    pub fn is_member(&self, player_id: &PlayerId) -> bool {
        self.member_ids.contains(player_id)
    }
}

/// Every clan plus the id counter, saved as one JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClanTable {
    pub next_id: u64,
    pub clans: BTreeMap<ClanId, Clan>,
}

impl Default for ClanTable {
    fn default() -> Self {
        Self {
            next_id: 1,
            clans: BTreeMap::new(),
        }
    }
}

impl ClanTable {
    /// Hands out the next `CLAN_<n>` id.
    pub fn allocate_id(&mut self) -> ClanId {
        let id = ClanId::new(format!("CLAN_{}", self.next_id));
        self.next_id += 1;
        id
    }

    /// The clan `player_id` belongs to, if any.
    pub fn clan_of(&self, player_id: &PlayerId) -> Option<&Clan> {
        self.clans.values().find(|clan| clan.is_member(player_id))
    }
}
