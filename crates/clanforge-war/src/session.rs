//! A running war and its frozen rosters.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use clanforge_protocol::{ClanId, PlayerId, WarEnd, WarId, WarMemberEntry, WarState};
use tokio::time::Instant;

/// One attack against a roster member. Append-only.
#[derive(Debug, Clone, PartialEq)]
pub struct AttackRecord {
    pub attacker_id: PlayerId,
    pub attacker_name: String,
    pub stars_earned: u32,
    pub destruction_rate: f32,
    /// Unix time in milliseconds.
    pub timestamp_ms: u64,
}

impl AttackRecord {
    pub fn now(
        attacker_id: PlayerId,
        attacker_name: String,
        stars_earned: u32,
        destruction_rate: f32,
    ) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            attacker_id,
            attacker_name,
            stars_earned,
            destruction_rate,
            timestamp_ms,
        }
    }
}

/// A roster entry, captured when the war starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ClanWarMember {
    pub member_id: PlayerId,
    pub member_name: String,
    pub map_data: String,
    pub best_stars: u32,
    pub best_destruction_rate: f32,
    pub attacks_received: Vec<AttackRecord>,
}

impl ClanWarMember {
    pub fn new(member_id: PlayerId, member_name: String, map_data: String) -> Self {
        Self {
            member_id,
            member_name,
            map_data,
            best_stars: 0,
            best_destruction_rate: 0.0,
            attacks_received: Vec::new(),
        }
    }

    /// Appends `record` and updates the best result on strict
    /// improvement. Returns `true` if the best changed.
    pub fn record_attack(&mut self, record: AttackRecord) -> bool {
        let improved = record.stars_earned > self.best_stars
            || (record.stars_earned == self.best_stars
                && record.destruction_rate > self.best_destruction_rate);
        if improved {
            self.best_stars = record.stars_earned;
            self.best_destruction_rate = record.destruction_rate;
        }
        self.attacks_received.push(record);
        improved
    }

    fn entry(&self) -> WarMemberEntry {
        WarMemberEntry {
            id: self.member_id.clone(),
            name: self.member_name.clone(),
            best_stars: self.best_stars,
            best_destruction: self.best_destruction_rate,
            can_attack: !self.map_data.is_empty(),
        }
    }
}

/// One side of a war.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Clan1,
    Clan2,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::Clan1 => Self::Clan2,
            Self::Clan2 => Self::Clan1,
        }
    }
}

/// An attack in progress inside one war.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarBattle {
    pub attacker_id: PlayerId,
    pub defender_id: PlayerId,
    pub map_data: String,
    pub spectators: Vec<PlayerId>,
}

/// A war between two clans.
#[derive(Debug, Clone, PartialEq)]
pub struct ClanWarSession {
    pub war_id: WarId,
    pub clan1_id: ClanId,
    pub clan2_id: ClanId,
    pub clan1_members: Vec<ClanWarMember>,
    pub clan2_members: Vec<ClanWarMember>,
    /// Keyed by attacker. Separate from 1v1 arena battles.
    pub active_battles: BTreeMap<PlayerId, WarBattle>,
    pub clan1_total_stars: u32,
    pub clan2_total_stars: u32,
    pub started_at: Instant,
    pub ends_at: Instant,
    pub is_active: bool,
}

impl ClanWarSession {
    pub fn clan(&self, side: Side) -> &ClanId {
        match side {
            Side::Clan1 => &self.clan1_id,
            Side::Clan2 => &self.clan2_id,
        }
    }

    pub fn roster(&self, side: Side) -> &[ClanWarMember] {
        match side {
            Side::Clan1 => &self.clan1_members,
            Side::Clan2 => &self.clan2_members,
        }
    }

    pub fn roster_mut(&mut self, side: Side) -> &mut Vec<ClanWarMember> {
        match side {
            Side::Clan1 => &mut self.clan1_members,
            Side::Clan2 => &mut self.clan2_members,
        }
    }

    /// The frozen roster `player_id` appears on.
    pub fn roster_side(&self, player_id: &PlayerId) -> Option<Side> {
        [Side::Clan1, Side::Clan2]
            .into_iter()
            .find(|&side| self.roster(side).iter().any(|m| &m.member_id == player_id))
    }

    pub fn add_stars(&mut self, side: Side, stars: u32) {
        match side {
            Side::Clan1 => self.clan1_total_stars = self.clan1_total_stars.saturating_add(stars),
            Side::Clan2 => self.clan2_total_stars = self.clan2_total_stars.saturating_add(stars),
        }
    }

    pub fn involves_clan(&self, clan_id: &ClanId) -> bool {
        &self.clan1_id == clan_id || &self.clan2_id == clan_id
    }

    /// The clan with more stars, or `None` on a tie.
    pub fn winner(&self) -> Option<ClanId> {
        match self.clan1_total_stars.cmp(&self.clan2_total_stars) {
            std::cmp::Ordering::Greater => Some(self.clan1_id.clone()),
            std::cmp::Ordering::Less => Some(self.clan2_id.clone()),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn state(&self) -> WarState {
        WarState {
            war_id: self.war_id.clone(),
            clan1_stars: self.clan1_total_stars,
            clan2_stars: self.clan2_total_stars,
        }
    }

    pub fn end_summary(&self) -> WarEnd {
        WarEnd {
            war_id: self.war_id.clone(),
            clan1_id: self.clan1_id.clone(),
            clan2_id: self.clan2_id.clone(),
            clan1_stars: self.clan1_total_stars,
            clan2_stars: self.clan2_total_stars,
            winner_clan_id: self.winner(),
        }
    }

    pub fn member_entries(&self, side: Side) -> Vec<WarMemberEntry> {
        self.roster(side).iter().map(ClanWarMember::entry).collect()
    }
}
