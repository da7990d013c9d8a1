//! The war room: clan queue, running wars, attacks, and war end.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use clanforge_clan::ClanHall;
use clanforge_protocol::{
    ClanId, MessageType, PlayerId, SpectateJoin, WarEnd, WarId, WarMatch, WarMemberList, WarState,
};
use clanforge_session::PlayerRegistry;
use clanforge_transport::ConnectionId;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{AttackRecord, ClanWarMember, ClanWarSession, Side, WarBattle, WarError};

/// Default war length: one day.
pub const DEFAULT_WAR_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Deadline used when `now + duration` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

fn deadline(now: Instant, duration: Duration) -> Instant {
    now.checked_add(duration)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

#[derive(Debug)]
struct WarTable {
    queue: VecDeque<ClanId>,
    wars: BTreeMap<WarId, ClanWarSession>,
    next_id: u64,
}

impl WarTable {
    fn war(&mut self, war_id: &WarId) -> Result<&mut ClanWarSession, WarError> {
        self.wars
            .get_mut(war_id)
            .ok_or_else(|| WarError::WarNotFound(war_id.clone()))
    }
}

/// Pairs queued clans and runs their wars.
///
/// Clans are paired strictly first-in, first-out, with no trophy
/// balancing. Rosters are frozen when a war starts; the only live
/// membership lookups afterwards decide which side an attacker or a
/// member-list requester is on.
///
/// Lock order: the war table lock may be held while calling into
/// [`ClanHall`] and then [`PlayerRegistry`].
pub struct ClanWarRoom {
    registry: Arc<PlayerRegistry>,
    hall: Arc<ClanHall>,
    war_duration: Duration,
    table: Mutex<WarTable>,
}

impl ClanWarRoom {
    pub fn new(registry: Arc<PlayerRegistry>, hall: Arc<ClanHall>, war_duration: Duration) -> Self {
        Self {
            registry,
            hall,
            war_duration,
            table: Mutex::new(WarTable {
                queue: VecDeque::new(),
                wars: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Queues a clan for war. When two clans are waiting, the two at the
    /// front are popped and a war between them starts.
    ///
    /// Unknown clans, clans already queued, and clans already at war are
    /// ignored. Returns the id of a war started by this call.
    pub async fn add_to_queue(&self, clan_id: &ClanId) -> Option<WarId> {
        let mut table = self.table.lock().await;
        if !self.hall.exists(clan_id).await {
            tracing::debug!(%clan_id, "unknown clan cannot queue for war");
            return None;
        }
        if table.queue.contains(clan_id) || table.wars.values().any(|w| w.involves_clan(clan_id)) {
            return None;
        }
        table.queue.push_back(clan_id.clone());
        tracing::info!(%clan_id, queued = table.queue.len(), "clan queued for war");

        if table.queue.len() < 2 {
            return None;
        }
        let (clan1_id, clan2_id) = match (table.queue.pop_front(), table.queue.pop_front()) {
            (Some(a), Some(b)) => (a, b),
            _ => return None,
        };
        Some(self.start_war(&mut table, clan1_id, clan2_id).await)
    }

    async fn start_war(&self, table: &mut WarTable, clan1_id: ClanId, clan2_id: ClanId) -> WarId {
        let war_id = WarId::new(format!("WAR_{}", table.next_id));
        table.next_id += 1;

        let clan1_ids = self.hall.member_ids(&clan1_id).await;
        let clan2_ids = self.hall.member_ids(&clan2_id).await;
        let clan1_members = self.snapshot_roster(&clan1_ids).await;
        let clan2_members = self.snapshot_roster(&clan2_ids).await;

        let now = Instant::now();
        table.wars.insert(
            war_id.clone(),
            ClanWarSession {
                war_id: war_id.clone(),
                clan1_id: clan1_id.clone(),
                clan2_id: clan2_id.clone(),
                clan1_members,
                clan2_members,
                active_battles: BTreeMap::new(),
                clan1_total_stars: 0,
                clan2_total_stars: 0,
                started_at: now,
                ends_at: deadline(now, self.war_duration),
                is_active: true,
            },
        );
        tracing::info!(%war_id, %clan1_id, %clan2_id, "clan war started");

        for (members, opponent) in [(&clan1_ids, &clan2_id), (&clan2_ids, &clan1_id)] {
            let notice = WarMatch {
                war_id: war_id.clone(),
                clan1_id: clan1_id.clone(),
                clan2_id: clan2_id.clone(),
                opponent_clan_id: opponent.clone(),
            };
            for member in members {
                if let Some(outbox) = self.registry.outbox_of(member).await {
                    outbox.send(MessageType::ClanWarMatch, &notice);
                }
            }
        }
        war_id
    }

    async fn snapshot_roster(&self, member_ids: &[PlayerId]) -> Vec<ClanWarMember> {
        let mut roster = Vec::with_capacity(member_ids.len());
        for member_id in member_ids {
            let profile = self.registry.profile(member_id).await;
            roster.push(ClanWarMember::new(member_id.clone(), profile.name, profile.map_data));
        }
        roster
    }

    /// Starts an attack by the player on `conn` against a roster member.
    /// The attacker must be on a frozen roster or a current member of one
    /// of the two clans. Returns the target's frozen layout.
    pub async fn attack_start(
        &self,
        conn: ConnectionId,
        war_id: &WarId,
        target_id: &PlayerId,
    ) -> Result<String, WarError> {
        let attacker_id = self.player_on(conn).await?;
        let mut table = self.table.lock().await;
        if table
            .wars
            .values()
            .any(|w| w.active_battles.contains_key(&attacker_id))
        {
            return Err(WarError::AlreadyInBattle(attacker_id));
        }
        let war = table.war(war_id)?;

        let target_side = war
            .roster_side(target_id)
            .ok_or_else(|| WarError::NoMapData(target_id.clone()))?;
        let attacker_side = match war.roster_side(&attacker_id) {
            Some(side) => side,
            None => self
                .live_side(&attacker_id, &war.clan1_id, &war.clan2_id)
                .await
                .ok_or_else(|| WarError::NotInWar(attacker_id.clone()))?,
        };
        if attacker_side == target_side {
            return Err(WarError::InvalidTarget(target_id.clone()));
        }
        let map_data = war
            .roster(target_side)
            .iter()
            .find(|m| &m.member_id == target_id)
            .map(|m| m.map_data.clone())
            .filter(|m| !m.is_empty())
            .ok_or_else(|| WarError::NoMapData(target_id.clone()))?;

        war.active_battles.insert(
            attacker_id.clone(),
            WarBattle {
                attacker_id: attacker_id.clone(),
                defender_id: target_id.clone(),
                map_data: map_data.clone(),
                spectators: Vec::new(),
            },
        );
        tracing::info!(%war_id, %attacker_id, %target_id, "war attack started");
        Ok(map_data)
    }

    /// Finishes the attack of the player on `conn`.
    ///
    /// The attacker's side is decided by live clan membership, then the
    /// defender is looked up on the opposing frozen roster. An attacker in
    /// neither clan credits nothing. If the defender is found, the
    /// record is appended, the defender's best result is updated on strict
    /// improvement, and the attacking clan's total grows by
    /// `stars_earned` whether or not it was a new best. The new totals are
    /// pushed to every current member of both clans.
    pub async fn attack_end(
        &self,
        conn: ConnectionId,
        war_id: &WarId,
        stars_earned: u32,
        destruction_rate: f32,
    ) -> Result<WarState, WarError> {
        let attacker = self
            .registry
            .get_by_connection(conn)
            .await
            .map_err(|_| WarError::NotLoggedIn(conn))?;
        let attacker_id = attacker.context.player_id;

        let mut table = self.table.lock().await;
        let war = table.war(war_id)?;
        let defender_id = war
            .active_battles
            .get(&attacker_id)
            .map(|b| b.defender_id.clone())
            .ok_or_else(|| WarError::NoActiveBattle(attacker_id.clone()))?;

        let attacker_side = self
            .live_side(&attacker_id, &war.clan1_id, &war.clan2_id)
            .await;
        let defender = match attacker_side {
            Some(side) => war
                .roster_mut(side.opposite())
                .iter_mut()
                .find(|m| m.member_id == defender_id),
            None => None,
        };
        let recorded = match defender {
            Some(member) => {
                member.record_attack(AttackRecord::now(
                    attacker_id.clone(),
                    attacker.context.player_name.clone(),
                    stars_earned,
                    destruction_rate,
                ));
                true
            }
            None => false,
        };
        if let (true, Some(side)) = (recorded, attacker_side) {
            war.add_stars(side, stars_earned);
            tracing::info!(%war_id, %attacker_id, %defender_id, stars_earned, destruction_rate, "war attack ended");
        } else {
            tracing::debug!(%war_id, %attacker_id, %defender_id, "attacker left both clans or defender not on opposing roster, no stars");
        }
        war.active_battles.remove(&attacker_id);

        let state = war.state();
        let clans = [war.clan1_id.clone(), war.clan2_id.clone()];
        self.send_to_clans(&clans, MessageType::ClanWarStateUpdate, &state).await;
        Ok(state)
    }

    /// Adds the player on `conn` as a spectator of the war battle that
    /// `target_id` is in. The reply carries no action history.
    pub async fn spectate(
        &self,
        conn: ConnectionId,
        war_id: &WarId,
        target_id: &PlayerId,
    ) -> Result<SpectateJoin, WarError> {
        let spectator_id = self.player_on(conn).await?;
        let mut table = self.table.lock().await;
        let war = table.war(war_id)?;
        let battle = war
            .active_battles
            .values_mut()
            .find(|b| &b.attacker_id == target_id || &b.defender_id == target_id)
            .ok_or_else(|| WarError::NothingToWatch(target_id.clone()))?;
        if battle.map_data.is_empty() {
            return Err(WarError::NoMapData(battle.defender_id.clone()));
        }
        if !battle.spectators.contains(&spectator_id) {
            battle.spectators.push(spectator_id.clone());
        }
        tracing::info!(%war_id, %spectator_id, attacker_id = %battle.attacker_id, "war spectator joined");
        Ok(SpectateJoin::Joined {
            attacker_id: battle.attacker_id.clone(),
            defender_id: battle.defender_id.clone(),
            map_data: battle.map_data.clone(),
            history: None,
        })
    }

    /// The enemy roster from `requester_id`'s point of view, with both
    /// running totals. A requester's own side is never listed.
    pub async fn member_list(&self, war_id: &WarId, requester_id: &PlayerId) -> Result<WarMemberList, WarError> {
        let mut table = self.table.lock().await;
        let war = table.war(war_id)?;
        let enemy = if self.hall.is_member(requester_id, &war.clan1_id).await {
            Side::Clan2
        } else {
            Side::Clan1
        };
        Ok(WarMemberList {
            war_id: war.war_id.clone(),
            clan1_total_stars: war.clan1_total_stars,
            clan2_total_stars: war.clan2_total_stars,
            enemy_members: war.member_entries(enemy),
        })
    }

    /// Totals of the war `clan_id` is fighting.
    pub async fn status_for_clan(&self, clan_id: &ClanId) -> Option<WarState> {
        let table = self.table.lock().await;
        table
            .wars
            .values()
            .find(|w| w.involves_clan(clan_id))
            .map(ClanWarSession::state)
    }

    /// Ends a war now: active attacks are dropped, the war is removed, and
    /// both clans' members receive the final totals and winner.
    pub async fn end_war(&self, war_id: &WarId) -> Option<WarEnd> {
        let mut table = self.table.lock().await;
        let war = table.wars.remove(war_id)?;
        Some(self.finish(war).await)
    }

    /// Ends every war whose deadline has passed.
    pub async fn sweep_expired(&self) -> Vec<WarEnd> {
        self.sweep_expired_at(Instant::now()).await
    }

    /// Ends every war whose deadline is at or before `now`.
    pub async fn sweep_expired_at(&self, now: Instant) -> Vec<WarEnd> {
        let mut table = self.table.lock().await;
        let expired: Vec<WarId> = table
            .wars
            .values()
            .filter(|w| w.ends_at <= now)
            .map(|w| w.war_id.clone())
            .collect();

        let mut ended = Vec::with_capacity(expired.len());
        for war_id in expired {
            if let Some(war) = table.wars.remove(&war_id) {
                ended.push(self.finish(war).await);
            }
        }
        ended
    }

    async fn finish(&self, mut war: ClanWarSession) -> WarEnd {
        war.is_active = false;
        let dropped = war.active_battles.len();
        war.active_battles.clear();

        let summary = war.end_summary();
        tracing::info!(
            war_id = %summary.war_id,
            clan1_stars = summary.clan1_stars,
            clan2_stars = summary.clan2_stars,
            winner = ?summary.winner_clan_id,
            dropped_attacks = dropped,
            "clan war ended"
        );
        let clans = [war.clan1_id.clone(), war.clan2_id.clone()];
        self.send_to_clans(&clans, MessageType::ClanWarEnd, &summary).await;
        summary
    }

    /// Disconnect cleanup: drops `player_id`'s attacks in progress (no
    /// record, no stars) and removes them from war spectator lists.
    /// Returns how many attacks were dropped.
    pub async fn cleanup_player(&self, player_id: &PlayerId) -> usize {
        let mut table = self.table.lock().await;
        let mut dropped = 0;
        for war in table.wars.values_mut() {
            if war.active_battles.remove(player_id).is_some() {
                dropped += 1;
            }
            for battle in war.active_battles.values_mut() {
                battle.spectators.retain(|s| s != player_id);
            }
        }
        if dropped > 0 {
            tracing::info!(%player_id, dropped, "war attacks dropped after disconnect");
        }
        dropped
    }

    /// A copy of one war.
    pub async fn war(&self, war_id: &WarId) -> Option<ClanWarSession> {
        self.table.lock().await.wars.get(war_id).cloned()
    }

    /// The war `clan_id` is fighting.
    pub async fn war_of_clan(&self, clan_id: &ClanId) -> Option<WarId> {
        let table = self.table.lock().await;
        table
            .wars
            .values()
            .find(|w| w.involves_clan(clan_id))
            .map(|w| w.war_id.clone())
    }

    /// Clans waiting for an opponent, front first.
    pub async fn queued(&self) -> Vec<ClanId> {
        self.table.lock().await.queue.iter().cloned().collect()
    }

    /// Number of running wars.
    pub async fn len(&self) -> usize {
        self.table.lock().await.wars.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.lock().await.wars.is_empty()
    }

    /// Which side `player_id` fights on by live clan membership.
    async fn live_side(&self, player_id: &PlayerId, clan1_id: &ClanId, clan2_id: &ClanId) -> Option<Side> {
        if self.hall.is_member(player_id, clan1_id).await {
            Some(Side::Clan1)
        } else if self.hall.is_member(player_id, clan2_id).await {
            Some(Side::Clan2)
        } else {
            None
        }
    }

    async fn player_on(&self, conn: ConnectionId) -> Result<PlayerId, WarError> {
        self.registry
            .get_by_connection(conn)
            .await
            .map(|handle| handle.context.player_id)
            .map_err(|_| WarError::NotLoggedIn(conn))
    }

    async fn send_to_clans<T: serde::Serialize>(&self, clans: &[ClanId], kind: MessageType, body: &T) {
        for clan_id in clans {
            for member in self.hall.member_ids(clan_id).await {
                if let Some(outbox) = self.registry.outbox_of(&member).await {
                    outbox.send(kind, body);
                }
            }
        }
    }
}
