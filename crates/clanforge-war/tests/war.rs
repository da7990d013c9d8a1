//! Integration tests for `ClanWarRoom` with a live `ClanHall` and
//! `PlayerRegistry`.

use std::sync::Arc;
use std::time::Duration;

use clanforge_clan::ClanHall;
use clanforge_protocol::{
    ClanId, CreateClanRequest, ErrorCode, MessageType, PlayerId, SpectateJoin, WarId,
};
use clanforge_session::{Outbox, OutboxReceiver, PlayerContext, PlayerRegistry};
use clanforge_transport::ConnectionId;
use clanforge_war::{ClanWarRoom, WarError};
use serde_json::Value;

// -- Helpers --------------------------------------------------------------

fn pid(id: &str) -> PlayerId {
    PlayerId::new(id)
}

fn conn(id: u64) -> ConnectionId {
    ConnectionId::new(id)
}

const HOUR: Duration = Duration::from_secs(3600);

struct World {
    registry: Arc<PlayerRegistry>,
    hall: Arc<ClanHall>,
    room: ClanWarRoom,
}

impl World {
    fn new() -> Self {
        Self::with_duration(HOUR)
    }

    fn with_duration(war_duration: Duration) -> Self {
        let registry = Arc::new(PlayerRegistry::new());
        let hall = Arc::new(ClanHall::in_memory(Arc::clone(&registry)));
        let room = ClanWarRoom::new(Arc::clone(&registry), Arc::clone(&hall), war_duration);
        Self { registry, hall, room }
    }

    async fn login(&self, c: u64, player: &str, map: Option<&str>) -> OutboxReceiver {
        let (outbox, rx) = Outbox::channel(conn(c));
        self.registry
            .register(PlayerContext::new(conn(c), pid(player), player, 1000), outbox)
            .await;
        if let Some(map) = map {
            self.registry.upload_layout(conn(c), map.into()).await.unwrap();
        }
        rx
    }

    async fn found(&self, leader: &str, name: &str) -> ClanId {
        let req = CreateClanRequest {
            name: name.into(),
            description: String::new(),
            required_trophies: 0,
            is_open: true,
        };
        self.hall.create_clan(&pid(leader), &req).await.unwrap()
    }

    /// Two clans of two members each, at war.
    ///
    /// Clan 1: a1 (conn 1), a2 (conn 2). Clan 2: b1 (conn 3), b2 (conn 4).
    async fn at_war(&self) -> (WarId, ClanId, ClanId, Vec<OutboxReceiver>) {
        let rxs = vec![
            self.login(1, "a1", Some("map-a1")).await,
            self.login(2, "a2", Some("map-a2")).await,
            self.login(3, "b1", Some("map-b1")).await,
            self.login(4, "b2", None).await,
        ];
        let clan1 = self.found("a1", "Wolves").await;
        self.hall.join_clan(&pid("a2"), &clan1).await.unwrap();
        let clan2 = self.found("b1", "Bears").await;
        self.hall.join_clan(&pid("b2"), &clan2).await.unwrap();

        assert!(self.room.add_to_queue(&clan1).await.is_none());
        let war = self.room.add_to_queue(&clan2).await.unwrap();
        (war, clan1, clan2, rxs)
    }
}

fn bodies(rx: &mut OutboxReceiver, kind: MessageType) -> Vec<Value> {
    let mut out = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        if frame.kind == u32::from(kind) {
            out.push(serde_json::from_slice(&frame.body).unwrap());
        }
    }
    out
}

// =========================================================================
// add_to_queue()
// =========================================================================

#[tokio::test]
async fn test_add_to_queue_pairs_fifo_and_notifies_members() {
    let w = World::new();
    let (war, clan1, clan2, mut rxs) = w.at_war().await;

    assert_eq!(war.as_str(), "WAR_1");
    assert!(w.room.queued().await.is_empty());

    let to_a1 = bodies(&mut rxs[0], MessageType::ClanWarMatch);
    assert_eq!(to_a1.len(), 1);
    assert_eq!(to_a1[0]["warId"], "WAR_1");
    assert_eq!(to_a1[0]["opponentClanId"], clan2.as_str());

    let to_b2 = bodies(&mut rxs[3], MessageType::ClanWarMatch);
    assert_eq!(to_b2[0]["opponentClanId"], clan1.as_str());
    assert_eq!(to_b2[0]["clan1Id"], clan1.as_str());
}

#[tokio::test]
async fn test_add_to_queue_ignores_duplicates_and_unknown_clans() {
    let w = World::new();
    let _a = w.login(1, "a1", None).await;
    let clan = w.found("a1", "Wolves").await;

    assert!(w.room.add_to_queue(&clan).await.is_none());
    assert!(w.room.add_to_queue(&clan).await.is_none());
    assert!(w.room.add_to_queue(&ClanId::new("CLAN_99")).await.is_none());

    assert_eq!(w.room.queued().await, vec![clan]);
    assert!(w.room.is_empty().await);
}

#[tokio::test]
async fn test_add_to_queue_clan_at_war_is_ignored() {
    let w = World::new();
    let (_war, clan1, _clan2, _rxs) = w.at_war().await;

    assert!(w.room.add_to_queue(&clan1).await.is_none());
    assert!(w.room.queued().await.is_empty());
}

#[tokio::test]
async fn test_add_to_queue_snapshots_rosters() {
    let w = World::new();
    let (war, _clan1, clan2, _rxs) = w.at_war().await;

    // Joining after the start does not add to the frozen roster.
    let _late = w.login(5, "late", Some("map-late")).await;
    w.hall.join_clan(&pid("late"), &clan2).await.unwrap();

    let session = w.room.war(&war).await.unwrap();
    let ids: Vec<&str> = session.clan2_members.iter().map(|m| m.member_id.as_str()).collect();
    assert_eq!(ids, ["b1", "b2"]);
    assert_eq!(session.clan2_members[0].map_data, "map-b1");
    assert!(session.clan2_members[1].map_data.is_empty());
}

// =========================================================================
// attack_start() / attack_end()
// =========================================================================

#[tokio::test]
async fn test_attack_start_returns_frozen_layout() {
    let w = World::new();
    let (war, _, _, _rxs) = w.at_war().await;

    // A new upload after the start does not change the frozen copy.
    w.registry.upload_layout(conn(3), "map-b1-v2".into()).await.unwrap();

    let map = w.room.attack_start(conn(1), &war, &pid("b1")).await.unwrap();
    assert_eq!(map, "map-b1");
}

#[tokio::test]
async fn test_attack_start_rejections_carry_codes() {
    let w = World::new();
    let (war, _, _, _rxs) = w.at_war().await;

    let err = w.room.attack_start(conn(9), &war, &pid("b1")).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotLoggedIn);

    let err = w
        .room
        .attack_start(conn(1), &WarId::new("WAR_9"), &pid("b1"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::WarNotFound);

    let err = w.room.attack_start(conn(1), &war, &pid("b2")).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NoMapData);

    let err = w.room.attack_start(conn(1), &war, &pid("nobody")).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NoMapData);

    let err = w.room.attack_start(conn(1), &war, &pid("a2")).await.unwrap_err();
    assert!(matches!(err, WarError::InvalidTarget(_)));
}

#[tokio::test]
async fn test_attack_start_player_outside_both_clans_is_rejected() {
    let w = World::new();
    let (war, _, _, _rxs) = w.at_war().await;
    let _rx = w.login(9, "out", Some("map-out")).await;

    let err = w.room.attack_start(conn(9), &war, &pid("a1")).await.unwrap_err();
    assert!(matches!(err, WarError::NotInWar(_)));
    assert_eq!(err.code(), ErrorCode::InvalidTarget);

    let err = w.room.attack_end(conn(9), &war, 3, 100.0).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NoActiveBattle);
    let session = w.room.war(&war).await.unwrap();
    assert_eq!((session.clan1_total_stars, session.clan2_total_stars), (0, 0));
}

#[tokio::test]
async fn test_attack_start_member_who_joined_after_start_fights_for_new_clan() {
    let w = World::new();
    let (war, _, clan2, _rxs) = w.at_war().await;
    let _rx = w.login(9, "late", None).await;
    w.hall.join_clan(&pid("late"), &clan2).await.unwrap();

    w.room.attack_start(conn(9), &war, &pid("a1")).await.unwrap();
    let state = w.room.attack_end(conn(9), &war, 1, 40.0).await.unwrap();
    assert_eq!((state.clan1_stars, state.clan2_stars), (0, 1));
}

#[tokio::test]
async fn test_attack_start_second_attack_is_rejected() {
    let w = World::new();
    let (war, _, _, _rxs) = w.at_war().await;

    w.room.attack_start(conn(1), &war, &pid("b1")).await.unwrap();
    let err = w.room.attack_start(conn(1), &war, &pid("b1")).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::AlreadyInBattle);
}

#[tokio::test]
async fn test_attack_end_team_total_counts_every_attack() {
    let w = World::new();
    let (war, _, _, mut rxs) = w.at_war().await;

    w.room.attack_start(conn(1), &war, &pid("b1")).await.unwrap();
    w.room.attack_end(conn(1), &war, 2, 70.0).await.unwrap();
    w.room.attack_start(conn(2), &war, &pid("b1")).await.unwrap();
    let state = w.room.attack_end(conn(2), &war, 1, 95.0).await.unwrap();

    assert_eq!(state.clan1_stars, 3);
    assert_eq!(state.clan2_stars, 0);

    let session = w.room.war(&war).await.unwrap();
    let b1 = &session.clan2_members[0];
    assert_eq!(b1.attacks_received.len(), 2);
    assert_eq!(b1.best_stars, 2);
    assert_eq!(b1.best_destruction_rate, 70.0);
    assert!(session.active_battles.is_empty());

    let updates = bodies(&mut rxs[2], MessageType::ClanWarStateUpdate);
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[1]["clan1Stars"], 3);
}

#[tokio::test]
async fn test_attack_end_without_attack_is_rejected() {
    let w = World::new();
    let (war, _, _, _rxs) = w.at_war().await;

    let err = w.room.attack_end(conn(1), &war, 3, 100.0).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NoActiveBattle);
}

#[tokio::test]
async fn test_attack_end_after_leaving_clan_records_nothing() {
    let w = World::new();
    let (war, _, _, _rxs) = w.at_war().await;

    w.room.attack_start(conn(2), &war, &pid("b1")).await.unwrap();
    // a2 is in neither clan now, so nobody is credited.
    w.hall.leave_clan(&pid("a2")).await.unwrap();

    let state = w.room.attack_end(conn(2), &war, 3, 100.0).await.unwrap();
    assert_eq!((state.clan1_stars, state.clan2_stars), (0, 0));
    let session = w.room.war(&war).await.unwrap();
    assert!(session.active_battles.is_empty());
    assert!(session.clan2_members[0].attacks_received.is_empty());
}

// =========================================================================
// spectate() / member_list()
// =========================================================================

#[tokio::test]
async fn test_spectate_joins_without_history() {
    let w = World::new();
    let (war, _, _, _rxs) = w.at_war().await;
    w.room.attack_start(conn(1), &war, &pid("b1")).await.unwrap();

    let joined = w.room.spectate(conn(2), &war, &pid("b1")).await.unwrap();
    match joined {
        SpectateJoin::Joined { attacker_id, defender_id, history, .. } => {
            assert_eq!(attacker_id, pid("a1"));
            assert_eq!(defender_id, pid("b1"));
            assert!(history.is_none());
        }
        other => panic!("expected JOINED, got {other:?}"),
    }

    let err = w.room.spectate(conn(2), &war, &pid("b2")).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NoActiveBattle);
}

#[tokio::test]
async fn test_member_list_shows_enemy_side_only() {
    let w = World::new();
    let (war, _, _, _rxs) = w.at_war().await;

    let for_a = w.room.member_list(&war, &pid("a1")).await.unwrap();
    let ids: Vec<&str> = for_a.enemy_members.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["b1", "b2"]);
    assert!(for_a.enemy_members[0].can_attack);
    assert!(!for_a.enemy_members[1].can_attack);

    let for_b = w.room.member_list(&war, &pid("b2")).await.unwrap();
    let ids: Vec<&str> = for_b.enemy_members.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["a1", "a2"]);
}

// =========================================================================
// end_war() / sweep_expired()
// =========================================================================

#[tokio::test]
async fn test_end_war_reports_winner_and_frees_clans() {
    let w = World::new();
    let (war, clan1, clan2, mut rxs) = w.at_war().await;
    w.room.attack_start(conn(3), &war, &pid("a1")).await.unwrap();
    w.room.attack_end(conn(3), &war, 2, 50.0).await.unwrap();

    let end = w.room.end_war(&war).await.unwrap();
    assert_eq!(end.clan2_stars, 2);
    assert_eq!(end.winner_clan_id, Some(clan2.clone()));
    assert!(w.room.is_empty().await);
    assert!(w.room.end_war(&war).await.is_none());

    let ends = bodies(&mut rxs[0], MessageType::ClanWarEnd);
    assert_eq!(ends.len(), 1);
    assert_eq!(ends[0]["winnerClanId"], clan2.as_str());

    // Free to queue again.
    assert!(w.room.add_to_queue(&clan1).await.is_none());
    assert_eq!(w.room.queued().await, vec![clan1]);
}

#[tokio::test(start_paused = true)]
async fn test_sweep_expired_ends_wars_past_deadline() {
    let w = World::new();
    let (war, _, _, _rxs) = w.at_war().await;
    w.room.attack_start(conn(1), &war, &pid("b1")).await.unwrap();

    tokio::time::advance(HOUR - Duration::from_secs(1)).await;
    assert!(w.room.sweep_expired().await.is_empty());

    tokio::time::advance(Duration::from_secs(1)).await;
    let ended = w.room.sweep_expired().await;
    assert_eq!(ended.len(), 1);
    assert_eq!(ended[0].winner_clan_id, None);
    assert!(w.room.war(&war).await.is_none());
}

#[tokio::test]
async fn test_add_to_queue_huge_duration_does_not_overflow() {
    let w = World::with_duration(Duration::MAX);
    let (war, _, _, _rxs) = w.at_war().await;

    assert!(w.room.sweep_expired().await.is_empty());
    assert!(w.room.war(&war).await.is_some());
}

// =========================================================================
// cleanup_player()
// =========================================================================

#[tokio::test]
async fn test_cleanup_player_drops_attack_without_stars() {
    let w = World::new();
    let (war, _, _, _rxs) = w.at_war().await;
    w.room.attack_start(conn(1), &war, &pid("b1")).await.unwrap();
    w.room.spectate(conn(2), &war, &pid("b1")).await.unwrap();

    assert_eq!(w.room.cleanup_player(&pid("a1")).await, 1);
    assert_eq!(w.room.cleanup_player(&pid("a1")).await, 0);

    let session = w.room.war(&war).await.unwrap();
    assert!(session.active_battles.is_empty());
    assert_eq!(session.clan1_total_stars, 0);
    assert!(session.clan2_members[0].attacks_received.is_empty());

    // The attacker may try again.
    w.room.attack_start(conn(1), &war, &pid("b1")).await.unwrap();
}
