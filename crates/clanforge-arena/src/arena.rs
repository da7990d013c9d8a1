//! The 1v1 battle table.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use clanforge_protocol::{
    ActionData, BattleStatusList, EndReason, MessageType, PlayerId, PvpEnd, PvpStart, SpectateJoin,
};
use clanforge_session::{Outbox, PlayerRegistry};
use clanforge_transport::{ConnectionId, Frame};
use tokio::sync::Mutex;

use crate::{ArenaError, PvpSession};

type SessionTable = BTreeMap<PlayerId, PvpSession>;

/// Live 1v1 battles, keyed by attacker.
///
/// Frames to participants are queued while the table lock is held, so
/// every recipient sees them in table order: a spectator's join reply,
/// carrying the history so far, always precedes the next live action.
/// Queueing never blocks; the sockets are written by each connection's
/// writer task.
///
/// Lock order: the table lock may be held while calling into the
/// [`PlayerRegistry`].
pub struct Arena {
    registry: Arc<PlayerRegistry>,
    sessions: Mutex<SessionTable>,
}

impl Arena {
    pub fn new(registry: Arc<PlayerRegistry>) -> Self {
        Self {
            registry,
            sessions: Mutex::new(BTreeMap::new()),
        }
    }

    /// Starts a battle from the player on `conn` against `target_id`.
    ///
    /// On success the attacker receives the defender's frozen layout, the
    /// defender is told who is attacking, and every logged-in player gets
    /// the new battle-status list.
    pub async fn request_battle(&self, conn: ConnectionId, target_id: &PlayerId) -> Result<(), ArenaError> {
        let attacker = self
            .registry
            .get_by_connection(conn)
            .await
            .map_err(|_| ArenaError::NotLoggedIn(conn))?;
        let attacker_id = attacker.context.player_id.clone();
        if &attacker_id == target_id {
            return Err(ArenaError::InvalidTarget);
        }
        let defender = self
            .registry
            .get_by_id(target_id)
            .await
            .map_err(|_| ArenaError::TargetOffline(target_id.clone()))?;
        if !defender.context.has_map() {
            return Err(ArenaError::NoMap(target_id.clone()));
        }

        let statuses = {
            let mut sessions = self.sessions.lock().await;
            for id in [&attacker_id, target_id] {
                if sessions.values().any(|s| s.involves(id)) {
                    return Err(ArenaError::AlreadyInBattle(id.clone()));
                }
            }

            let map_data = defender.context.map_data.clone();
            sessions.insert(
                attacker_id.clone(),
                PvpSession::new(attacker_id.clone(), target_id.clone(), map_data.clone()),
            );
            attacker.outbox.send(
                MessageType::PvpStart,
                &PvpStart::Attack {
                    target_id: target_id.clone(),
                    map_data,
                },
            );
            defender.outbox.send(
                MessageType::PvpStart,
                &PvpStart::Defend {
                    attacker_id: attacker_id.clone(),
                },
            );
            status_list(&sessions)
        };

        tracing::info!(%attacker_id, defender_id = %target_id, "pvp session created");
        self.broadcast(&statuses).await;
        Ok(())
    }

    /// Records one action from the attacker on `conn` and forwards the
    /// raw body, unmodified, to the defender and every spectator.
    pub async fn relay_action(
        &self,
        conn: ConnectionId,
        action: ActionData,
        raw: &[u8],
    ) -> Result<(), ArenaError> {
        let player_id = self.player_on(conn).await?;
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&player_id)
            .ok_or_else(|| ArenaError::NoActiveBattle(player_id.clone()))?;
        session.history.push(action);

        let frame = Frame::new(MessageType::PvpAction.into(), raw.to_vec());
        let recipients: Vec<PlayerId> = std::iter::once(&session.defender_id)
            .chain(&session.spectators)
            .cloned()
            .collect();
        for recipient in &recipients {
            if let Some(outbox) = self.registry.outbox_of(recipient).await {
                outbox.send_frame(frame.clone());
            }
        }
        tracing::debug!(attacker_id = %player_id, recipients = recipients.len(), "pvp action relayed");
        Ok(())
    }

    /// Adds the player on `conn` as a spectator of the battle `target_id`
    /// is fighting in, and sends them the full history so far.
    ///
    /// On error nothing was sent; the caller replies with an explicit
    /// [`SpectateJoin::Unavailable`].
    pub async fn spectate(&self, conn: ConnectionId, target_id: &PlayerId) -> Result<(), ArenaError> {
        let spectator = self
            .registry
            .get_by_connection(conn)
            .await
            .map_err(|_| ArenaError::NotLoggedIn(conn))?;
        let spectator_id = spectator.context.player_id;

        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .values_mut()
            .find(|s| s.is_active && s.involves(target_id))
            .ok_or_else(|| ArenaError::NoActiveBattle(target_id.clone()))?;
        if session.map_data.is_empty() {
            return Err(ArenaError::NoMap(session.defender_id.clone()));
        }

        if !session.involves(&spectator_id) && !session.spectators.contains(&spectator_id) {
            session.spectators.push(spectator_id.clone());
        }
        spectator.outbox.send(
            MessageType::SpectateJoin,
            &SpectateJoin::Joined {
                attacker_id: session.attacker_id.clone(),
                defender_id: session.defender_id.clone(),
                map_data: session.map_data.clone(),
                history: Some(session.history.clone()),
            },
        );
        tracing::info!(
            %spectator_id,
            attacker_id = %session.attacker_id,
            defender_id = %session.defender_id,
            replayed = session.history.len(),
            "spectator joined"
        );
        Ok(())
    }

    /// Ends the battle `attacker_id` is attacking in.
    ///
    /// The defender and spectators are told the battle ended and the
    /// status list is re-broadcast. Returns `false` if there was none.
    pub async fn end_session(&self, attacker_id: &PlayerId) -> bool {
        let statuses = {
            let mut sessions = self.sessions.lock().await;
            let Some(session) = sessions.remove(attacker_id) else {
                return false;
            };
            self.notify_end(std::iter::once(&session.defender_id), EndReason::BattleEnded)
                .await;
            self.notify_end(&session.spectators, EndReason::BattleEnded).await;
            status_list(&sessions)
        };

        tracing::info!(%attacker_id, "pvp session ended");
        self.broadcast(&statuses).await;
        true
    }

    /// Ends the battle the player on `conn` is in: the one they attack,
    /// else the one they defend. Returns the attacker id of that battle.
    pub async fn end_battle_for(&self, conn: ConnectionId) -> Result<PlayerId, ArenaError> {
        let player_id = self.player_on(conn).await?;
        let attacker_id = {
            let sessions = self.sessions.lock().await;
            if sessions.contains_key(&player_id) {
                Some(player_id.clone())
            } else {
                sessions
                    .values()
                    .find(|s| s.defender_id == player_id)
                    .map(|s| s.attacker_id.clone())
            }
        };
        match attacker_id {
            Some(attacker_id) if self.end_session(&attacker_id).await => Ok(attacker_id),
            _ => Err(ArenaError::NoActiveBattle(player_id)),
        }
    }

    /// Disconnect cleanup for `player_id`.
    ///
    /// - as attacker: the defender hears `OPPONENT_DISCONNECTED`,
    ///   spectators hear `BATTLE_ENDED`, the battle is removed;
    /// - as defender: the attacker hears `DEFENDER_DISCONNECTED`,
    ///   spectators hear `BATTLE_ENDED`, the battle is removed;
    /// - as spectator: they are dropped from the list, the battle goes on.
    ///
    /// Idempotent, and a no-op for an uninvolved player. Returns `true`
    /// if any battle ended, in which case the status list was re-broadcast.
    pub async fn cleanup_player(&self, player_id: &PlayerId) -> bool {
        let statuses = {
            let mut sessions = self.sessions.lock().await;
            let mut ended = 0usize;

            if let Some(session) = sessions.remove(player_id) {
                self.notify_end(
                    std::iter::once(&session.defender_id),
                    EndReason::OpponentDisconnected,
                )
                .await;
                self.notify_end(&session.spectators, EndReason::BattleEnded).await;
                ended += 1;
            }

            for session in sessions.values_mut() {
                session.spectators.retain(|s| s != player_id);
            }

            let defended: Vec<PlayerId> = sessions
                .values()
                .filter(|s| &s.defender_id == player_id)
                .map(|s| s.attacker_id.clone())
                .collect();
            for attacker_id in defended {
                if let Some(session) = sessions.remove(&attacker_id) {
                    self.notify_end(
                        std::iter::once(&session.attacker_id),
                        EndReason::DefenderDisconnected,
                    )
                    .await;
                    self.notify_end(&session.spectators, EndReason::BattleEnded).await;
                    ended += 1;
                }
            }

            if ended == 0 {
                return false;
            }
            tracing::info!(%player_id, ended, "pvp sessions cleaned up after disconnect");
            status_list(&sessions)
        };

        self.broadcast(&statuses).await;
        true
    }

    /// Every active battle, both roles.
    pub async fn battle_status(&self) -> BattleStatusList {
        status_list(&*self.sessions.lock().await)
    }

    /// Sends the current status list to one player.
    pub async fn send_status(&self, outbox: &Outbox) {
        let statuses = self.battle_status().await;
        outbox.send(MessageType::BattleStatusList, &statuses);
    }

    /// Ids of everyone attacking or defending right now.
    pub async fn players_in_battle(&self) -> HashSet<PlayerId> {
        let sessions = self.sessions.lock().await;
        sessions
            .values()
            .flat_map(|s| [s.attacker_id.clone(), s.defender_id.clone()])
            .collect()
    }

    /// A copy of the battle `attacker_id` is attacking in.
    pub async fn session(&self, attacker_id: &PlayerId) -> Option<PvpSession> {
        self.sessions.lock().await.get(attacker_id).cloned()
    }

    /// Number of active battles.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    async fn player_on(&self, conn: ConnectionId) -> Result<PlayerId, ArenaError> {
        self.registry
            .get_by_connection(conn)
            .await
            .map(|handle| handle.context.player_id)
            .map_err(|_| ArenaError::NotLoggedIn(conn))
    }

    async fn notify_end<'a>(&self, recipients: impl IntoIterator<Item = &'a PlayerId>, reason: EndReason) {
        for recipient in recipients {
            if let Some(outbox) = self.registry.outbox_of(recipient).await {
                outbox.send(MessageType::PvpEnd, &PvpEnd { reason });
            }
        }
    }

    async fn broadcast(&self, statuses: &BattleStatusList) {
        for handle in self.registry.snapshot().await {
            handle.outbox.send(MessageType::BattleStatusList, statuses);
        }
    }
}

fn status_list(sessions: &SessionTable) -> BattleStatusList {
    BattleStatusList {
        statuses: sessions
            .values()
            .filter(|s| s.is_active)
            .flat_map(PvpSession::statuses)
            .collect(),
    }
}
