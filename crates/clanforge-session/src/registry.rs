//! The player registry: who is connected, on which socket.
//!
//! Two indexes are kept in sync under one lock:
//!
//! ```text
//! by_conn:   ConnectionId ──→ Entry { PlayerContext, Outbox }
//! by_player: PlayerId     ──→ ConnectionId   (the live binding)
//! ```
//!
//! Both lookups are O(1). The registry also archives the last layout
//! each player uploaded, which survives disconnects.
//!
//! # Concurrency note
//!
//! Every method takes the lock, does its work, and releases it before
//! returning. Nothing here awaits I/O while holding the lock; callers
//! that need to send to many players take a [`snapshot`](PlayerRegistry::snapshot)
//! and push to the returned outboxes.

use std::collections::HashMap;

use clanforge_protocol::PlayerId;
use clanforge_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::{Outbox, PlayerContext, PlayerProfile, SessionError};

/// A copy of a registry entry: the player's context plus their outbox.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    pub context: PlayerContext,
    pub outbox: Outbox,
}

/// What a [`register`](PlayerRegistry::register) call displaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    /// The player's previous connection, whose entry was dropped.
    pub replaced_conn: Option<ConnectionId>,
    /// A different player who was logged in on this connection. They are
    /// offline now and need the same cleanup as a disconnect.
    pub displaced: Option<PlayerId>,
}

#[derive(Debug)]
struct Entry {
    context: PlayerContext,
    outbox: Outbox,
}

impl Entry {
    fn handle(&self) -> PlayerHandle {
        PlayerHandle {
            context: self.context.clone(),
            outbox: self.outbox.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    by_conn: HashMap<ConnectionId, Entry>,
    by_player: HashMap<PlayerId, ConnectionId>,
    saved_layouts: HashMap<PlayerId, String>,
}

impl RegistryInner {
    fn live_entry(&self, player_id: &PlayerId) -> Option<&Entry> {
        self.by_player
            .get(player_id)
            .and_then(|conn| self.by_conn.get(conn))
    }
}

/// Concurrent directory of logged-in players.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    inner: Mutex<RegistryInner>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or refreshes) the player on `context.conn`.
    ///
    /// Idempotent per connection. If the player id is already bound to a
    /// different connection, the binding moves to this one and the old
    /// connection's entry is dropped; no cascade is needed there because
    /// the player is still online. If this connection was logged in under
    /// another id, that player goes offline and is reported as
    /// [`displaced`](Registration::displaced).
    pub async fn register(&self, context: PlayerContext, outbox: Outbox) -> Registration {
        let mut inner = self.inner.lock().await;
        let conn = context.conn;
        let player_id = context.player_id.clone();

        let mut displaced = None;
        if let Some(previous) = inner.by_conn.get(&conn) {
            let old_id = previous.context.player_id.clone();
            if old_id != player_id && inner.by_player.get(&old_id) == Some(&conn) {
                inner.by_player.remove(&old_id);
                tracing::info!(%conn, player_id = %old_id, new_player_id = %player_id, "connection switched player");
                displaced = Some(old_id);
            }
        }

        let replaced_conn = match inner.by_player.insert(player_id.clone(), conn) {
            Some(old_conn) if old_conn != conn => {
                inner.by_conn.remove(&old_conn);
                tracing::info!(%player_id, %old_conn, new_conn = %conn, "player rebound to new connection");
                Some(old_conn)
            }
            _ => None,
        };

        inner.by_conn.insert(conn, Entry { context, outbox });
        tracing::debug!(%player_id, %conn, online = inner.by_player.len(), "player registered");
        Registration {
            replaced_conn,
            displaced,
        }
    }

    /// Removes the entry for `conn`.
    ///
    /// Returns the removed context only when `conn` held the player's live
    /// binding; a connection that was superseded by a newer login (or never
    /// logged in) yields `None`, and disconnect cleanup must not cascade.
    pub async fn unregister(&self, conn: ConnectionId) -> Option<PlayerContext> {
        let mut inner = self.inner.lock().await;
        let entry = inner.by_conn.remove(&conn)?;
        let player_id = &entry.context.player_id;
        if inner.by_player.get(player_id) == Some(&conn) {
            inner.by_player.remove(player_id);
            tracing::debug!(%player_id, %conn, "player unregistered");
            Some(entry.context)
        } else {
            None
        }
    }

    /// Looks up the player logged in on `conn`.
    pub async fn get_by_connection(&self, conn: ConnectionId) -> Result<PlayerHandle, SessionError> {
        let inner = self.inner.lock().await;
        inner
            .by_conn
            .get(&conn)
            .map(Entry::handle)
            .ok_or(SessionError::NotLoggedIn(conn))
    }

    /// Looks up the live connection of `player_id`.
    ///
    /// `PlayerOffline` is the normal answer for a player who is not
    /// connected.
    pub async fn get_by_id(&self, player_id: &PlayerId) -> Result<PlayerHandle, SessionError> {
        let inner = self.inner.lock().await;
        inner
            .live_entry(player_id)
            .map(Entry::handle)
            .ok_or_else(|| SessionError::PlayerOffline(player_id.clone()))
    }

    /// Returns the outbox of an online player.
    pub async fn outbox_of(&self, player_id: &PlayerId) -> Option<Outbox> {
        let inner = self.inner.lock().await;
        inner.live_entry(player_id).map(|e| e.outbox.clone())
    }

    /// Deep copy of every entry, safe to iterate while sending.
    pub async fn snapshot(&self) -> Vec<PlayerHandle> {
        let inner = self.inner.lock().await;
        inner.by_conn.values().map(Entry::handle).collect()
    }

    /// Mutates the context on `conn` in place.
    pub async fn update<R>(
        &self,
        conn: ConnectionId,
        f: impl FnOnce(&mut PlayerContext) -> R,
    ) -> Result<R, SessionError> {
        let mut inner = self.inner.lock().await;
        inner
            .by_conn
            .get_mut(&conn)
            .map(|entry| f(&mut entry.context))
            .ok_or(SessionError::NotLoggedIn(conn))
    }

    /// Mutates an online player's context in place.
    pub async fn update_by_id<R>(
        &self,
        player_id: &PlayerId,
        f: impl FnOnce(&mut PlayerContext) -> R,
    ) -> Result<R, SessionError> {
        let mut inner = self.inner.lock().await;
        let conn = *inner
            .by_player
            .get(player_id)
            .ok_or_else(|| SessionError::PlayerOffline(player_id.clone()))?;
        inner
            .by_conn
            .get_mut(&conn)
            .map(|entry| f(&mut entry.context))
            .ok_or_else(|| SessionError::PlayerOffline(player_id.clone()))
    }

    /// Stores a newly uploaded layout on the live context and in the
    /// archive. Returns the uploader's id.
    pub async fn upload_layout(&self, conn: ConnectionId, map_data: String) -> Result<PlayerId, SessionError> {
        let mut inner = self.inner.lock().await;
        let entry = inner
            .by_conn
            .get_mut(&conn)
            .ok_or(SessionError::NotLoggedIn(conn))?;
        entry.context.map_data = map_data.clone();
        let player_id = entry.context.player_id.clone();
        inner.saved_layouts.insert(player_id.clone(), map_data);
        Ok(player_id)
    }

    /// The last layout `player_id` uploaded, online or not.
    pub async fn saved_layout(&self, player_id: &PlayerId) -> Option<String> {
        let inner = self.inner.lock().await;
        inner
            .live_entry(player_id)
            .map(|e| e.context.map_data.clone())
            .filter(|m| !m.is_empty())
            .or_else(|| inner.saved_layouts.get(player_id).cloned())
            .filter(|m| !m.is_empty())
    }

    /// Public view of a player whether or not they are connected.
    pub async fn profile(&self, player_id: &PlayerId) -> PlayerProfile {
        let inner = self.inner.lock().await;
        match inner.live_entry(player_id) {
            Some(entry) => PlayerProfile {
                player_id: player_id.clone(),
                name: entry.context.player_name.clone(),
                trophies: entry.context.trophies,
                map_data: if entry.context.has_map() {
                    entry.context.map_data.clone()
                } else {
                    inner.saved_layouts.get(player_id).cloned().unwrap_or_default()
                },
                online: true,
            },
            None => PlayerProfile {
                player_id: player_id.clone(),
                name: player_id.to_string(),
                trophies: 0,
                map_data: inner.saved_layouts.get(player_id).cloned().unwrap_or_default(),
                online: false,
            },
        }
    }

    pub async fn is_online(&self, player_id: &PlayerId) -> bool {
        self.inner.lock().await.by_player.contains_key(player_id)
    }

    /// Number of logged-in connections.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.by_conn.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.by_conn.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
