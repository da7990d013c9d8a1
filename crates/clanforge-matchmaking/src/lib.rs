//! Trophy-based matchmaking for Clanforge.
//!
//! Players wait in a FIFO queue. Each pass walks the queue in order and
//! pairs every waiting player with the first later player whose trophy
//! count is close enough:
//!
//! ```text
//! tolerance = 200 + 10 × (whole seconds the earlier player has waited)
//! ```
//!
//! The pass is greedy and first-fit, not globally optimal. Unmatched
//! players keep their place for the next pass, where their tolerance
//! will be wider.

use std::time::Duration;

use clanforge_protocol::PlayerId;
use clanforge_transport::ConnectionId;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Tolerance for a player who has just joined the queue.
pub const BASE_TOLERANCE: u32 = 200;

/// Extra tolerance granted per whole second of waiting.
pub const TOLERANCE_PER_SECOND: u32 = 10;

/// Maximum trophy difference allowed after waiting `waited`.
pub fn tolerance(waited: Duration) -> u32 {
    let secs = u32::try_from(waited.as_secs()).unwrap_or(u32::MAX);
    BASE_TOLERANCE.saturating_add(secs.saturating_mul(TOLERANCE_PER_SECOND))
}

/// One waiting player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchQueueEntry {
    pub conn: ConnectionId,
    pub player_id: PlayerId,
    pub trophies: u32,
    pub enqueued_at: Instant,
}

impl MatchQueueEntry {
    /// An entry stamped with the current time.
    pub fn new(conn: ConnectionId, player_id: PlayerId, trophies: u32) -> Self {
        Self {
            conn,
            player_id,
            trophies,
            enqueued_at: Instant::now(),
        }
    }
}

/// The matchmaking queue.
#[derive(Debug, Default)]
pub struct Matchmaker {
    queue: Mutex<Vec<MatchQueueEntry>>,
}

impl Matchmaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a player to the back of the queue.
    ///
    /// Returns `false` if the connection is already queued; the existing
    /// entry keeps its place and its original wait time. An entry for the
    /// same player on another connection is stale and gets replaced.
    pub async fn enqueue(&self, entry: MatchQueueEntry) -> bool {
        let mut queue = self.queue.lock().await;
        if queue.iter().any(|e| e.conn == entry.conn) {
            return false;
        }
        if let Some(index) = queue.iter().position(|e| e.player_id == entry.player_id) {
            let stale = queue.remove(index);
            tracing::debug!(player_id = %entry.player_id, stale_conn = %stale.conn, "replaced stale queue entry");
        }
        tracing::debug!(player_id = %entry.player_id, trophies = entry.trophies, "queued for match");
        queue.push(entry);
        true
    }

    /// Cancels a pending entry. Returns `true` if one was removed.
    pub async fn remove(&self, conn: ConnectionId) -> bool {
        let mut queue = self.queue.lock().await;
        match queue.iter().position(|e| e.conn == conn) {
            Some(index) => {
                queue.remove(index);
                true
            }
            None => false,
        }
    }

    /// Runs one matching pass at the current time.
    pub async fn process_queue(&self) -> Vec<(MatchQueueEntry, MatchQueueEntry)> {
        self.process_queue_at(Instant::now()).await
    }

    /// Runs one matching pass as if the clock read `now`.
    ///
    /// Matched entries leave the queue; the rest stay in their original
    /// relative order.
    pub async fn process_queue_at(&self, now: Instant) -> Vec<(MatchQueueEntry, MatchQueueEntry)> {
        let mut queue = self.queue.lock().await;
        let mut pairs = Vec::new();
        if queue.len() < 2 {
            return pairs;
        }

        let mut matched = vec![false; queue.len()];
        for i in 0..queue.len() {
            if matched[i] {
                continue;
            }
            let pivot = &queue[i];
            let max_diff = tolerance(now.saturating_duration_since(pivot.enqueued_at));

            let partner = (i + 1..queue.len())
                .find(|&j| {
                    !matched[j]
                        && queue[j].player_id != pivot.player_id
                        && pivot.trophies.abs_diff(queue[j].trophies) <= max_diff
                });
            if let Some(j) = partner {
                matched[i] = true;
                matched[j] = true;
                pairs.push((queue[i].clone(), queue[j].clone()));
            }
        }

        let mut flags = matched.into_iter();
        queue.retain(|_| !flags.next().unwrap_or(false));

        for (a, b) in &pairs {
            tracing::info!(
                player_a = %a.player_id,
                player_b = %b.player_id,
                trophy_diff = a.trophies.abs_diff(b.trophies),
                "match found"
            );
        }
        pairs
    }

    /// Number of waiting players.
    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.queue.lock().await.is_empty()
    }

    /// Ids of waiting players, front first.
    pub async fn queued_players(&self) -> Vec<PlayerId> {
        self.queue
            .lock()
            .await
            .iter()
            .map(|e| e.player_id.clone())
            .collect()
    }
}

// =========================================================================
// Tests
// =========================================================================
