//! Per-connection tasks and disconnect teardown.
//!
//! Each accepted socket gets two tasks:
//!   1. the reader (this function's own task): read a frame, dispatch it
//!      through the router, repeat until EOF, a receive error, or a
//!      failed write reported by the writer;
//!   2. the writer: drain the connection's [`Outbox`] onto the socket.
//!
//! When the reader stops, [`teardown`] runs exactly once.

use std::sync::Arc;

use clanforge_protocol::PlayerId;
use clanforge_session::{Authenticator, Outbox, OutboxReceiver};
use clanforge_transport::{Connection, ConnectionId, TcpConnection, TransportError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::ClanforgeError;
use crate::router::Router;
use crate::state::ServerState;

/// Runs [`teardown`] from `Drop` if the reader task unwinds before
/// reaching its normal exit path.
struct TeardownGuard<A: Authenticator> {
    conn: ConnectionId,
    state: Option<Arc<ServerState<A>>>,
}

impl<A: Authenticator> TeardownGuard<A> {
    /// Runs teardown inline and disarms the guard.
    async fn run(mut self) {
        if let Some(state) = self.state.take() {
            teardown(&state, self.conn).await;
        }
    }
}

impl<A: Authenticator> Drop for TeardownGuard<A> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            let conn = self.conn;
            tokio::spawn(async move {
                teardown(&state, conn).await;
            });
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A: Authenticator>(
    conn: TcpConnection,
    state: Arc<ServerState<A>>,
    router: Arc<Router<A>>,
) -> Result<(), ClanforgeError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::info!(%conn_id, peer = %conn.peer_addr(), "client connected");

    let (outbox, outbound) = Outbox::channel(conn_id);
    let (writer, write_failed) = spawn_writer(Arc::clone(&conn), outbound);

    let guard = TeardownGuard {
        conn: conn_id,
        state: Some(Arc::clone(&state)),
    };

    let result = read_frames(&*conn, &state, &router, &outbox, write_failed).await;

    guard.run().await;
    drop(outbox);
    writer.abort();
    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
    result
}

/// Drains `outbound` onto the socket. The returned receiver fires with
/// the error if a write fails.
fn spawn_writer(
    conn: Arc<TcpConnection>,
    mut outbound: OutboxReceiver,
) -> (JoinHandle<()>, oneshot::Receiver<TransportError>) {
    let (failed_tx, failed_rx) = oneshot::channel();
    let conn_id = conn.id();
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = conn.send(&frame).await {
                tracing::debug!(%conn_id, error = %e, "send failed, writer stopping");
                let _ = failed_tx.send(e);
                break;
            }
        }
    });
    (writer, failed_rx)
}

/// Reads and dispatches frames until EOF, a receive error, or the
/// writer stopping. A writer that stops for any reason ends the
/// connection.
async fn read_frames<A, C>(
    conn: &C,
    state: &ServerState<A>,
    router: &Router<A>,
    outbox: &Outbox,
    mut write_failed: oneshot::Receiver<TransportError>,
) -> Result<(), ClanforgeError>
where
    A: Authenticator,
    C: Connection<Error = TransportError>,
{
    let conn_id = conn.id();
    loop {
        let received = tokio::select! {
            received = conn.recv() => received,
            failed = &mut write_failed => match failed {
                Ok(e) => {
                    tracing::info!(%conn_id, error = %e, "write failed, dropping connection");
                    return Err(ClanforgeError::Transport(e));
                }
                Err(_) => {
                    tracing::warn!(%conn_id, "writer task stopped, dropping connection");
                    return Ok(());
                }
            },
        };
        match received {
            Ok(Some(frame)) => router.dispatch(state, conn_id, outbox, &frame).await,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                return Ok(());
            }
            Err(e) => {
                tracing::info!(%conn_id, error = %e, "connection lost");
                return Err(ClanforgeError::Transport(e));
            }
        }
    }
}

/// Removes every trace of `conn` from the subsystems.
///
/// Order: matchmaking queue, registry, then arena and war cleanup. The
/// last two only run when the registry removed the player's live
/// binding; a connection superseded by a newer login leaves the player
/// online and their battles untouched.
pub(crate) async fn teardown<A: Authenticator>(state: &ServerState<A>, conn: ConnectionId) {
    state.matchmaker.remove(conn).await;
    let Some(context) = state.registry.unregister(conn).await else {
        tracing::debug!(%conn, "no live player on connection, nothing to clean up");
        return;
    };
    let player_id = context.player_id;
    let (ended_battle, dropped_attacks) = release_player(state, &player_id).await;
    tracing::info!(%conn, %player_id, ended_battle, dropped_attacks, "player disconnected");
}

/// Ends the arena battle and drops the war attacks of a player who just
/// went offline. Returns whether a battle ended and how many attacks
/// were dropped.
pub(crate) async fn release_player<A: Authenticator>(
    state: &ServerState<A>,
    player_id: &PlayerId,
) -> (bool, usize) {
    let ended_battle = state.arena.cleanup_player(player_id).await;
    let dropped_attacks = state.war.cleanup_player(player_id).await;
    (ended_battle, dropped_attacks)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clanforge_matchmaking::MatchQueueEntry;
    use clanforge_protocol::MessageType;
    use clanforge_session::{LoginAuthenticator, PlayerContext};
    use clanforge_transport::Frame;

    use super::*;
    use crate::ServerConfig;

    fn state() -> ServerState<LoginAuthenticator> {
        ServerState::new(LoginAuthenticator, &ServerConfig::default()).unwrap()
    }

    async fn login(state: &ServerState<LoginAuthenticator>, conn: u64, player: &str) {
        let conn = ConnectionId::new(conn);
        let (outbox, _rx) = Outbox::channel(conn);
        state
            .registry
            .register(PlayerContext::new(conn, PlayerId::new(player), player, 1000), outbox)
            .await;
    }

    #[tokio::test]
    async fn test_teardown_clears_queue_and_registry() {
        let state = state();
        login(&state, 1, "alice").await;
        state
            .matchmaker
            .enqueue(MatchQueueEntry::new(ConnectionId::new(1), PlayerId::new("alice"), 1000))
            .await;

        teardown(&state, ConnectionId::new(1)).await;

        assert!(state.matchmaker.is_empty().await);
        assert!(!state.registry.is_online(&PlayerId::new("alice")).await);
    }

    #[tokio::test]
    async fn test_teardown_superseded_connection_keeps_player_online() {
        let state = state();
        login(&state, 1, "alice").await;
        login(&state, 2, "alice").await;

        teardown(&state, ConnectionId::new(1)).await;

        assert!(state.registry.is_online(&PlayerId::new("alice")).await);
        let handle = state.registry.get_by_id(&PlayerId::new("alice")).await.unwrap();
        assert_eq!(handle.context.conn, ConnectionId::new(2));
    }

    /// Yields the queued frames, then blocks forever like a peer that
    /// stopped reading but never closed its socket.
    struct StalledPeer {
        id: ConnectionId,
        inbound: std::sync::Mutex<Vec<Frame>>,
    }

    impl Connection for StalledPeer {
        type Error = TransportError;

        async fn send(&self, _frame: &Frame) -> Result<(), Self::Error> {
            Err(TransportError::SendFailed(std::io::ErrorKind::BrokenPipe.into()))
        }

        async fn recv(&self) -> Result<Option<Frame>, Self::Error> {
            let next = self.inbound.lock().unwrap().pop();
            match next {
                Some(frame) => Ok(Some(frame)),
                None => std::future::pending().await,
            }
        }

        async fn close(&self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn id(&self) -> ConnectionId {
            self.id
        }
    }

    #[tokio::test]
    async fn test_read_frames_stops_when_writer_fails() {
        let state = state();
        let router = Router::<LoginAuthenticator>::standard();
        let login = Frame::new(MessageType::Login.id(), br#"{"playerId":"alice","trophies":1000}"#.to_vec());
        let peer = StalledPeer {
            id: ConnectionId::new(7),
            inbound: std::sync::Mutex::new(vec![login]),
        };
        let (outbox, mut outbound) = Outbox::channel(peer.id);
        let (failed_tx, failed_rx) = oneshot::channel();

        let reader = read_frames(&peer, &state, &router, &outbox, failed_rx);
        let writer = async {
            let frame = outbound.recv().await.unwrap();
            let _ = failed_tx.send(peer.send(&frame).await.unwrap_err());
        };
        let (result, ()) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(reader, writer)
        })
        .await
        .unwrap();

        assert!(matches!(
            result,
            Err(ClanforgeError::Transport(TransportError::SendFailed(_)))
        ));

        // The same teardown a socket close would run.
        teardown(&state, peer.id).await;
        assert!(!state.registry.is_online(&PlayerId::new("alice")).await);
    }

    #[tokio::test]
    async fn test_teardown_twice_is_harmless() {
        let state = state();
        login(&state, 1, "alice").await;

        teardown(&state, ConnectionId::new(1)).await;
        teardown(&state, ConnectionId::new(1)).await;

        assert!(state.registry.is_empty().await);
    }
}
