//! Live 1v1 battle requests.

use clanforge_protocol::{MessageType, PvpAction, PvpStart, SpectateJoin, TargetRequest};
use clanforge_session::Authenticator;

use super::decode;
use crate::router::Request;
use crate::state::ServerState;

pub(crate) async fn request<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    let result = match decode::<TargetRequest>(&req) {
        Ok(body) => state
            .arena
            .request_battle(req.conn, &body.target_id)
            .await
            .map_err(|e| {
                tracing::debug!(conn = %req.conn, target_id = %body.target_id, error = %e, "pvp request refused");
                e.code()
            }),
        Err(code) => Err(code),
    };
    if let Err(reason) = result {
        req.outbox.send(MessageType::PvpStart, &PvpStart::Fail { reason });
    }
}

/// Relays an attacker's action. The raw body is forwarded so clients
/// see exactly the bytes the attacker sent.
pub(crate) async fn action<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    let Ok(body) = decode::<PvpAction>(&req) else {
        return;
    };
    if let Err(e) = state.arena.relay_action(req.conn, body.action, req.body).await {
        tracing::debug!(conn = %req.conn, error = %e, "pvp action dropped");
    }
}

pub(crate) async fn end<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    if let Err(e) = state.arena.end_battle_for(req.conn).await {
        tracing::debug!(conn = %req.conn, error = %e, "pvp end ignored");
    }
}

pub(crate) async fn spectate<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    let joined = match decode::<TargetRequest>(&req) {
        Ok(body) => match state.arena.spectate(req.conn, &body.target_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(conn = %req.conn, target_id = %body.target_id, error = %e, "spectate unavailable");
                false
            }
        },
        Err(_) => false,
    };
    if !joined {
        req.outbox.send(MessageType::SpectateJoin, &SpectateJoin::Unavailable);
    }
}

pub(crate) async fn status<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    state.arena.send_status(req.outbox).await;
}
