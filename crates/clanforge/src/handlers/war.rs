//! Clan war requests. The legacy ids 32/33 share handlers with 51/52
//! and reply on whichever id the client used.

use clanforge_protocol::{
    ErrorCode, ErrorReply, SpectateJoin, WarAttackEnd, WarAttackReply, WarIdRequest,
    WarMemberList, WarSearchReply, WarSearchStatus, WarState, WarTargetRequest,
};
use clanforge_session::Authenticator;

use super::{decode, sender};
use crate::router::Request;
use crate::state::ServerState;

/// Puts the sender's clan in the war queue.
pub(crate) async fn search<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    let Ok(player) = sender(state, &req).await else {
        return;
    };
    let Some(clan_id) = state.hall.clan_of(&player.context.player_id).await else {
        req.outbox.send(req.kind, &WarSearchReply { status: WarSearchStatus::NoClan });
        return;
    };
    req.outbox.send(req.kind, &WarSearchReply { status: WarSearchStatus::Searching });
    if let Some(war_id) = state.war.add_to_queue(&clan_id).await {
        tracing::debug!(%war_id, %clan_id, "war search completed a pairing");
    }
}

pub(crate) async fn attack_start<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    let reply = match decode::<WarTargetRequest>(&req) {
        Ok(body) => match state.war.attack_start(req.conn, &body.war_id, &body.target_id).await {
            Ok(map_data) => WarAttackReply::Attack {
                target_id: body.target_id,
                map_data,
            },
            Err(e) => {
                tracing::debug!(conn = %req.conn, war_id = %body.war_id, error = %e, "war attack refused");
                WarAttackReply::Fail { reason: e.code() }
            }
        },
        Err(code) => WarAttackReply::Fail { reason: code },
    };
    req.outbox.send(req.kind, &reply);
}

/// Records a finished war attack. The state update goes out as a
/// broadcast, so there is no direct reply.
pub(crate) async fn attack_end<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    let Ok(body) = decode::<WarAttackEnd>(&req) else {
        return;
    };
    let destruction_rate = body.destruction_rate.clamp(0.0, 100.0);
    if let Err(e) = state
        .war
        .attack_end(req.conn, &body.war_id, body.stars_earned, destruction_rate)
        .await
    {
        tracing::debug!(conn = %req.conn, war_id = %body.war_id, error = %e, "war attack end ignored");
    }
}

/// Totals of the war the sender's clan is fighting.
pub(crate) async fn status<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    match clan_war_state(state, &req).await {
        Ok(war_state) => req.outbox.send(req.kind, &war_state),
        Err(error) => req.outbox.send(req.kind, &ErrorReply { error }),
    };
}

async fn clan_war_state<A: Authenticator>(
    state: &ServerState<A>,
    req: &Request<'_>,
) -> Result<WarState, ErrorCode> {
    let player = sender(state, req).await?;
    let clan_id = state
        .hall
        .clan_of(&player.context.player_id)
        .await
        .ok_or(ErrorCode::NoClan)?;
    state
        .war
        .status_for_clan(&clan_id)
        .await
        .ok_or(ErrorCode::WarNotFound)
}

pub(crate) async fn member_list<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    match enemy_roster(state, &req).await {
        Ok(list) => req.outbox.send(req.kind, &list),
        Err(error) => req.outbox.send(req.kind, &ErrorReply { error }),
    };
}

async fn enemy_roster<A: Authenticator>(
    state: &ServerState<A>,
    req: &Request<'_>,
) -> Result<WarMemberList, ErrorCode> {
    let player = sender(state, req).await?;
    let body: WarIdRequest = decode(req)?;
    state
        .war
        .member_list(&body.war_id, &player.context.player_id)
        .await
        .map_err(|e| e.code())
}

pub(crate) async fn spectate<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    let reply = match decode::<WarTargetRequest>(&req) {
        Ok(body) => state
            .war
            .spectate(req.conn, &body.war_id, &body.target_id)
            .await
            .unwrap_or_else(|e| {
                tracing::debug!(conn = %req.conn, error = %e, "war spectate unavailable");
                SpectateJoin::Unavailable
            }),
        Err(_) => SpectateJoin::Unavailable,
    };
    req.outbox.send(req.kind, &reply);
}
