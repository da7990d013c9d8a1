//! Clan directory requests.

use clanforge_protocol::{
    ClanId, ClanIdRequest, ClanReply, CreateClanRequest, ErrorCode, ErrorReply, JoinClanRequest,
    MessageType,
};
use clanforge_session::Authenticator;

use super::{decode, sender};
use crate::router::Request;
use crate::state::ServerState;

pub(crate) async fn create<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    let result = create_clan(state, &req).await;
    req.outbox.send(MessageType::CreateClan, &clan_reply(result));
}

async fn create_clan<A: Authenticator>(
    state: &ServerState<A>,
    req: &Request<'_>,
) -> Result<ClanId, ErrorCode> {
    let player = sender(state, req).await?;
    let body: CreateClanRequest = decode(req)?;
    state
        .hall
        .create_clan(&player.context.player_id, &body)
        .await
        .map_err(|e| e.code())
}

pub(crate) async fn join<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    let result = join_clan(state, &req).await;
    req.outbox.send(MessageType::JoinClan, &clan_reply(result));
}

async fn join_clan<A: Authenticator>(
    state: &ServerState<A>,
    req: &Request<'_>,
) -> Result<ClanId, ErrorCode> {
    let player = sender(state, req).await?;
    let body: JoinClanRequest = decode(req)?;
    state
        .hall
        .join_clan(&player.context.player_id, &body.clan_id)
        .await
        .map_err(|e| e.code())?;
    Ok(body.clan_id)
}

/// Replies with the clan that was left.
pub(crate) async fn leave<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    let result = match sender(state, &req).await {
        Ok(player) => state
            .hall
            .leave_clan(&player.context.player_id)
            .await
            .map_err(|e| e.code()),
        Err(code) => Err(code),
    };
    req.outbox.send(MessageType::LeaveClan, &clan_reply(result));
}

fn clan_reply(result: Result<ClanId, ErrorCode>) -> ClanReply {
    match result {
        Ok(clan_id) => ClanReply::ok(clan_id),
        Err(code) => ClanReply::fail(code),
    }
}

pub(crate) async fn list<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    let clans = state.hall.clan_list().await;
    req.outbox.send(MessageType::ClanList, &clans);
}

pub(crate) async fn members<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    let result = match decode::<ClanIdRequest>(&req) {
        Ok(body) => state.hall.clan_members(&body.clan_id).await.map_err(|e| e.code()),
        Err(code) => Err(code),
    };
    match result {
        Ok(members) => req.outbox.send(MessageType::ClanMembers, &members),
        Err(error) => req.outbox.send(MessageType::ClanMembers, &ErrorReply { error }),
    };
}

pub(crate) async fn info<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    let result = match decode::<ClanIdRequest>(&req) {
        Ok(body) => state.hall.clan_info(&body.clan_id).await.map_err(|e| e.code()),
        Err(code) => Err(code),
    };
    match result {
        Ok(info) => req.outbox.send(MessageType::ClanInfo, &info),
        Err(error) => req.outbox.send(MessageType::ClanInfo, &ErrorReply { error }),
    };
}
