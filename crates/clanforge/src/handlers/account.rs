//! Login, layouts, and the user list.

use clanforge_protocol::{
    LoginReply, LoginRequest, MapReply, MessageType, TargetRequest, UploadMap, UserEntry, UserList,
};
use clanforge_session::{Authenticator, PlayerContext};

use super::decode;
use crate::connection::release_player;
use crate::router::Request;
use crate::state::ServerState;

fn login_failed(message: impl Into<String>) -> LoginReply {
    LoginReply {
        success: false,
        message: message.into(),
        clan_id: None,
    }
}

/// Binds the connection to a player.
///
/// The clan id in the reply comes from the clan directory. A clan id in
/// the body only asks the directory to restore a membership it lost.
pub(crate) async fn login<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    let body: LoginRequest = match decode(&req) {
        Ok(body) => body,
        Err(code) => {
            req.outbox.send(MessageType::Login, &login_failed(code.as_str()));
            return;
        }
    };
    let player_id = match state.auth.authenticate(&body).await {
        Ok(id) => id,
        Err(e) => {
            tracing::info!(conn = %req.conn, error = %e, "login rejected");
            req.outbox.send(MessageType::Login, &login_failed(e.to_string()));
            return;
        }
    };

    let name = if body.player_name.trim().is_empty() {
        player_id.to_string()
    } else {
        body.player_name.clone()
    };
    let mut context = PlayerContext::new(req.conn, player_id.clone(), name, body.trophies);
    if let Some(gold) = body.gold {
        context.gold = gold;
    }
    if let Some(elixir) = body.elixir {
        context.elixir = elixir;
    }
    if let Some(layout) = state.registry.saved_layout(&player_id).await {
        context.map_data = layout;
    }
    let registration = state.registry.register(context, req.outbox.clone()).await;
    if let Some(old_conn) = registration.replaced_conn {
        state.matchmaker.remove(old_conn).await;
    }
    if let Some(previous) = registration.displaced {
        // The socket switched players: the old one is offline now.
        state.matchmaker.remove(req.conn).await;
        let (ended_battle, dropped_attacks) = release_player(state, &previous).await;
        tracing::info!(conn = %req.conn, player_id = %previous, ended_battle, dropped_attacks, "player replaced on connection");
    }

    if let Some(recorded) = &body.clan_id {
        if let Err(e) = state.hall.ensure_player_in_clan(&player_id, recorded).await {
            tracing::warn!(%player_id, clan_id = %recorded, error = %e, "could not restore clan membership");
        }
    }
    let clan_id = state.hall.clan_of(&player_id).await;
    let synced = clan_id.clone();
    // The registry entry may already be gone if the socket raced a relogin.
    let _ = state.registry.update(req.conn, move |c| c.clan_id = synced).await;

    tracing::info!(conn = %req.conn, %player_id, clan_id = ?clan_id, trophies = body.trophies, "player logged in");
    req.outbox.send(
        MessageType::Login,
        &LoginReply {
            success: true,
            message: "Login successful".to_string(),
            clan_id,
        },
    );
    state.arena.send_status(req.outbox).await;
}

pub(crate) async fn upload_map<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    let Ok(body) = decode::<UploadMap>(&req) else {
        return;
    };
    let len = body.map_data.len();
    match state.registry.upload_layout(req.conn, body.map_data).await {
        Ok(player_id) => tracing::info!(%player_id, len, "layout uploaded"),
        Err(e) => tracing::debug!(conn = %req.conn, error = %e, "layout upload rejected"),
    }
}

/// Replies with the target's live or archived layout; empty when the
/// server has never seen one.
pub(crate) async fn query_map<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    let Ok(body) = decode::<TargetRequest>(&req) else {
        return;
    };
    let profile = state.registry.profile(&body.target_id).await;
    req.outbox.send(
        MessageType::QueryMap,
        &MapReply {
            target_id: body.target_id,
            map_data: profile.map_data,
        },
    );
}

pub(crate) async fn user_list<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    let in_battle = state.arena.players_in_battle().await;
    let mut users: Vec<UserEntry> = state
        .registry
        .snapshot()
        .await
        .into_iter()
        .map(|handle| {
            let c = handle.context;
            UserEntry {
                in_battle: in_battle.contains(&c.player_id),
                has_map: c.has_map(),
                id: c.player_id,
                name: c.player_name,
                trophies: c.trophies,
                clan_id: c.clan_id,
            }
        })
        .collect();
    users.sort_by(|a, b| a.id.cmp(&b.id));
    req.outbox.send(MessageType::UserListResponse, &UserList { users });
}

/// Legacy and reserved types: accepted, never answered.
pub(crate) async fn log_only<A: Authenticator>(_state: &ServerState<A>, req: Request<'_>) {
    tracing::debug!(conn = %req.conn, kind = %req.kind, len = req.body.len(), "message accepted without reply");
}
