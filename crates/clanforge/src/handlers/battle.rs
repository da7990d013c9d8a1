//! Trophy matchmaking and direct (asynchronous) attacks.

use clanforge_matchmaking::MatchQueueEntry;
use clanforge_protocol::{
    AttackResult, AttackStartReply, ErrorCode, MatchFound, MessageType, TargetRequest,
};
use clanforge_session::Authenticator;
use clanforge_transport::Frame;
use tokio::time::Instant;

use super::{decode, sender};
use crate::router::Request;
use crate::state::ServerState;

/// Queues the sender for a match and runs a pass right away.
pub(crate) async fn find_match<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    let entry = state
        .registry
        .update(req.conn, |c| {
            c.is_searching_match = true;
            c.match_started_at = Some(Instant::now());
            MatchQueueEntry::new(c.conn, c.player_id.clone(), c.trophies)
        })
        .await;
    let entry = match entry {
        Ok(entry) => entry,
        Err(e) => {
            tracing::debug!(conn = %req.conn, error = %e, "find match before login");
            return;
        }
    };

    let player_id = entry.player_id.clone();
    if state.matchmaker.enqueue(entry).await {
        tracing::info!(%player_id, "searching for a match");
    }
    run_match_pass(state).await;
}

pub(crate) async fn cancel_match<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    if state.matchmaker.remove(req.conn).await {
        tracing::info!(conn = %req.conn, "match search cancelled");
    }
    let _ = state
        .registry
        .update(req.conn, |c| {
            c.is_searching_match = false;
            c.match_started_at = None;
        })
        .await;
}

/// Runs one matchmaking pass and tells both sides of every pair who
/// they drew.
pub(crate) async fn run_match_pass<A: Authenticator>(state: &ServerState<A>) {
    for (first, second) in state.matchmaker.process_queue().await {
        tracing::info!(
            player1 = %first.player_id,
            player2 = %second.player_id,
            trophies1 = first.trophies,
            trophies2 = second.trophies,
            "match found"
        );
        notify_match(state, &first, &second).await;
        notify_match(state, &second, &first).await;
    }
}

async fn notify_match<A: Authenticator>(
    state: &ServerState<A>,
    player: &MatchQueueEntry,
    opponent: &MatchQueueEntry,
) {
    let cleared = state
        .registry
        .update(player.conn, |c| {
            c.is_searching_match = false;
            c.match_started_at = None;
        })
        .await;
    if cleared.is_err() {
        tracing::debug!(player_id = %player.player_id, "matched player went offline");
        return;
    }
    let Ok(handle) = state.registry.get_by_connection(player.conn).await else {
        return;
    };

    let profile = state.registry.profile(&opponent.player_id).await;
    handle.outbox.send(
        MessageType::MatchFound,
        &MatchFound {
            opponent_id: opponent.player_id.clone(),
            opponent_trophies: opponent.trophies,
            opponent_name: profile.name,
            map_data: profile.map_data,
        },
    );
}

/// Starts an attack on a player's saved layout. The target need not be
/// online.
pub(crate) async fn attack_start<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    let reply = match start_attack(state, &req).await {
        Ok(reply) => reply,
        Err(code) => AttackStartReply::fail(code),
    };
    req.outbox.send(MessageType::AttackStart, &reply);
}

async fn start_attack<A: Authenticator>(
    state: &ServerState<A>,
    req: &Request<'_>,
) -> Result<AttackStartReply, ErrorCode> {
    let attacker = sender(state, req).await?;
    let body: TargetRequest = decode(req)?;
    let profile = state.registry.profile(&body.target_id).await;
    if profile.map_data.is_empty() {
        return Err(ErrorCode::NoMap);
    }
    tracing::info!(attacker_id = %attacker.context.player_id, target_id = %body.target_id, "attack started");
    Ok(AttackStartReply::ok(body.target_id, profile.map_data))
}

/// Applies the loot and trophy change of a finished attack.
///
/// The attacker is the sender, whatever the body claims. An online
/// defender loses what the attacker gained and receives the result
/// verbatim.
pub(crate) async fn attack_result<A: Authenticator>(state: &ServerState<A>, req: Request<'_>) {
    let Ok(attacker) = sender(state, &req).await else {
        return;
    };
    let Ok(result) = decode::<AttackResult>(&req) else {
        return;
    };
    let attacker_id = attacker.context.player_id;

    let _ = state
        .registry
        .update(req.conn, |c| {
            c.gold = c.gold.saturating_add(result.gold_looted);
            c.elixir = c.elixir.saturating_add(result.elixir_looted);
            c.trophies = c.trophies.saturating_add_signed(result.trophy_change);
        })
        .await;

    let defender_online = state
        .registry
        .update_by_id(&result.defender_id, |c| {
            c.gold = c.gold.saturating_sub(result.gold_looted);
            c.elixir = c.elixir.saturating_sub(result.elixir_looted);
            c.trophies = c.trophies.saturating_add_signed(result.trophy_change.saturating_neg());
        })
        .await
        .is_ok();
    if defender_online {
        if let Some(outbox) = state.registry.outbox_of(&result.defender_id).await {
            outbox.send_frame(Frame::new(MessageType::AttackResult.into(), req.body.to_vec()));
        }
    }

    tracing::info!(
        %attacker_id,
        defender_id = %result.defender_id,
        stars = result.stars_earned,
        gold = result.gold_looted,
        elixir = result.elixir_looted,
        trophy_change = result.trophy_change,
        defender_online,
        "attack result applied"
    );
}
