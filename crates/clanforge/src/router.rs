//! Message-type dispatch.
//!
//! The [`Router`] maps each client-bound [`MessageType`] to an async
//! handler. A frame whose type id is unknown, or whose type has no
//! handler (server pushes echoed back by a client), is logged and
//! dropped; the connection stays open so newer clients keep working.

use std::collections::HashMap;

use clanforge_protocol::MessageType;
use clanforge_session::{Authenticator, Outbox};
use clanforge_transport::{ConnectionId, Frame};
use futures_util::future::BoxFuture;

use crate::handlers;
use crate::state::ServerState;

/// One inbound frame, as seen by a handler.
#[derive(Clone, Copy)]
pub(crate) struct Request<'a> {
    pub(crate) conn: ConnectionId,
    /// The sender's own outbound queue.
    pub(crate) outbox: &'a Outbox,
    pub(crate) kind: MessageType,
    pub(crate) body: &'a [u8],
}

pub(crate) type Handler<A> = for<'a> fn(&'a ServerState<A>, Request<'a>) -> BoxFuture<'a, ()>;

pub(crate) struct Router<A: Authenticator> {
    handlers: HashMap<MessageType, Handler<A>>,
}

impl<A: Authenticator> Router<A> {
    /// An empty table.
    pub(crate) fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Every message type a client may send.
    pub(crate) fn standard() -> Self {
        use MessageType as M;

        Self::new()
            // Account and layout
            .on(M::Login, |s, r| Box::pin(handlers::account::login(s, r)))
            .on(M::UploadMap, |s, r| Box::pin(handlers::account::upload_map(s, r)))
            .on(M::QueryMap, |s, r| Box::pin(handlers::account::query_map(s, r)))
            .on(M::UserListRequest, |s, r| Box::pin(handlers::account::user_list(s, r)))
            .on(M::AttackData, |s, r| Box::pin(handlers::account::log_only(s, r)))
            .on(M::BattleReplay, |s, r| Box::pin(handlers::account::log_only(s, r)))
            .on(M::BattleStatusUpdate, |s, r| Box::pin(handlers::account::log_only(s, r)))
            // Matchmaking and direct attacks
            .on(M::FindMatch, |s, r| Box::pin(handlers::battle::find_match(s, r)))
            .on(M::CancelMatch, |s, r| Box::pin(handlers::battle::cancel_match(s, r)))
            .on(M::AttackStart, |s, r| Box::pin(handlers::battle::attack_start(s, r)))
            .on(M::AttackResult, |s, r| Box::pin(handlers::battle::attack_result(s, r)))
            // Clans
            .on(M::CreateClan, |s, r| Box::pin(handlers::clan::create(s, r)))
            .on(M::JoinClan, |s, r| Box::pin(handlers::clan::join(s, r)))
            .on(M::LeaveClan, |s, r| Box::pin(handlers::clan::leave(s, r)))
            .on(M::ClanList, |s, r| Box::pin(handlers::clan::list(s, r)))
            .on(M::ClanMembers, |s, r| Box::pin(handlers::clan::members(s, r)))
            .on(M::ClanInfo, |s, r| Box::pin(handlers::clan::info(s, r)))
            // Clan wars, legacy ids alongside the current ones
            .on(M::ClanWarSearch, |s, r| Box::pin(handlers::war::search(s, r)))
            .on(M::ClanWarAttack, |s, r| Box::pin(handlers::war::attack_start(s, r)))
            .on(M::ClanWarAttackStart, |s, r| Box::pin(handlers::war::attack_start(s, r)))
            .on(M::ClanWarResult, |s, r| Box::pin(handlers::war::attack_end(s, r)))
            .on(M::ClanWarAttackEnd, |s, r| Box::pin(handlers::war::attack_end(s, r)))
            .on(M::ClanWarStatus, |s, r| Box::pin(handlers::war::status(s, r)))
            .on(M::ClanWarMemberList, |s, r| Box::pin(handlers::war::member_list(s, r)))
            .on(M::ClanWarSpectate, |s, r| Box::pin(handlers::war::spectate(s, r)))
            // 1v1 arena
            .on(M::PvpRequest, |s, r| Box::pin(handlers::arena::request(s, r)))
            .on(M::PvpAction, |s, r| Box::pin(handlers::arena::action(s, r)))
            .on(M::PvpEnd, |s, r| Box::pin(handlers::arena::end(s, r)))
            .on(M::SpectateRequest, |s, r| Box::pin(handlers::arena::spectate(s, r)))
            .on(M::BattleStatusList, |s, r| Box::pin(handlers::arena::status(s, r)))
    }

    /// Registers `handler` for `kind`, replacing any previous one.
    pub(crate) fn on(mut self, kind: MessageType, handler: Handler<A>) -> Self {
        self.handlers.insert(kind, handler);
        self
    }

    pub(crate) fn handles(&self, kind: MessageType) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Runs the handler for `frame`, or logs and drops it.
    pub(crate) async fn dispatch(
        &self,
        state: &ServerState<A>,
        conn: ConnectionId,
        outbox: &Outbox,
        frame: &Frame,
    ) {
        let kind = match MessageType::try_from(frame.kind) {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!(%conn, error = %e, len = frame.body.len(), "ignoring frame");
                return;
            }
        };
        let Some(handler) = self.handlers.get(&kind) else {
            tracing::warn!(%conn, %kind, "no handler for message type, ignoring");
            return;
        };
        tracing::debug!(%conn, %kind, len = frame.body.len(), "dispatching");
        handler(
            state,
            Request {
                conn,
                outbox,
                kind,
                body: &frame.body,
            },
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use clanforge_protocol::ErrorReply;
    use clanforge_session::LoginAuthenticator;

    use super::*;
    use crate::ServerConfig;

    fn state() -> ServerState<LoginAuthenticator> {
        ServerState::new(LoginAuthenticator, &ServerConfig::default()).unwrap()
    }

    async fn echo_kind(_state: &ServerState<LoginAuthenticator>, req: Request<'_>) {
        req.outbox.send(
            req.kind,
            &ErrorReply {
                error: clanforge_protocol::ErrorCode::MalformedBody,
            },
        );
    }

    #[test]
    fn test_standard_covers_client_messages_only() {
        let router = Router::<LoginAuthenticator>::standard();
        for kind in [
            MessageType::Login,
            MessageType::UserListRequest,
            MessageType::ClanWarAttack,
            MessageType::ClanWarAttackEnd,
            MessageType::SpectateRequest,
            MessageType::BattleStatusList,
        ] {
            assert!(router.handles(kind), "{kind} should be routed");
        }
        for kind in [
            MessageType::UserListResponse,
            MessageType::MatchFound,
            MessageType::ClanWarMatch,
            MessageType::ClanWarEnd,
            MessageType::PvpStart,
            MessageType::SpectateJoin,
            MessageType::ClanWarStateUpdate,
        ] {
            assert!(!router.handles(kind), "{kind} is server-to-client");
        }
    }

    #[tokio::test]
    async fn test_dispatch_runs_registered_handler() {
        let state = state();
        let router = Router::<LoginAuthenticator>::new().on(MessageType::ClanList, |s, r| Box::pin(echo_kind(s, r)));
        let (outbox, mut rx) = Outbox::channel(ConnectionId::new(1));

        let frame = Frame::new(MessageType::ClanList.into(), b"{}".to_vec());
        router.dispatch(&state, ConnectionId::new(1), &outbox, &frame).await;

        let reply = rx.try_recv().unwrap();
        assert_eq!(reply.kind, u32::from(MessageType::ClanList));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_type_is_ignored() {
        let state = state();
        let router = Router::<LoginAuthenticator>::standard();
        let (outbox, mut rx) = Outbox::channel(ConnectionId::new(1));

        let frame = Frame::new(9999, b"{}".to_vec());
        router.dispatch(&state, ConnectionId::new(1), &outbox, &frame).await;
        let frame = Frame::new(MessageType::PvpStart.into(), b"{}".to_vec());
        router.dispatch(&state, ConnectionId::new(1), &outbox, &frame).await;

        assert!(rx.try_recv().is_err());
    }
}
