//! One async function per client message.
//!
//! Handlers never fail the connection. Domain errors are answered with a
//! typed reply on the message's reply type (or only logged when the
//! message has none), and a malformed body is `MALFORMED_BODY`.

pub(crate) mod account;
pub(crate) mod arena;
pub(crate) mod battle;
pub(crate) mod clan;
pub(crate) mod war;

use clanforge_protocol::{Codec, ErrorCode, JsonCodec};
use clanforge_session::{Authenticator, PlayerHandle};
use serde::de::DeserializeOwned;

use crate::router::Request;
use crate::state::ServerState;

pub(crate) use battle::run_match_pass;

/// Decodes the request body.
fn decode<T: DeserializeOwned>(req: &Request<'_>) -> Result<T, ErrorCode> {
    JsonCodec.decode(req.body).map_err(|e| {
        tracing::debug!(conn = %req.conn, kind = %req.kind, error = %e, "malformed body");
        ErrorCode::MalformedBody
    })
}

/// The player logged in on the request's connection.
async fn sender<A: Authenticator>(
    state: &ServerState<A>,
    req: &Request<'_>,
) -> Result<PlayerHandle, ErrorCode> {
    state.registry.get_by_connection(req.conn).await.map_err(|e| {
        tracing::debug!(conn = %req.conn, kind = %req.kind, "request before login");
        e.code()
    })
}
