//! Unified error type for the Clanforge server.

use std::path::PathBuf;

use clanforge_clan::ClanError;
use clanforge_protocol::ProtocolError;
use clanforge_session::SessionError;
use clanforge_transport::TransportError;

/// Top-level error that wraps the infrastructure errors of every layer.
///
/// Domain failures (a full clan, a target offline) never reach this
/// type: handlers answer them with a typed reply and the connection
/// stays open. What lands here ends a connection or stops the server.
#[derive(Debug, thiserror::Error)]
pub enum ClanforgeError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, unknown message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The clan directory could not be opened.
    #[error(transparent)]
    Clan(#[from] ClanError),

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let clanforge_err: ClanforgeError = err.into();
        assert!(matches!(clanforge_err, ClanforgeError::Transport(_)));
        assert!(clanforge_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let clanforge_err: ClanforgeError = err.into();
        assert!(matches!(clanforge_err, ClanforgeError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::AuthFailed("nope".into());
        let clanforge_err: ClanforgeError = err.into();
        assert!(matches!(clanforge_err, ClanforgeError::Session(_)));
    }

    #[test]
    fn test_from_clan_error() {
        let err = ClanError::ClanNotFound(clanforge_protocol::ClanId::new("CLAN_1"));
        let clanforge_err: ClanforgeError = err.into();
        assert!(matches!(clanforge_err, ClanforgeError::Clan(_)));
    }
}
