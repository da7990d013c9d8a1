//! Codec trait and implementations for message bodies.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The frame header is fixed by the transport; the body encoding is a
//! strategy behind the [`Codec`] trait. Every body on the wire today is
//! JSON, so [`JsonCodec`] is the only implementation.

use clanforge_transport::Frame;
use serde::{Serialize, de::DeserializeOwned};

use crate::{MessageType, ProtocolError};

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` lets a codec live inside long-running tasks
/// that Tokio may move between threads.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Encodes `value` as the body of a frame of the given type.
    fn frame<T: Serialize>(&self, kind: MessageType, value: &T) -> Result<Frame, ProtocolError> {
        Ok(Frame::new(kind.into(), self.encode(value)?))
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use clanforge_protocol::{Codec, JsonCodec, MessageType, PlayerId, TargetRequest};
///
/// let codec = JsonCodec;
/// let request = TargetRequest { target_id: PlayerId::new("p2") };
///
/// let frame = codec.frame(MessageType::PvpRequest, &request).unwrap();
/// assert_eq!(frame.kind, 40);
///
/// let decoded: TargetRequest = codec.decode(&frame.body).unwrap();
/// assert_eq!(decoded, request);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ErrorCode, JoinClanRequest, LoginRequest, PvpStart, SpectateJoin};

    #[test]
    fn test_login_request_optional_fields_default() {
        let req: LoginRequest = JsonCodec
            .decode(br#"{"playerId":"p1","playerName":"Alice","trophies":1200}"#)
            .unwrap();
        assert_eq!(req.player_id.as_str(), "p1");
        assert_eq!(req.trophies, 1200);
        assert!(req.clan_id.is_none());
        assert!(req.gold.is_none());
    }

    #[test]
    fn test_decode_missing_required_field_fails() {
        let result: Result<JoinClanRequest, _> = JsonCodec.decode(b"{}");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result: Result<LoginRequest, _> = JsonCodec.decode(b"p1|Alice|1200");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_pvp_start_attack_is_tagged_by_result() {
        let start = PvpStart::Attack {
            target_id: crate::PlayerId::new("p2"),
            map_data: "layout".into(),
        };
        let json: serde_json::Value =
            serde_json::from_slice(&JsonCodec.encode(&start).unwrap()).unwrap();
        assert_eq!(json["result"], "ATTACK");
        assert_eq!(json["targetId"], "p2");
        assert_eq!(json["mapData"], "layout");
    }

    #[test]
    fn test_pvp_start_fail_carries_screaming_reason() {
        let start = PvpStart::Fail {
            reason: ErrorCode::AlreadyInBattle,
        };
        let json: serde_json::Value =
            serde_json::from_slice(&JsonCodec.encode(&start).unwrap()).unwrap();
        assert_eq!(json["result"], "FAIL");
        assert_eq!(json["reason"], "ALREADY_IN_BATTLE");
    }

    #[test]
    fn test_spectate_unavailable_has_no_partial_fields() {
        let json: serde_json::Value =
            serde_json::from_slice(&JsonCodec.encode(&SpectateJoin::Unavailable).unwrap())
                .unwrap();
        assert_eq!(json, serde_json::json!({ "status": "UNAVAILABLE" }));
    }

    #[test]
    fn test_frame_sets_kind_from_message_type() {
        let frame = JsonCodec
            .frame(MessageType::BattleStatusList, &serde_json::json!({}))
            .unwrap();
        assert_eq!(frame.kind, 60);
        assert_eq!(frame.body, b"{}".to_vec());
    }
}
