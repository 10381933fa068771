//! Codec trait and the JSON implementation.
//!
//! The gateway never calls `serde_json` directly; it goes through a
//! [`Codec`] so the frame format stays swappable.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values into text frames and decodes received frames.
///
/// Encoding produces a `String` because every push event goes out as a
/// WebSocket text frame. Decoding accepts raw bytes since a client may
/// send either text or binary frames.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a received frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or do not
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use quizroom_protocol::{ClientEvent, Codec, JsonCodec, RoomCode};
///
/// let codec = JsonCodec;
/// let event: ClientEvent = codec
///     .decode(br#"{"event":"startGame","data":{"roomId":"ab12cd"}}"#)
///     .unwrap();
/// assert_eq!(
///     event,
///     ClientEvent::StartGame { room_id: RoomCode::new("AB12CD") }
/// );
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientEvent, ServerEvent};

    #[test]
    fn test_json_codec_encode_produces_tagged_text() {
        let text = JsonCodec.encode(&ServerEvent::GameStarted).unwrap();
        assert_eq!(text, r#"{"event":"gameStarted"}"#);
    }

    #[test]
    fn test_json_codec_decode_garbage_returns_decode_error() {
        let result: Result<ClientEvent, _> = JsonCodec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_decode_unknown_event_returns_decode_error() {
        let result: Result<ClientEvent, _> =
            JsonCodec.decode(br#"{"event":"launchMissiles","data":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_json_codec_decode_missing_field_returns_decode_error() {
        // submitAnswer without answerIndex is a protocol violation.
        let result: Result<ClientEvent, _> = JsonCodec.decode(
            br#"{"event":"submitAnswer","data":{"roomId":"X","timeRemaining":3}}"#,
        );
        assert!(result.is_err());
    }
}
