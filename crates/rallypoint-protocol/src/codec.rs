//! Codec trait and implementations for serializing lobby snapshots.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! Rallypoint never owns a wire format of its own (the hosted services
//! do), so the codec's job is narrower: render snapshots for logs and
//! debugging tools, and read them back in tests and fixtures.
//!
//! Currently we provide [`JsonCodec`]. Swapping in a binary codec later
//! doesn't require touching any other crate.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` so a codec can be stored in long-lived
/// async tasks and shared across Tokio worker threads.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Encodes a value into a human-readable string for log output.
    ///
    /// Binary codecs fall back to a lossy UTF-8 rendering.
    fn render<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        let bytes = self.encode(value)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use rallypoint_protocol::{Codec, JsonCodec, Visibility, DataObject};
///
/// let codec = JsonCodec;
/// let data = DataObject::new(Visibility::Public, "0.1");
///
/// let bytes = codec.encode(&data).unwrap();
/// let decoded: DataObject = codec.decode(&bytes).unwrap();
/// assert_eq!(data, decoded);
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

    fn render<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{Lobby, LobbyId, PlayerId};

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let result: Result<Lobby, _> = JsonCodec.decode(b"{not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_render_lobby_contains_name_and_host() {
        let lobby = Lobby {
            id: LobbyId::from("lobby-1"),
            name: "Test".into(),
            host_id: PlayerId::from("alice"),
            max_players: 4,
            is_private: false,
            data: Default::default(),
            players: Vec::new(),
            created_at: 1,
            revision: 0,
        };
        let text = JsonCodec.render(&lobby).unwrap();
        assert!(text.contains("\"name\":\"Test\""));
        assert!(text.contains("\"host_id\":\"alice\""));
    }
}
