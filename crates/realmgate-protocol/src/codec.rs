//! Codec trait and implementations for serializing/deserializing values.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The reference transport uses one to frame packets, and the token
//! cache uses one both to persist entries and to turn structured cache
//! keys into bytes before hashing them.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because codecs are stored inside long-lived
/// async tasks (the transport's connection task, the file cache).
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize + ?Sized>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Struct fields are written in declaration order, so encoding the same
/// value twice always yields the same bytes. [`structured_digest`]
/// depends on that.
///
/// ## Example
///
/// ```rust
/// use realmgate_protocol::{Codec, DisconnectReason, JsonCodec, ServerPacket};
///
/// let codec = JsonCodec;
/// let packet = ServerPacket::Disconnect {
///     reason: DisconnectReason::Timeout,
/// };
///
/// let bytes = codec.encode(&packet).unwrap();
/// let decoded: ServerPacket = codec.decode(&bytes).unwrap();
/// assert_eq!(packet, decoded);
/// ```
///
/// [`structured_digest`]: crate::structured_digest
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{AccountId, ClientPacket, PROTOCOL_VERSION};

    #[test]
    fn test_json_codec_decode_garbage_returns_decode_error() {
        let codec = JsonCodec;
        let result: Result<ClientPacket, _> = codec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_encode_unsized_values() {
        let codec = JsonCodec;
        assert_eq!(codec.encode("realm").unwrap(), b"\"realm\"".to_vec());
        let ports: &[u16] = &[19132, 19133];
        assert_eq!(codec.encode(ports).unwrap(), b"[19132,19133]".to_vec());
    }

    #[test]
    fn test_json_codec_encode_is_deterministic() {
        let codec = JsonCodec;
        let packet = ClientPacket::Login {
            protocol_version: PROTOCOL_VERSION,
            account: AccountId::new("steve@example.com"),
            token: "opaque".into(),
        };
        let a = codec.encode(&packet).unwrap();
        let b = codec.encode(&packet).unwrap();
        assert_eq!(a, b);
    }
}
