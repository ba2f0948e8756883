//! Codec trait and the MessagePack implementation.
//!
//! A codec turns payload bytes into values and back. The framing around
//! those bytes lives in `fleetlink-transport`; this module only ever sees a
//! complete payload.

use std::collections::HashMap;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;

use crate::{Message, ProtocolError};

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `encode`/`decode` are generic over any serde type. On top of them the
/// trait provides [`encode_message`](Codec::encode_message) and
/// [`decode_message`](Codec::decode_message), which add the
/// single-variant envelope checks every frame goes through.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Malformed` if the bytes do not describe a `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Encodes one [`Message`].
    fn encode_message(&self, message: &Message) -> Result<Vec<u8>, ProtocolError> {
        self.encode(message)
    }

    /// Decodes one [`Message`].
    ///
    /// The payload is checked in two passes. First it must be a map with
    /// exactly one string key; then that key must name a known variant.
    /// Only after both checks is the record itself decoded, so a future
    /// variant this build does not know is reported as
    /// [`ProtocolError::UnknownVariant`] rather than as garbage.
    ///
    /// Unknown fields inside a known variant's record are ignored.
    ///
    /// # Errors
    /// - [`ProtocolError::Malformed`] if the payload is not a single-key map,
    ///   or the record is missing a field or has one of the wrong type.
    /// - [`ProtocolError::UnknownVariant`] if the key is not a known tag.
    fn decode_message(&self, data: &[u8]) -> Result<Message, ProtocolError> {
        let envelope: HashMap<String, IgnoredAny> = self.decode(data)?;
        if envelope.len() != 1 {
            return Err(ProtocolError::Malformed(format!(
                "expected a map with exactly one variant key, found {} keys",
                envelope.len()
            )));
        }

        let Some(tag) = envelope.into_keys().next() else {
            return Err(ProtocolError::Malformed("empty envelope".into()));
        };
        if !Message::TAGS.contains(&tag.as_str()) {
            return Err(ProtocolError::UnknownVariant(tag));
        }

        self.decode(data)
    }
}

// ---------------------------------------------------------------------------
// MsgPackCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses MessagePack (via `rmp-serde`).
///
/// Structs are written as maps keyed by field name, never as positional
/// arrays. That is what lets older and newer peers ignore each other's
/// extra fields.
///
/// ## Example
///
/// ```rust
/// use fleetlink_protocol::{Codec, Message, MsgPackCodec, Ping};
///
/// let codec = MsgPackCodec;
/// let bytes = codec.encode_message(&Message::Ping(Ping { timer: 7 })).unwrap();
/// let decoded = codec.decode_message(&bytes).unwrap();
/// assert_eq!(decoded, Message::Ping(Ping { timer: 7 }));
/// ```
#[cfg(feature = "msgpack")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

#[cfg(feature = "msgpack")]
impl Codec for MsgPackCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        rmp_serde::from_slice(data).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }
}
