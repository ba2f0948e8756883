//! Error types for the protocol layer.
//!
//! Each Fleetlink crate defines its own error enum. A `ProtocolError` always
//! means the bytes of a frame were fine at the transport level but their
//! payload could not be turned into (or out of) a [`Message`](crate::Message).

/// Errors that can occur while encoding or decoding messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a message into bytes).
    ///
    /// Not expected for well-formed messages.
    #[cfg(feature = "msgpack")]
    #[error("encode failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// The payload is not a single-key map, a required field is missing,
    /// or a field has the wrong type.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// The payload is a single-key map, but the key names no known variant.
    ///
    /// The frame itself was consumed completely, so a reader may skip it
    /// and carry on with the next one.
    #[error("unknown message variant `{0}`")]
    UnknownVariant(String),
}
