//! Error types for the link layer.

use fleetlink_protocol::ProtocolError;
use fleetlink_transport::{ConnectionId, TransportError};

/// Errors that end (or are reported from) one controller connection.
///
/// The supervisor treats every variant except
/// `Protocol(ProtocolError::UnknownVariant(_))` as fatal for the current
/// connection: it fires `on_disconnect` and reconnects.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// A transport-level error (connect, short read, write failure).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (malformed payload, unknown variant).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The controller closed the stream between frames.
    #[error("connection {0} closed by the controller")]
    Closed(ConnectionId),

    /// An earlier malformed frame left the connection unusable.
    #[error("connection {0} is poisoned by an earlier protocol error")]
    Poisoned(ConnectionId),
}

impl LinkError {
    /// Returns `true` for errors after which the same connection can still
    /// be read: the offending frame was consumed whole.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::Protocol(ProtocolError::UnknownVariant(_)))
    }
}
