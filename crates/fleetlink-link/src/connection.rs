//! Message-level view of one controller connection.

use std::sync::atomic::{AtomicBool, Ordering};

use fleetlink_protocol::{Codec, Message, MsgPackCodec, ProtocolError};
use fleetlink_transport::{Connection, ConnectionId, FramedConnection};

use crate::LinkError;

/// One live connection to the controller, speaking whole [`Message`]s.
///
/// Reads are meant for a single task (the supervisor's read loop). Writes
/// may come from anywhere; the underlying [`FramedConnection`] serializes
/// them so frames never interleave.
///
/// A malformed inbound frame poisons the connection. A frame with an
/// unknown variant does not: it was consumed whole and the next frame is
/// still aligned.
pub struct ControllerConnection {
    inner: FramedConnection,
    codec: MsgPackCodec,
    poisoned: AtomicBool,
}

impl ControllerConnection {
    /// Wraps an open framed connection.
    pub fn new(inner: FramedConnection) -> Self {
        Self {
            inner,
            codec: MsgPackCodec,
            poisoned: AtomicBool::new(false),
        }
    }

    /// Returns the unique identifier of the underlying connection.
    pub fn id(&self) -> ConnectionId {
        self.inner.id()
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Blocks until the next message arrives.
    ///
    /// # Errors
    /// - [`LinkError::Closed`] if the controller closed the stream (or the
    ///   connection was closed locally).
    /// - [`LinkError::Transport`] for short reads and I/O failures.
    /// - [`LinkError::Protocol`] if the payload does not decode.
    pub async fn read(&self) -> Result<Message, LinkError> {
        if self.poisoned.load(Ordering::Acquire) {
            return Err(LinkError::Poisoned(self.id()));
        }

        let frame = self
            .inner
            .recv()
            .await?
            .ok_or(LinkError::Closed(self.id()))?;

        match self.codec.decode_message(&frame) {
            Ok(message) => {
                tracing::debug!(id = %self.id(), tag = message.tag(), "received message");
                Ok(message)
            }
            Err(e @ ProtocolError::UnknownVariant(_)) => Err(e.into()),
            Err(e) => {
                self.poisoned.store(true, Ordering::Release);
                Err(e.into())
            }
        }
    }

    /// Encodes and writes one message as a single frame.
    ///
    /// # Errors
    /// Returns [`LinkError::Transport`] if the write fails; the connection is
    /// unusable afterwards.
    pub async fn write(&self, message: impl Into<Message>) -> Result<(), LinkError> {
        if self.poisoned.load(Ordering::Acquire) {
            return Err(LinkError::Poisoned(self.id()));
        }

        let message = message.into();
        let bytes = self.codec.encode_message(&message)?;
        tracing::debug!(id = %self.id(), tag = message.tag(), "writing message");
        self.inner.send(&bytes).await?;
        Ok(())
    }

    /// Closes the connection. Idempotent; also wakes a blocked [`read`](Self::read).
    pub async fn close(&self) {
        self.inner.close().await;
    }
}
