/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Opening a transport to the controller failed.
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The peer closed the stream cleanly between frames.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// The stream ended in the middle of a frame.
    #[error("short read: expected {expected} bytes, stream ended after {read}")]
    ShortRead { expected: usize, read: usize },

    /// A frame announced a length above the configured limit.
    #[error("frame of {len} bytes exceeds limit of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// A previous operation failed; the connection can no longer be used.
    #[error("connection {0} is poisoned by an earlier error")]
    Poisoned(crate::ConnectionId),
}
