//! Transport layer for Fleetlink.
//!
//! Everything a satellite exchanges with the controller travels over one TCP
//! stream as a sequence of frames:
//!
//! ```text
//! ┌──────────────────────┬──────────────────────────┐
//! │ length: u32 (BE)     │ payload: `length` bytes  │
//! └──────────────────────┴──────────────────────────┘
//! ```
//!
//! This crate knows nothing about what is inside a payload. It provides:
//!
//! - [`Connector`]: the "socket factory" that opens a fresh stream to the
//!   controller ([`TcpConnector`] is the production implementation).
//! - [`Connection`]: whole-frame send/receive over an open stream
//!   ([`FramedConnection`] is the implementation).
//! - [`read_frame`] / [`write_frame`]: the framing primitives themselves.

mod error;
mod frame;
mod framed;
mod tcp;

pub use error::TransportError;
pub use frame::{read_frame, write_frame, DEFAULT_MAX_FRAME_LEN, FRAME_HEADER_LEN};
pub use framed::FramedConnection;
pub use tcp::{TcpConnector, CONTROLLER_PORT};

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncRead, AsyncWrite};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique tag of one controller connection, rendered `conn-N` in
/// logs and errors. Numbers count up from 1 and are never reused, so the
/// lines of a reconnect can be told apart from the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates the next id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Any bidirectional byte stream a [`FramedConnection`] can own.
///
/// Implemented for everything that qualifies: `TcpStream` in production,
/// `tokio::io::DuplexStream` in tests.
pub trait Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> Stream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Opens fresh transports to the controller.
///
/// Every successful call hands ownership of a brand new stream to the
/// caller. A failure is reported as [`TransportError::Connect`] and the
/// caller decides whether (and when) to try again.
pub trait Connector: Send + Sync + 'static {
    /// The stream type produced by this connector.
    type Stream: Stream;

    /// Opens a new stream to the controller.
    fn connect(
        &self,
    ) -> impl Future<Output = Result<Self::Stream, TransportError>> + Send;
}

impl<C: Connector> Connector for std::sync::Arc<C> {
    type Stream = C::Stream;

    fn connect(
        &self,
    ) -> impl Future<Output = Result<Self::Stream, TransportError>> + Send {
        C::connect(self)
    }
}

/// A single open connection that exchanges whole frames.
pub trait Connection: Send + Sync + 'static {
    /// Writes one frame. Concurrent callers never interleave bytes of
    /// different frames.
    fn send(
        &self,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Reads the next frame.
    ///
    /// Returns `Ok(None)` when the peer closed the stream cleanly on a frame
    /// boundary, or when the connection was closed locally.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Closes the connection. Calling it more than once is harmless.
    fn close(&self) -> impl Future<Output = ()> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
