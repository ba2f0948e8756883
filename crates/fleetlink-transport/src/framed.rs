//! [`Connection`] implementation over any byte stream.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::{watch, Mutex};

use crate::frame::{read_frame, write_frame, DEFAULT_MAX_FRAME_LEN};
use crate::{Connection, ConnectionId, Stream, TransportError};

type BoxedReader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;
type BoxedWriter = BufWriter<Box<dyn AsyncWrite + Send + Unpin>>;

/// Owns one open stream and exchanges length-prefixed frames over it.
///
/// The read and write halves sit behind separate locks, so a read loop can
/// block on [`recv`](Connection::recv) while other tasks write. Writers are
/// serialized: a frame's length and payload always land on the wire
/// together.
///
/// Once any read or write fails the connection is poisoned and every later
/// operation fails with [`TransportError::Poisoned`]. [`close`](Connection::close)
/// wakes a blocked reader, shuts the write half down and drops both halves.
pub struct FramedConnection {
    id: ConnectionId,
    reader: Mutex<Option<BoxedReader>>,
    writer: Mutex<Option<BoxedWriter>>,
    max_frame_len: usize,
    poisoned: AtomicBool,
    closed: watch::Sender<bool>,
}

impl FramedConnection {
    /// Takes ownership of `stream` with the default frame size limit.
    pub fn new<S: Stream>(stream: S) -> Self {
        Self::with_max_frame_len(stream, DEFAULT_MAX_FRAME_LEN)
    }

    /// Takes ownership of `stream`, rejecting inbound frames larger than
    /// `max_frame_len`.
    pub fn with_max_frame_len<S: Stream>(stream: S, max_frame_len: usize) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(read_half);
        let writer: Box<dyn AsyncWrite + Send + Unpin> = Box::new(write_half);

        let id = ConnectionId::next();
        tracing::debug!(%id, "framed connection opened");

        Self {
            id,
            reader: Mutex::new(Some(BufReader::new(reader))),
            writer: Mutex::new(Some(BufWriter::new(writer))),
            max_frame_len,
            poisoned: AtomicBool::new(false),
            closed: watch::Sender::new(false),
        }
    }

    /// Returns `true` once [`close`](Connection::close) has been called.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Returns `true` if an earlier read or write failed.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Acquire)
    }

    /// The largest inbound payload this connection accepts.
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    fn closed_locally(&self) -> TransportError {
        TransportError::ConnectionClosed(format!("{} was closed locally", self.id))
    }

    fn poison(&self, error: &TransportError) {
        if !self.poisoned.swap(true, Ordering::AcqRel) {
            tracing::debug!(id = %self.id, %error, "connection poisoned");
        }
    }
}

impl Connection for FramedConnection {
    async fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        if self.is_poisoned() {
            return Err(TransportError::Poisoned(self.id));
        }

        let closed = self.closed.subscribe();
        let mut guard = tokio::select! {
            guard = self.writer.lock() => guard,
            () = wait_closed(closed.clone()) => return Err(self.closed_locally()),
        };
        let Some(writer) = guard.as_mut() else {
            return Err(self.closed_locally());
        };

        tracing::trace!(id = %self.id, len = payload.len(), "sending frame");
        let result = tokio::select! {
            result = write_frame(writer, payload) => result,
            // The frame may be half written; nothing can follow it.
            () = wait_closed(closed) => Err(self.closed_locally()),
        };
        if let Err(e) = &result {
            self.poison(e);
        }
        result
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        if self.is_poisoned() {
            return Err(TransportError::Poisoned(self.id));
        }

        let closed = self.closed.subscribe();
        let mut guard = self.reader.lock().await;
        let Some(reader) = guard.as_mut() else {
            return Ok(None);
        };

        let result = tokio::select! {
            result = read_frame(reader, self.max_frame_len) => result,
            () = wait_closed(closed) => return Ok(None),
        };

        match &result {
            Ok(Some(frame)) => {
                tracing::trace!(id = %self.id, len = frame.len(), "received frame");
            }
            Ok(None) => tracing::debug!(id = %self.id, "peer closed the stream"),
            Err(e) => self.poison(e),
        }
        result
    }

    async fn close(&self) {
        if self.closed.send_replace(true) {
            return;
        }

        // Blocked `send` and `recv` calls have been woken by the flag above
        // and release their locks promptly.
        if let Some(mut writer) = self.writer.lock().await.take() {
            let result = if self.is_poisoned() {
                // Leftover bytes of an aborted frame are discarded unflushed.
                writer.get_mut().shutdown().await
            } else {
                writer.shutdown().await
            };
            if let Err(e) = result {
                tracing::debug!(id = %self.id, error = %e, "shutdown failed");
            }
        }
        self.reader.lock().await.take();

        tracing::debug!(id = %self.id, "framed connection closed");
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Resolves once the close flag is set.
async fn wait_closed(mut closed: watch::Receiver<bool>) {
    while !*closed.borrow_and_update() {
        if closed.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
