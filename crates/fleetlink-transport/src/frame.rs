//! Length-prefixed framing.
//!
//! A frame is a big-endian `u32` length followed by exactly that many
//! payload bytes. These functions work on any tokio reader/writer, so the
//! same code runs against a TCP socket, an in-memory duplex pipe, or a plain
//! byte slice.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::TransportError;

/// Size of the length prefix in bytes.
pub const FRAME_HEADER_LEN: usize = 4;

/// Largest payload accepted by default (16 MiB). Control messages are a few
/// hundred bytes at most.
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Reads one frame from `reader`.
///
/// Consumes exactly `4 + length` bytes and nothing more. Returns `Ok(None)`
/// if the stream ends before the first byte of a new frame.
///
/// # Errors
/// - [`TransportError::ShortRead`] if the stream ends mid-frame.
/// - [`TransportError::FrameTooLarge`] if the declared length exceeds
///   `max_len`; no payload bytes are read in that case.
/// - [`TransportError::ReceiveFailed`] for any other I/O error.
pub async fn read_frame<R>(
    reader: &mut R,
    max_len: usize,
) -> Result<Option<Vec<u8>>, TransportError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header = [0u8; FRAME_HEADER_LEN];
    let filled = fill(reader, &mut header).await?;
    if filled == 0 {
        return Ok(None);
    }
    if filled < FRAME_HEADER_LEN {
        return Err(TransportError::ShortRead {
            expected: FRAME_HEADER_LEN,
            read: filled,
        });
    }

    let len = u32::from_be_bytes(header) as usize;
    if len > max_len {
        return Err(TransportError::FrameTooLarge { len, max: max_len });
    }

    let mut payload = vec![0u8; len];
    let filled = fill(reader, &mut payload).await?;
    if filled < len {
        return Err(TransportError::ShortRead {
            expected: len,
            read: filled,
        });
    }

    Ok(Some(payload))
}

/// Writes one frame to `writer` and flushes it.
///
/// # Errors
/// - [`TransportError::FrameTooLarge`] if the payload does not fit a `u32`
///   length prefix.
/// - [`TransportError::SendFailed`] for any I/O error.
pub async fn write_frame<W>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let len = u32::try_from(payload.len()).map_err(|_| {
        TransportError::FrameTooLarge {
            len: payload.len(),
            max: u32::MAX as usize,
        }
    })?;

    writer
        .write_all(&len.to_be_bytes())
        .await
        .map_err(TransportError::SendFailed)?;
    writer
        .write_all(payload)
        .await
        .map_err(TransportError::SendFailed)?;
    writer.flush().await.map_err(TransportError::SendFailed)
}

/// Reads until `buf` is full or the stream ends. Returns how many bytes
/// were filled.
async fn fill<R>(reader: &mut R, buf: &mut [u8]) -> Result<usize, TransportError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader
            .read(&mut buf[filled..])
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
