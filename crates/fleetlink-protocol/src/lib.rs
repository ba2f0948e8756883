//! Wire protocol for Fleetlink.
//!
//! This crate defines the "language" satellites and the controller speak:
//!
//! - **Types** ([`Message`], [`ServerKind`] and the payload records):
//!   the messages that travel inside frames.
//! - **Codec** ([`Codec`] trait, [`MsgPackCodec`]): how those messages
//!   are converted to/from payload bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! ```text
//! Transport (frames) → Protocol (Message) → Link (listener events)
//! ```
//!
//! The protocol layer doesn't know about sockets or reconnects. It only
//! knows how to serialize and deserialize a single frame's payload.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "msgpack")]
pub use codec::MsgPackCodec;
pub use error::ProtocolError;
pub use types::{
    Authentication, LinkServer, Message, Ping, Pong, Request, ServerKind, TransportPlayer,
    UnlinkServer, UpdateActive,
};
