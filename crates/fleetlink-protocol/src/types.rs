//! Message types exchanged between satellites and the controller.
//!
//! Every frame carries exactly one [`Message`]. On the wire a message is a
//! MessagePack map with a single key, the variant name, whose value is the
//! variant's record:
//!
//! ```text
//! { "LinkServer": { "name": "lobby-1", "address": "10.0.0.4", "port": 25566, "priority": 2 } }
//! ```
//!
//! Absent optional fields are left out of the record entirely rather than
//! being written as `nil`.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ServerKind
// ---------------------------------------------------------------------------

/// What role a satellite plays in the cluster.
///
/// Encoded as a record `{ "tag": ..., "payload": ... }` where `payload` is
/// present only for minigame servers:
///
/// ```text
/// { "tag": "Lobby" }
/// { "tag": "Minigame", "payload": { "kind": "tag-ctf" } }
/// ```
///
/// Decoding rejects a `Minigame` without a payload and any other tag that
/// carries one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawServerKind", into = "RawServerKind")]
pub enum ServerKind {
    /// The lobby/edge proxy players connect through.
    Proxy,
    /// A lobby backend.
    Lobby,
    /// A minigame backend running one variety of minigame.
    Minigame {
        /// Which minigame, e.g. `"tag-ctf"`.
        kind: String,
    },
}

impl ServerKind {
    /// Every tag accepted on the wire.
    pub const TAGS: [&'static str; 3] = ["Proxy", "Lobby", "Minigame"];

    /// Shorthand for `ServerKind::Minigame { kind }`.
    pub fn minigame(kind: impl Into<String>) -> Self {
        Self::Minigame { kind: kind.into() }
    }

    /// The wire tag of this kind.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Proxy => "Proxy",
            Self::Lobby => "Lobby",
            Self::Minigame { .. } => "Minigame",
        }
    }

    /// Builds a kind from its wire tag and optional minigame variety.
    ///
    /// # Errors
    /// Returns a description of the problem if `tag` is unknown, or if the
    /// presence of `minigame_kind` does not match the tag.
    pub fn from_parts(tag: &str, minigame_kind: Option<String>) -> Result<Self, String> {
        match (tag, minigame_kind) {
            ("Proxy", None) => Ok(Self::Proxy),
            ("Lobby", None) => Ok(Self::Lobby),
            ("Minigame", Some(kind)) => Ok(Self::Minigame { kind }),
            ("Minigame", None) => Err("`Minigame` kind requires a payload".into()),
            ("Proxy" | "Lobby", Some(_)) => {
                Err(format!("`{tag}` kind must not carry a payload"))
            }
            (other, _) => Err(format!("unknown server kind tag `{other}`")),
        }
    }
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proxy => write!(f, "proxy"),
            Self::Lobby => write!(f, "lobby"),
            Self::Minigame { kind } => write!(f, "minigame-{kind}"),
        }
    }
}

/// The payload of a `Minigame` server kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct MinigamePayload {
    kind: String,
}

/// Wire shape of [`ServerKind`]. Validation happens in the `TryFrom` impl.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawServerKind {
    tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<MinigamePayload>,
}

impl TryFrom<RawServerKind> for ServerKind {
    type Error = String;

    fn try_from(raw: RawServerKind) -> Result<Self, Self::Error> {
        ServerKind::from_parts(&raw.tag, raw.payload.map(|p| p.kind))
    }
}

impl From<ServerKind> for RawServerKind {
    fn from(kind: ServerKind) -> Self {
        let tag = kind.tag().to_string();
        let payload = match kind {
            ServerKind::Minigame { kind } => Some(MinigamePayload { kind }),
            ServerKind::Proxy | ServerKind::Lobby => None,
        };
        Self { tag, payload }
    }
}

// ---------------------------------------------------------------------------
// Payload records
// ---------------------------------------------------------------------------

/// Satellite → controller, always the first frame on a new connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    /// The satellite's name, unique within the cluster.
    pub name: String,
    /// The `ip:port` players should use to reach this satellite.
    pub ip: String,
    /// The satellite's role.
    pub kind: ServerKind,
}

/// Controller → proxy: a backend is up and may receive players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkServer {
    pub name: String,
    pub address: String,
    pub port: u16,
    /// Higher wins when picking where arriving players go.
    pub priority: i32,
}

/// Controller → proxy: a backend is gone and must no longer receive players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlinkServer {
    pub name: String,
}

/// Controller → proxy: move a player to another backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportPlayer {
    /// The player's UUID in its canonical hyphenated form.
    pub player: String,
    /// Name of the destination backend.
    pub to: String,
}

/// Satellite → controller: a player (or the satellite itself, when `player`
/// is absent) wants a server of `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub kind: ServerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
}

/// Controller → backend: "are you accepting players?"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ping {
    pub timer: i32,
}

/// Backend → controller: answer to a [`Ping`], echoing its timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pong {
    pub timer: i32,
}

/// Backend → controller: the backend started or stopped accepting players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateActive {
    pub active: bool,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// One control message. Exactly one variant per frame.
///
/// The variant names are the wire keys, so they must never be renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Authentication(Authentication),
    LinkServer(LinkServer),
    UnlinkServer(UnlinkServer),
    TransportPlayer(TransportPlayer),
    Request(Request),
    Ping(Ping),
    Pong(Pong),
    UpdateActive(UpdateActive),
}

impl Message {
    /// Every variant tag, in declaration order.
    pub const TAGS: [&'static str; 8] = [
        "Authentication",
        "LinkServer",
        "UnlinkServer",
        "TransportPlayer",
        "Request",
        "Ping",
        "Pong",
        "UpdateActive",
    ];

    /// The wire tag of this message.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "Authentication",
            Self::LinkServer(_) => "LinkServer",
            Self::UnlinkServer(_) => "UnlinkServer",
            Self::TransportPlayer(_) => "TransportPlayer",
            Self::Request(_) => "Request",
            Self::Ping(_) => "Ping",
            Self::Pong(_) => "Pong",
            Self::UpdateActive(_) => "UpdateActive",
        }
    }

    /// Returns `true` for variants only the controller may send.
    pub fn is_controller_originated(&self) -> bool {
        matches!(
            self,
            Self::LinkServer(_) | Self::UnlinkServer(_) | Self::TransportPlayer(_) | Self::Ping(_)
        )
    }
}

macro_rules! impl_from_payload {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Message {
                fn from(payload: $variant) -> Self {
                    Message::$variant(payload)
                }
            }
        )*
    };
}

impl_from_payload!(
    Authentication,
    LinkServer,
    UnlinkServer,
    TransportPlayer,
    Request,
    Ping,
    Pong,
    UpdateActive,
);
