//! Error types for the proxy router.

use uuid::Uuid;

/// Why a directory event could not be applied in full.
///
/// None of these end the controller connection: the router logs them and
/// drops the event.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// `TransportPlayer.player` is not a UUID.
    #[error("invalid player id `{player}`")]
    InvalidPlayerId {
        player: String,
        #[source]
        source: uuid::Error,
    },

    /// No player with this id is connected to the proxy.
    #[error("player {0} is not connected to this proxy")]
    UnknownPlayer(Uuid),

    /// The host has no backend registered under this name.
    #[error("backend `{0}` is not registered with the host")]
    UnknownBackend(String),

    /// No name in the directory is registered with the host.
    #[error("no linked backend is registered with the host")]
    NoRoutableBackend,
}
