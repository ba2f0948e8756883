//! Unified error type for Fleetlink.

use fleetlink_link::LinkError;
use fleetlink_node::NodeError;
use fleetlink_protocol::ProtocolError;
use fleetlink_proxy::RouterError;
use fleetlink_transport::TransportError;

use crate::ConfigError;

/// Any failure a satellite host can see, from reading the environment to
/// running an operator command.
///
/// Each layer keeps its own error enum; `?` lifts them into this one.
/// Display is forwarded unchanged, so a log line reads the same whether it
/// was written by the layer or by the host.
#[derive(Debug, thiserror::Error)]
pub enum FleetlinkError {
    /// Startup configuration is missing or unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A transport-level error (connect, frame I/O).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, malformed or unknown message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A controller-link error (closed, poisoned).
    #[error(transparent)]
    Link(#[from] LinkError),

    /// A proxy directory event that could not be applied.
    #[error(transparent)]
    Router(#[from] RouterError),

    /// A backend command that failed.
    #[error(transparent)]
    Node(#[from] NodeError),
}
