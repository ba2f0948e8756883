//! The event listener a [`Supervisor`](crate::Supervisor) drives.

use std::future::Future;
use std::sync::Arc;

use fleetlink_protocol::{LinkServer, Ping, Request, TransportPlayer, UnlinkServer};

use crate::{ControllerConnection, LinkError};

/// Receives connection lifecycle events and controller messages.
///
/// Every satellite role implements this once: the proxy routes players,
/// backends answer pings. The supervisor calls the methods from its own
/// task, one at a time, in wire order.
///
/// Handlers get the connection the message arrived on and may write to it.
/// Returning an error from any handler ends the current connection just
/// like an I/O error would.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use fleetlink_link::{ControllerConnection, ControllerListener, LinkError};
/// use fleetlink_protocol::{Authentication, Ping, Pong, ServerKind};
///
/// struct AlwaysReady;
///
/// impl ControllerListener for AlwaysReady {
///     async fn on_connect(&self, conn: &Arc<ControllerConnection>) -> Result<(), LinkError> {
///         conn.write(Authentication {
///             name: "lobby-1".into(),
///             ip: "0.0.0.0:25565".into(),
///             kind: ServerKind::Lobby,
///         })
///         .await
///     }
///
///     async fn on_ping(&self, conn: &ControllerConnection, ping: Ping) -> Result<(), LinkError> {
///         conn.write(Pong { timer: ping.timer }).await
///     }
/// }
/// ```
pub trait ControllerListener: Send + Sync + 'static {
    /// Called once per successful connect, before any message is read.
    ///
    /// This is where the satellite writes its `Authentication` message.
    /// Implementations that need to write outside of handlers (operator
    /// commands, for instance) keep a clone of `conn`.
    fn on_connect(
        &self,
        conn: &Arc<ControllerConnection>,
    ) -> impl Future<Output = Result<(), LinkError>> + Send;

    /// Called once when a connection whose `on_connect` succeeded ends,
    /// for whatever reason.
    fn on_disconnect(&self) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// A backend became available to the proxy.
    fn on_link_server(
        &self,
        _conn: &ControllerConnection,
        _packet: LinkServer,
    ) -> impl Future<Output = Result<(), LinkError>> + Send {
        async { Ok(()) }
    }

    /// A backend is gone.
    fn on_unlink_server(
        &self,
        _conn: &ControllerConnection,
        _packet: UnlinkServer,
    ) -> impl Future<Output = Result<(), LinkError>> + Send {
        async { Ok(()) }
    }

    /// A player should be moved to another backend.
    fn on_transport_player(
        &self,
        _conn: &ControllerConnection,
        _packet: TransportPlayer,
    ) -> impl Future<Output = Result<(), LinkError>> + Send {
        async { Ok(()) }
    }

    /// The controller echoed a `Request`. Satellites normally ignore it.
    fn on_request(
        &self,
        _conn: &ControllerConnection,
        _packet: Request,
    ) -> impl Future<Output = Result<(), LinkError>> + Send {
        async { Ok(()) }
    }

    /// The controller asks whether this backend accepts players.
    fn on_ping(
        &self,
        _conn: &ControllerConnection,
        _packet: Ping,
    ) -> impl Future<Output = Result<(), LinkError>> + Send {
        async { Ok(()) }
    }
}
