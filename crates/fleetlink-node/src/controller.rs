//! The backend role: answer pings while accepting players.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use fleetlink_link::{ControllerConnection, ControllerListener, LinkError};
use fleetlink_protocol::{Authentication, Ping, Pong, Request, ServerKind, UpdateActive};
use tracing::{debug, info};
use uuid::Uuid;

use crate::NodeError;

/// Listener for lobby and minigame backends.
///
/// The controller polls backends with `Ping`; only a backend that accepts
/// players answers with a `Pong`, which is how the controller learns where
/// it may send people. A backend starts out not accepting.
///
/// The connection handed to `on_connect` is kept until `on_disconnect` so
/// operator commands can write to it. Commands issued while no connection
/// is live fail with [`NodeError::NotConnected`].
pub struct NodeController {
    auth: Authentication,
    accepting: AtomicBool,
    current: Mutex<Option<Arc<ControllerConnection>>>,
}

impl NodeController {
    /// Creates a controller that authenticates with `auth` on every connect.
    pub fn new(auth: Authentication) -> Self {
        Self {
            auth,
            accepting: AtomicBool::new(false),
            current: Mutex::new(None),
        }
    }

    pub fn authentication(&self) -> &Authentication {
        &self.auth
    }

    pub fn is_accepting_players(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Returns `true` while a connection is authenticated and live.
    pub fn is_connected(&self) -> bool {
        self.connection().is_some()
    }

    /// Sets whether this backend accepts players and tells the controller.
    ///
    /// The flag changes even when the controller cannot be told; it will
    /// notice from the next pings.
    pub async fn set_accepting_players(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::Release);
        info!(accepting, "accepting players changed");

        let Some(conn) = self.connection() else {
            debug!("not connected, controller will learn accepting state from pings");
            return;
        };
        if let Err(e) = conn.write(UpdateActive { active: accepting }).await {
            debug!(error = %e, "failed to send UpdateActive");
        }
    }

    /// Asks the controller for a minigame of `minigame_kind`, on behalf of
    /// `player` (or of the server itself when `None`).
    ///
    /// # Errors
    /// - [`NodeError::NotConnected`] if no connection is live.
    /// - [`NodeError::Link`] if the write fails.
    pub async fn request(
        &self,
        minigame_kind: &str,
        player: Option<Uuid>,
    ) -> Result<(), NodeError> {
        let conn = self.connection().ok_or(NodeError::NotConnected)?;
        let request = Request {
            kind: ServerKind::minigame(minigame_kind),
            player: player.map(|id| id.to_string()),
        };
        conn.write(request).await?;
        info!(kind = minigame_kind, player = ?player, "requested minigame");
        Ok(())
    }

    fn connection(&self) -> Option<Arc<ControllerConnection>> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_connection(&self, conn: Option<Arc<ControllerConnection>>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = conn;
    }
}

impl ControllerListener for NodeController {
    async fn on_connect(&self, conn: &Arc<ControllerConnection>) -> Result<(), LinkError> {
        conn.write(self.auth.clone()).await?;
        self.replace_connection(Some(Arc::clone(conn)));
        info!(id = %conn.id(), name = %self.auth.name, kind = %self.auth.kind, "authenticated with controller");
        Ok(())
    }

    async fn on_disconnect(&self) {
        self.replace_connection(None);
        info!(name = %self.auth.name, "disconnected from controller");
    }

    async fn on_ping(&self, conn: &ControllerConnection, ping: Ping) -> Result<(), LinkError> {
        let accepting = self.is_accepting_players();
        debug!(timer = ping.timer, accepting, "received ping");
        if accepting {
            conn.write(Pong { timer: ping.timer }).await?;
        }
        Ok(())
    }
}
