//! Applies controller directory events to the proxy host.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fleetlink_link::{ControllerConnection, ControllerListener, LinkError};
use fleetlink_protocol::{Authentication, LinkServer, ServerKind, TransportPlayer, UnlinkServer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{DefaultRoute, PriorityDirectory, ProxyHost, RouterError};

/// The name the proxy authenticates with.
pub const PROXY_NAME: &str = "proxy";

/// Keeps the proxy's backend list and default route in step with the
/// controller.
///
/// After every link or unlink the default route is recomputed: the first
/// name, in priority order, that the host still has registered. When no
/// name qualifies the previous route is kept.
pub struct DirectoryRouter<H: ProxyHost> {
    host: Arc<H>,
    directory: Mutex<PriorityDirectory>,
    default_route: Arc<DefaultRoute>,
}

impl<H: ProxyHost> DirectoryRouter<H> {
    /// Creates a router and installs its default route as the host's
    /// reconnect target.
    pub fn new(host: Arc<H>) -> Self {
        let default_route = Arc::new(DefaultRoute::new());
        let route = Arc::clone(&default_route);
        host.set_reconnect_target(Arc::new(move || route.get()));

        Self {
            host,
            directory: Mutex::new(PriorityDirectory::new()),
            default_route,
        }
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    /// A snapshot of the priority buckets.
    pub fn directory(&self) -> PriorityDirectory {
        self.lock_directory().clone()
    }

    /// The backend arriving players are currently sent to.
    pub fn current_default(&self) -> Option<String> {
        self.default_route.get()
    }

    /// Registers a backend with the host and files it under its priority.
    pub fn on_link(&self, link: &LinkServer) {
        self.host.register_backend(&link.name, &link.address, link.port);

        let moved_from = self.lock_directory().insert(link.name.clone(), link.priority);
        match moved_from {
            Some(old) => info!(
                name = %link.name,
                from = old,
                to = link.priority,
                "relinked backend under a new priority"
            ),
            None => info!(
                name = %link.name,
                address = %link.address,
                port = link.port,
                priority = link.priority,
                "linked backend"
            ),
        }

        let _ = self.refresh_default_route();
    }

    /// Deregisters a backend and drops it from the directory.
    ///
    /// The name is removed from its bucket even when the host did not know
    /// it, so the directory never routes to a backend the host lacks.
    ///
    /// # Errors
    /// Returns [`RouterError::UnknownBackend`] if the host had no backend
    /// with this name.
    pub fn on_unlink(&self, name: &str) -> Result<(), RouterError> {
        let known = self.host.deregister_backend(name);
        let removed = self.lock_directory().remove(name);
        info!(name, priority = ?removed, "unlinked backend");

        let _ = self.refresh_default_route();

        if known {
            Ok(())
        } else {
            Err(RouterError::UnknownBackend(name.to_string()))
        }
    }

    /// Moves a player to the named backend.
    ///
    /// # Errors
    /// - [`RouterError::InvalidPlayerId`] if `player` is not a UUID.
    /// - [`RouterError::UnknownPlayer`] if the player is not on this proxy.
    /// - [`RouterError::UnknownBackend`] if `to` is not registered.
    ///
    /// Nothing is moved in any of these cases.
    pub fn transport_player(&self, packet: &TransportPlayer) -> Result<(), RouterError> {
        let id = Uuid::parse_str(&packet.player).map_err(|source| RouterError::InvalidPlayerId {
            player: packet.player.clone(),
            source,
        })?;
        let player = self
            .host
            .find_player(id)
            .ok_or(RouterError::UnknownPlayer(id))?;
        let backend = self
            .host
            .lookup_backend(&packet.to)
            .ok_or_else(|| RouterError::UnknownBackend(packet.to.clone()))?;

        self.host.move_player(player, backend);
        info!(player = %id, to = %packet.to, "transported player");
        Ok(())
    }

    /// Points the default route at the best registered backend and returns
    /// its name.
    ///
    /// # Errors
    /// Returns [`RouterError::NoRoutableBackend`] when no linked name is
    /// registered; the previous route is kept.
    pub fn refresh_default_route(&self) -> Result<String, RouterError> {
        let best = {
            let directory = self.lock_directory();
            directory
                .first_where(|name| self.host.lookup_backend(name).is_some())
                .map(str::to_string)
        };

        match best {
            Some(name) => {
                let previous = self.default_route.set(name.clone());
                if previous.as_deref() != Some(name.as_str()) {
                    info!(default = %name, previous = ?previous, "updated default route");
                }
                Ok(name)
            }
            None => {
                warn!(
                    current = ?self.default_route.get(),
                    "no registered backend to route players to, keeping current default"
                );
                Err(RouterError::NoRoutableBackend)
            }
        }
    }

    fn lock_directory(&self) -> MutexGuard<'_, PriorityDirectory> {
        self.directory.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<H: ProxyHost> ControllerListener for DirectoryRouter<H> {
    async fn on_connect(&self, conn: &Arc<ControllerConnection>) -> Result<(), LinkError> {
        let auth = Authentication {
            name: PROXY_NAME.to_string(),
            ip: self.host.listener_address(),
            kind: ServerKind::Proxy,
        };
        conn.write(auth).await?;
        info!(id = %conn.id(), "proxy authenticated with controller");
        Ok(())
    }

    async fn on_disconnect(&self) {
        // Linked backends stay registered across reconnects.
        info!("proxy disconnected from controller");
    }

    async fn on_link_server(
        &self,
        _conn: &ControllerConnection,
        packet: LinkServer,
    ) -> Result<(), LinkError> {
        self.on_link(&packet);
        Ok(())
    }

    async fn on_unlink_server(
        &self,
        _conn: &ControllerConnection,
        packet: UnlinkServer,
    ) -> Result<(), LinkError> {
        if let Err(e) = self.on_unlink(&packet.name) {
            warn!(error = %e, "unlink for a backend the host did not know");
        }
        Ok(())
    }

    async fn on_transport_player(
        &self,
        _conn: &ControllerConnection,
        packet: TransportPlayer,
    ) -> Result<(), LinkError> {
        if let Err(e) = self.transport_player(&packet) {
            warn!(error = %e, player = %packet.player, to = %packet.to, "dropping transport request");
        }
        Ok(())
    }
}
