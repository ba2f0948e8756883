//! Starting a satellite: resolve the controller, build the role's
//! listener, spawn the supervisor.

use std::net::SocketAddr;
use std::sync::Arc;

use fleetlink_link::{ControllerListener, LinkState, Supervisor, SupervisorHandle};
use fleetlink_node::NodeController;
use fleetlink_proxy::{DirectoryRouter, ProxyHost};
use fleetlink_transport::TcpConnector;

use crate::{ConfigError, FleetlinkError, Role, SatelliteConfig};

/// A running satellite: its role listener plus the link supervisor.
pub struct Satellite<L: ControllerListener> {
    listener: Arc<L>,
    controller: SocketAddr,
    handle: SupervisorHandle,
}

impl<L: ControllerListener> Satellite<L> {
    /// The role listener, e.g. to run operator commands against a node.
    pub fn listener(&self) -> &Arc<L> {
        &self.listener
    }

    /// The resolved controller address.
    pub fn controller(&self) -> SocketAddr {
        self.controller
    }

    pub fn state(&self) -> LinkState {
        self.handle.state()
    }

    /// Stops the link and waits for it to wind down.
    pub async fn shutdown(self) {
        self.handle.shutdown().await;
    }
}

/// Starts the proxy satellite for `host`.
///
/// # Errors
/// Returns [`FleetlinkError::Config`] if the controller cannot be
/// resolved. Nothing is spawned in that case.
pub async fn start_proxy<H: ProxyHost>(
    config: &SatelliteConfig,
    host: Arc<H>,
) -> Result<Satellite<DirectoryRouter<H>>, FleetlinkError> {
    let router = Arc::new(DirectoryRouter::new(host));
    start(config, router).await
}

/// Starts a backend satellite whose players connect to `ip:port`.
///
/// # Errors
/// - [`FleetlinkError::Config`] if `config` is a proxy configuration or
///   the controller cannot be resolved.
pub async fn start_node(
    config: &SatelliteConfig,
    ip: &str,
    port: u16,
) -> Result<Satellite<NodeController>, FleetlinkError> {
    if config.role() != Role::Node {
        let err = ConfigError::InvalidKind(config.kind.tag().to_string());
        tracing::error!(error = %err, "refusing to start a backend with a proxy configuration");
        return Err(err.into());
    }
    let node = Arc::new(NodeController::new(config.authentication(ip, port)));
    start(config, node).await
}

async fn start<L: ControllerListener>(
    config: &SatelliteConfig,
    listener: Arc<L>,
) -> Result<Satellite<L>, FleetlinkError> {
    let controller = match config.resolve_controller().await {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(error = %e, "cannot start controller link");
            return Err(e.into());
        }
    };

    tracing::info!(
        %controller,
        name = %config.name,
        kind = %config.kind,
        "starting controller link"
    );
    let handle = Supervisor::new(TcpConnector::new(controller), Arc::clone(&listener))
        .backoff(config.backoff.clone())
        .max_frame_len(config.max_frame_len)
        .spawn();

    Ok(Satellite {
        listener,
        controller,
        handle,
    })
}
