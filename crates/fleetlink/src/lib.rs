//! # Fleetlink
//!
//! Controller link for the satellites of a game server cluster.
//!
//! A central controller decides which backend each player should be on.
//! Every other process in the cluster is a satellite holding one TCP link
//! to it:
//!
//! - the **proxy** learns which backends exist and moves players between
//!   them ([`start_proxy`]);
//! - **backends** (lobbies, minigame servers) report whether they accept
//!   players and ask for minigames ([`start_node`]).
//!
//! The link reconnects on its own with exponential backoff and always
//! authenticates first on a fresh connection.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fleetlink::prelude::*;
//!
//! # async fn run() -> Result<(), FleetlinkError> {
//! init_tracing();
//! let config = SatelliteConfig::from_env(Role::Node)?;
//! let satellite = start_node(&config, "", 25565).await?;
//!
//! satellite.listener().set_accepting_players(true).await;
//! // ...
//! satellite.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod logging;
mod satellite;

pub use config::{
    advertised_address, ConfigError, Role, SatelliteConfig, CONTROLLER_IP, MINIGAME_KIND,
    SERVER_KIND, SERVER_NAME,
};
pub use error::FleetlinkError;
pub use logging::init_tracing;
pub use satellite::{start_node, start_proxy, Satellite};

pub use fleetlink_link as link;
pub use fleetlink_node as node;
pub use fleetlink_protocol as protocol;
pub use fleetlink_proxy as proxy;
pub use fleetlink_transport as transport;

/// Everything a satellite host usually needs.
pub mod prelude {
    pub use crate::{
        init_tracing, start_node, start_proxy, ConfigError, FleetlinkError, Role, Satellite,
        SatelliteConfig,
    };
    pub use fleetlink_link::{BackoffConfig, LinkState};
    pub use fleetlink_node::{run_command, NodeCommand, NodeController, NodeError};
    pub use fleetlink_protocol::ServerKind;
    pub use fleetlink_proxy::{DirectoryRouter, ProxyHost, ReconnectTarget, RouterError};
    pub use uuid::Uuid;
}
