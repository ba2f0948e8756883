//! Proxy satellite for Fleetlink.
//!
//! The proxy is where players connect. The controller tells it which
//! backends exist (`LinkServer` / `UnlinkServer`) and where to move players
//! (`TransportPlayer`). This crate turns those messages into calls on the
//! proxy software through the [`ProxyHost`] adapter and keeps the
//! [`DefaultRoute`] that decides where arriving players land.
//!
//! - [`PriorityDirectory`]: linked backend names by priority.
//! - [`DirectoryRouter`]: the [`ControllerListener`](fleetlink_link::ControllerListener)
//!   for the proxy role.

mod directory;
mod error;
mod host;
mod route;
mod router;

pub use directory::PriorityDirectory;
pub use error::RouterError;
pub use host::{ProxyHost, ReconnectTarget};
pub use route::DefaultRoute;
pub use router::{DirectoryRouter, PROXY_NAME};
