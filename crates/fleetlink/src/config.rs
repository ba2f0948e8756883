//! Startup configuration read from the environment.
//!
//! | Variable        | Needed by                      | Becomes                     |
//! |-----------------|--------------------------------|-----------------------------|
//! | `CONTROLLER_IP` | every role                     | controller host             |
//! | `SERVER_NAME`   | backends                       | `Authentication.name`       |
//! | `SERVER_KIND`   | backends                       | `ServerKind` tag            |
//! | `MINIGAME_KIND` | backends with `Minigame` kind  | the minigame payload `kind` |
//!
//! The proxy always authenticates as `"proxy"` with kind `Proxy` and does
//! not read `SERVER_NAME` or `SERVER_KIND`.

use std::io;
use std::net::SocketAddr;

use fleetlink_link::BackoffConfig;
use fleetlink_protocol::{Authentication, ServerKind};
use fleetlink_proxy::PROXY_NAME;
use fleetlink_transport::{CONTROLLER_PORT, DEFAULT_MAX_FRAME_LEN};

pub const CONTROLLER_IP: &str = "CONTROLLER_IP";
pub const SERVER_NAME: &str = "SERVER_NAME";
pub const SERVER_KIND: &str = "SERVER_KIND";
pub const MINIGAME_KIND: &str = "MINIGAME_KIND";

/// Why a satellite cannot start.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    #[error("missing environment variable `{0}`")]
    Missing(&'static str),

    /// The controller host did not resolve to any address.
    #[error("could not resolve controller host `{host}`")]
    Unresolvable {
        host: String,
        #[source]
        source: io::Error,
    },

    /// `SERVER_KIND` is not a backend kind.
    #[error("invalid server kind `{0}` (expected `Lobby` or `Minigame`)")]
    InvalidKind(String),
}

/// Which satellite is being configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The player-facing proxy.
    Proxy,
    /// A lobby or minigame backend.
    Node,
}

/// Everything a satellite needs before its first connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatelliteConfig {
    /// Hostname or address of the controller.
    pub controller_host: String,
    /// Controller port. Always [`CONTROLLER_PORT`] when read from the env.
    pub controller_port: u16,
    /// Name sent in `Authentication`.
    pub name: String,
    /// Kind sent in `Authentication`.
    pub kind: ServerKind,
    pub backoff: BackoffConfig,
    /// Largest inbound frame accepted from the controller.
    pub max_frame_len: usize,
}

impl SatelliteConfig {
    /// Reads the configuration for `role` from the process environment.
    ///
    /// # Errors
    /// See [`from_lookup`](Self::from_lookup).
    pub fn from_env(role: Role) -> Result<Self, ConfigError> {
        Self::from_lookup(role, |var| std::env::var(var).ok())
    }

    /// Reads the configuration for `role` through `lookup`.
    ///
    /// # Errors
    /// - [`ConfigError::Missing`] if a variable the role needs is absent.
    /// - [`ConfigError::InvalidKind`] if `SERVER_KIND` is not `Lobby` or
    ///   `Minigame`.
    pub fn from_lookup(
        role: Role,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let require = |var: &'static str| {
            lookup(var)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let controller_host = require(CONTROLLER_IP)?;
        let (name, kind) = match role {
            Role::Proxy => (PROXY_NAME.to_string(), ServerKind::Proxy),
            Role::Node => {
                let name = require(SERVER_NAME)?;
                let kind = match require(SERVER_KIND)?.as_str() {
                    "Lobby" => ServerKind::Lobby,
                    "Minigame" => ServerKind::minigame(require(MINIGAME_KIND)?),
                    other => return Err(ConfigError::InvalidKind(other.to_string())),
                };
                (name, kind)
            }
        };

        Ok(Self {
            controller_host,
            controller_port: CONTROLLER_PORT,
            name,
            kind,
            backoff: BackoffConfig::default(),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        })
    }

    pub fn role(&self) -> Role {
        match self.kind {
            ServerKind::Proxy => Role::Proxy,
            ServerKind::Lobby | ServerKind::Minigame { .. } => Role::Node,
        }
    }

    /// Resolves the controller host to a socket address.
    ///
    /// # Errors
    /// Returns [`ConfigError::Unresolvable`] if the lookup fails or yields
    /// no address.
    pub async fn resolve_controller(&self) -> Result<SocketAddr, ConfigError> {
        let host = self.controller_host.as_str();
        let unresolvable = |source: io::Error| ConfigError::Unresolvable {
            host: host.to_string(),
            source,
        };

        tokio::net::lookup_host((host, self.controller_port))
            .await
            .map_err(unresolvable)?
            .next()
            .ok_or_else(|| {
                unresolvable(io::Error::new(io::ErrorKind::NotFound, "no addresses found"))
            })
    }

    /// The `Authentication` a backend listening on `ip:port` sends.
    pub fn authentication(&self, ip: &str, port: u16) -> Authentication {
        Authentication {
            name: self.name.clone(),
            ip: advertised_address(ip, port),
            kind: self.kind.clone(),
        }
    }
}

/// Formats the `ip:port` players reach a server at. An empty `ip` (bound
/// to every interface) is advertised as `0.0.0.0`.
pub fn advertised_address(ip: &str, port: u16) -> String {
    let ip = if ip.is_empty() { "0.0.0.0" } else { ip };
    format!("{ip}:{port}")
}
