//! TCP [`Connector`] used to reach the controller.

use std::net::SocketAddr;

use tokio::net::TcpStream;

use crate::{Connector, TransportError};

/// The port every controller listens on.
pub const CONTROLLER_PORT: u16 = 25550;

/// Opens a fresh TCP stream to a fixed controller address on every call.
///
/// The address is resolved once, up front; a satellite whose controller
/// hostname does not resolve never gets as far as building a connector.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: SocketAddr,
}

impl TcpConnector {
    /// Creates a connector targeting `addr`.
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Returns the controller address this connector dials.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self) -> Result<TcpStream, TransportError> {
        let stream = TcpStream::connect(self.addr).await.map_err(|source| {
            TransportError::Connect {
                addr: self.addr.to_string(),
                source,
            }
        })?;

        // Control frames are tiny; don't let Nagle hold a Pong back.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(addr = %self.addr, error = %e, "set_nodelay failed");
        }

        tracing::debug!(addr = %self.addr, "connected to controller");
        Ok(stream)
    }
}
