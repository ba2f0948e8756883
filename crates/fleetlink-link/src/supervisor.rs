//! The reconnect loop that keeps one satellite linked to the controller.
//!
//! ```text
//!            ┌──────────── shutdown (any state) ─────────────┐
//!            ▼                                               │
//!  Connecting ──ok──► on_connect ──ok──► Running ──ends──► Draining
//!      │                  │                                  │
//!     err               err                         on_disconnect
//!      ▼                  ▼                                  ▼
//!  BackingOff ◄───────────┴──────────────────────────────────┘
//!      │
//!   sleep ──► Connecting
//! ```
//!
//! Failed connects sleep for an exponentially growing delay. A successful
//! connect resets the delay, so a session that ends sleeps for the initial
//! delay only.

use std::fmt;
use std::sync::Arc;

use fleetlink_protocol::Message;
use fleetlink_transport::{Connector, FramedConnection, DEFAULT_MAX_FRAME_LEN};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{Backoff, BackoffConfig, ControllerConnection, ControllerListener, LinkError};

/// Where the supervisor currently is in its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Opening a transport.
    Connecting,
    /// Connected and authenticated; dispatching messages.
    Running,
    /// The session ended; closing the connection and notifying the listener.
    Draining,
    /// Sleeping before the next connect attempt.
    BackingOff,
    /// The supervisor task has exited.
    Stopped,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::BackingOff => "backing-off",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Builder and owner of the reconnect loop.
///
/// # Example
///
/// ```rust,ignore
/// let handle = Supervisor::new(TcpConnector::new(addr), Arc::new(listener))
///     .backoff(BackoffConfig::default())
///     .spawn();
/// // ...
/// handle.shutdown().await;
/// ```
pub struct Supervisor<C: Connector, L: ControllerListener> {
    connector: C,
    listener: Arc<L>,
    backoff: BackoffConfig,
    max_frame_len: usize,
}

impl<C: Connector, L: ControllerListener> Supervisor<C, L> {
    /// Creates a supervisor with the default backoff and frame limit.
    pub fn new(connector: C, listener: Arc<L>) -> Self {
        Self {
            connector,
            listener,
            backoff: BackoffConfig::default(),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Sets the reconnect delay policy.
    pub fn backoff(mut self, config: BackoffConfig) -> Self {
        self.backoff = config;
        self
    }

    /// Sets the largest inbound frame accepted before the connection is dropped.
    pub fn max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// Starts the loop on the current Tokio runtime.
    ///
    /// The loop runs until [`SupervisorHandle::shutdown`] is called. Dropping
    /// the handle detaches the loop; it then runs for the rest of the process.
    pub fn spawn(self) -> SupervisorHandle {
        let (state_tx, state_rx) = watch::channel(LinkState::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(state_tx, shutdown_rx));
        SupervisorHandle {
            state: state_rx,
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(self, state: watch::Sender<LinkState>, mut shutdown: watch::Receiver<bool>) {
        let mut backoff = Backoff::new(self.backoff.clone());

        loop {
            state.send_replace(LinkState::Connecting);
            let connected = tokio::select! {
                _ = wait_shutdown(&mut shutdown) => break,
                result = self.connector.connect() => result,
            };

            let delay = match connected {
                Ok(stream) => {
                    backoff.reset();
                    let conn = Arc::new(ControllerConnection::new(
                        FramedConnection::with_max_frame_len(stream, self.max_frame_len),
                    ));
                    info!(id = %conn.id(), "connected to controller");

                    let end = self.session(&conn, &state, &mut shutdown).await;
                    conn.close().await;
                    if end == SessionEnd::Shutdown {
                        break;
                    }
                    backoff.current()
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    warn!(error = %e, retry_in = ?delay, "failed to connect to controller");
                    delay
                }
            };

            state.send_replace(LinkState::BackingOff);
            tokio::select! {
                _ = wait_shutdown(&mut shutdown) => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("controller link stopped");
        state.send_replace(LinkState::Stopped);
    }

    /// Drives one connection from `on_connect` to `on_disconnect`.
    async fn session(
        &self,
        conn: &Arc<ControllerConnection>,
        state: &watch::Sender<LinkState>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        let connected = tokio::select! {
            _ = wait_shutdown(shutdown) => return SessionEnd::Shutdown,
            result = self.listener.on_connect(conn) => result,
        };
        if let Err(e) = connected {
            warn!(id = %conn.id(), error = %e, "on_connect failed, dropping connection");
            return SessionEnd::Ended;
        }
        state.send_replace(LinkState::Running);

        let end = loop {
            let next = tokio::select! {
                _ = wait_shutdown(shutdown) => break SessionEnd::Shutdown,
                result = conn.read() => result,
            };

            match next {
                Ok(message) => {
                    // Dropping a handler stalled on a write cancels that write.
                    let handled = tokio::select! {
                        _ = wait_shutdown(shutdown) => break SessionEnd::Shutdown,
                        result = self.dispatch(conn, message) => result,
                    };
                    if let Err(e) = handled {
                        warn!(id = %conn.id(), error = %e, "handler failed, dropping connection");
                        break SessionEnd::Ended;
                    }
                }
                Err(e) if e.is_skippable() => {
                    info!(id = %conn.id(), error = %e, "skipping unrecognized message");
                }
                Err(e @ LinkError::Closed(_)) => {
                    info!(id = %conn.id(), reason = %e, "controller connection ended");
                    break SessionEnd::Ended;
                }
                Err(e) => {
                    warn!(id = %conn.id(), error = %e, "controller connection failed");
                    break SessionEnd::Ended;
                }
            }
        };

        state.send_replace(LinkState::Draining);
        conn.close().await;
        self.listener.on_disconnect().await;
        end
    }

    async fn dispatch(&self, conn: &ControllerConnection, message: Message) -> Result<(), LinkError> {
        match message {
            Message::LinkServer(packet) => self.listener.on_link_server(conn, packet).await,
            Message::UnlinkServer(packet) => self.listener.on_unlink_server(conn, packet).await,
            Message::TransportPlayer(packet) => {
                self.listener.on_transport_player(conn, packet).await
            }
            Message::Ping(packet) => self.listener.on_ping(conn, packet).await,
            Message::Request(packet) => {
                info!(kind = %packet.kind, player = ?packet.player, "controller sent a request");
                self.listener.on_request(conn, packet).await
            }
            other @ (Message::Authentication(_) | Message::Pong(_) | Message::UpdateActive(_)) => {
                info!(tag = other.tag(), "ignoring satellite-originated message from controller");
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Ended,
    Shutdown,
}

/// Resolves once shutdown was requested. Pends forever if the handle was
/// dropped without requesting it.
async fn wait_shutdown(rx: &mut watch::Receiver<bool>) {
    let requested = rx.wait_for(|stop| *stop).await.is_ok();
    if !requested {
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Control handle for a running [`Supervisor`].
pub struct SupervisorHandle {
    state: watch::Receiver<LinkState>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SupervisorHandle {
    /// The loop's current state.
    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.state.clone()
    }

    /// Stops the loop and waits for it to exit.
    ///
    /// An open connection is closed and, if it had been authenticated, the
    /// listener's `on_disconnect` runs before this returns.
    pub async fn shutdown(self) {
        self.shutdown.send_replace(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "supervisor task ended abnormally");
        }
        debug!("supervisor shut down");
    }
}

impl fmt::Debug for SupervisorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisorHandle")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
