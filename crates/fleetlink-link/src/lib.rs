//! Controller link for Fleetlink satellites.
//!
//! A satellite (the proxy or a backend server) holds exactly one live
//! connection to the controller at a time. This crate keeps that connection
//! alive and turns inbound messages into listener calls:
//!
//! - [`ControllerConnection`]: whole messages over one framed stream.
//! - [`ControllerListener`]: the per-role event handler.
//! - [`Supervisor`]: connect, authenticate, dispatch, reconnect with
//!   [`Backoff`], until shut down through its [`SupervisorHandle`].
//!
//! # Architecture
//!
//! ```text
//! Connector ──stream──► ControllerConnection ──Message──► Supervisor ──► ControllerListener
//! ```

mod backoff;
mod connection;
mod error;
mod listener;
mod supervisor;

pub use backoff::{Backoff, BackoffConfig};
pub use connection::ControllerConnection;
pub use error::LinkError;
pub use listener::ControllerListener;
pub use supervisor::{LinkState, Supervisor, SupervisorHandle};
