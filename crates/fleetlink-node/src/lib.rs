//! Backend satellite for Fleetlink.
//!
//! Lobby and minigame servers link to the controller through a
//! [`NodeController`]. It authenticates, answers `Ping`s while the server
//! accepts players, and sends the operator's [`NodeCommand`]s.

mod command;
mod controller;
mod error;

pub use command::{
    run_command, NodeCommand, CLOSE_INVALID_REPLY, CLOSE_REPLY, REQUEST_FAILED_REPLY,
    REQUEST_REPLY,
};
pub use controller::NodeController;
pub use error::NodeError;
