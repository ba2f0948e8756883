//! Operator commands for a backend satellite.
//!
//! ```text
//! close <true|false>   start or stop accepting players
//! request <kind>       ask the controller for a minigame of this kind
//! ```

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::{NodeController, NodeError};

const CLOSE_USAGE: &str = "close <true|false>";
const REQUEST_USAGE: &str = "request <minigameKind>";

/// Reply to a successful `close`.
pub const CLOSE_REPLY: &str = "setting active state";
/// Reply to a `close` whose argument is neither `true` nor `false`.
pub const CLOSE_INVALID_REPLY: &str = "huh?";
/// Reply to a `request` that reached the controller.
pub const REQUEST_REPLY: &str =
    "you will be sent to a minigame server shortly (if you are not, try again)";
/// Reply to a `request` that could not be sent.
pub const REQUEST_FAILED_REPLY: &str = "uh oh, big problem atm";

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeCommand {
    /// `close <true|false>`: whether the backend accepts players.
    Close { accepting: bool },
    /// `request <kind>`: ask for a minigame.
    Request { kind: String },
}

impl NodeCommand {
    /// Parses one command line. Extra words after the argument are ignored.
    ///
    /// # Errors
    /// [`NodeError::UnknownCommand`], [`NodeError::MissingArgument`] or
    /// [`NodeError::InvalidArgument`].
    pub fn parse(line: &str) -> Result<Self, NodeError> {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default();
        let arg = words.next();

        match name {
            "close" => {
                let value = arg.ok_or(NodeError::MissingArgument { usage: CLOSE_USAGE })?;
                let accepting = match value {
                    "true" => true,
                    "false" => false,
                    other => {
                        return Err(NodeError::InvalidArgument {
                            command: "close",
                            value: other.to_string(),
                        });
                    }
                };
                Ok(Self::Close { accepting })
            }
            "request" => {
                let kind = arg.ok_or(NodeError::MissingArgument {
                    usage: REQUEST_USAGE,
                })?;
                Ok(Self::Request {
                    kind: kind.to_string(),
                })
            }
            other => Err(NodeError::UnknownCommand(other.to_string())),
        }
    }

    /// Runs the command against `node`. `player` is the invoking player,
    /// if the command came from one.
    ///
    /// # Errors
    /// Whatever [`NodeController::request`] reports; `close` never fails.
    pub async fn execute(
        &self,
        node: &NodeController,
        player: Option<Uuid>,
    ) -> Result<(), NodeError> {
        match self {
            Self::Close { accepting } => {
                node.set_accepting_players(*accepting).await;
                Ok(())
            }
            Self::Request { kind } => node.request(kind, player).await,
        }
    }
}

impl FromStr for NodeCommand {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for NodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Close { accepting } => write!(f, "close {accepting}"),
            Self::Request { kind } => write!(f, "request {kind}"),
        }
    }
}

/// Parses and runs one command line, returning the text to show the
/// operator.
pub async fn run_command(node: &NodeController, line: &str, player: Option<Uuid>) -> String {
    let command = match NodeCommand::parse(line) {
        Ok(command) => command,
        Err(NodeError::InvalidArgument { command: "close", .. }) => {
            return CLOSE_INVALID_REPLY.to_string();
        }
        Err(e) => return e.to_string(),
    };

    match (&command, command.execute(node, player).await) {
        (NodeCommand::Close { .. }, _) => CLOSE_REPLY.to_string(),
        (NodeCommand::Request { .. }, Ok(())) => REQUEST_REPLY.to_string(),
        (NodeCommand::Request { kind }, Err(e)) => {
            tracing::warn!(kind = %kind, error = %e, "minigame request failed");
            REQUEST_FAILED_REPLY.to_string()
        }
    }
}
