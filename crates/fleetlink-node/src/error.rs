//! Error types for the backend satellite.

use fleetlink_link::LinkError;

/// Errors reported to operators and command callers.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// No controller connection is live right now.
    #[error("not connected to the controller")]
    NotConnected,

    /// The write to the controller failed.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// The first word of a command line is not a known command.
    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    /// A command was given without its argument.
    #[error("usage: {usage}")]
    MissingArgument { usage: &'static str },

    /// A command argument could not be parsed.
    #[error("invalid argument `{value}` for `{command}`")]
    InvalidArgument {
        command: &'static str,
        value: String,
    },
}
