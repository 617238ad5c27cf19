//! Error handling for forgekit
//!
//! Provides error types for all layers of the application:
//! - Transport errors (socket/HTTP communication with the printer)
//! - Command errors (dispatch, vocabulary, and gating failures)
//! - Backend errors (lifecycle and feature availability)
//!
//! All error types use `thiserror` for ergonomic error handling.
//!
//! The taxonomy deliberately keeps "this printer cannot do that"
//! (`CommandError::Unsupported`) apart from "something broke"
//! (`TransportError`), so callers can gray out a control instead of
//! raising an alarm.

use thiserror::Error;

/// Transport error type
///
/// Represents failures talking to the printer over the wire, for either
/// protocol generation.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// Could not reach the printer at all
    #[error("Failed to connect to {host}: {reason}")]
    ConnectFailed {
        /// Host (ip:port) that was being connected to.
        host: String,
        /// Why the connection attempt failed.
        reason: String,
    },

    /// A protocol handshake step failed during connect
    #[error("Handshake failed: {reason}")]
    HandshakeFailed {
        /// The handshake step or cause.
        reason: String,
    },

    /// The modern protocol requires a check code and none was supplied
    #[error("Check code required for the modern protocol but none was provided")]
    MissingCheckCode,

    /// No client is connected
    #[error("Not connected to a printer")]
    NotConnected,

    /// The operation timed out
    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// Socket-level I/O failure
    #[error("I/O error: {reason}")]
    Io {
        /// Description of the I/O failure.
        reason: String,
    },

    /// HTTP-level failure on the modern API
    #[error("HTTP error{}: {reason}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Http {
        /// HTTP status code if the server responded.
        status: Option<u16>,
        /// Description of the failure.
        reason: String,
    },

    /// The printer answered, but the payload could not be interpreted
    #[error("Malformed response: {reason}")]
    MalformedResponse {
        /// What was wrong with the payload.
        reason: String,
    },
}

/// Command dispatch error type
#[derive(Error, Debug, Clone)]
pub enum CommandError {
    /// The command exists in the vocabulary but the active protocol
    /// variant has no way to perform it
    #[error("{message}")]
    Unsupported {
        /// Wire name of the command.
        command: String,
        /// The human-readable unsupported message from the mapping table.
        message: String,
    },

    /// The name is not part of the command vocabulary
    #[error("Unknown command: {name}")]
    UnknownCommand {
        /// The unrecognized name.
        name: String,
    },

    /// The command was refused because a file upload holds the connection
    #[error("Command {command} blocked: file upload in progress")]
    Blocked {
        /// Wire name of the refused command.
        command: String,
    },

    /// The command's arguments do not fit the operation
    #[error("Invalid arguments for {command}: {reason}")]
    InvalidArguments {
        /// Wire name of the command.
        command: String,
        /// Why the arguments were rejected.
        reason: String,
    },

    /// The printer rejected the command
    #[error("Command {command} rejected: {reason}")]
    Rejected {
        /// Wire name of the command.
        command: String,
        /// The printer's reason.
        reason: String,
    },
}

/// Backend lifecycle and feature error type
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    /// No backend has been initialized
    #[error("No backend initialized")]
    NoBackend,

    /// The printer model behind this backend lacks the feature
    #[error("Feature not available on this printer: {feature}")]
    FeatureUnavailable {
        /// The feature that was requested.
        feature: String,
    },

    /// Backend construction or connection failed
    #[error("Backend initialization failed: {reason}")]
    InitializationFailed {
        /// The underlying cause.
        reason: String,
    },

    /// A backend initialization is being disposed while in use
    #[error("Backend disposed")]
    Disposed,
}

/// Main error type for forgekit
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Command error
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Backend error
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is an unsupported-operation error
    ///
    /// Unsupported operations are quieter than genuine failures: the UI
    /// disables the control instead of showing an error banner.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Command(CommandError::Unsupported { .. }))
    }

    /// Check if this is a blocked-by-upload refusal
    pub fn is_blocked(&self) -> bool {
        matches!(self, Error::Command(CommandError::Blocked { .. }))
    }

    /// Check if this is a transport error
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Io(_))
    }

    /// Check if this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport(TransportError::Timeout { .. }))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
