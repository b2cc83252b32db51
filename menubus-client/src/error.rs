//! Error types for the MenuBus client.
//!
//! Every variant is terminal for the session that reports it.

use menubus_common::ConfigError;
use thiserror::Error;

/// Result type for session and facade operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors surfaced by sessions, either returned or delivered to a handler.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Resolving or connecting to the peer failed.
    #[error("failed to connect to {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Read or write failure on an established connection, including EOF.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Inbound bytes are not valid RESP (only with RESP framing).
    #[error("framing error: {0}")]
    Framing(String),

    /// The session task has stopped; the session must be recreated.
    #[error("session is closed")]
    Closed,

    /// The named session stopped before its connection came up.
    #[error("session {session} stopped before connecting")]
    NotConnected { session: String },

    /// No Tokio runtime was available to drive the session.
    #[error("no tokio runtime available to drive the session")]
    NoRuntime,

    /// The supplied configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SessionError {
    /// Create a connection error for the given address.
    pub fn connection(addr: impl Into<String>, source: std::io::Error) -> Self {
        Self::Connection {
            addr: addr.into(),
            source,
        }
    }

    /// Transport error for a peer that closed the connection.
    pub(crate) fn peer_closed() -> Self {
        Self::Transport(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed by peer",
        ))
    }
}
