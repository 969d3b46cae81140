//! Transport Adapters
//!
//! Two ways for a client to reach the same [`McpServer`](crate::protocol::McpServer):
//! - [`stdio`]: line-delimited JSON-RPC over a byte pipe (stdin/stdout)
//! - [`sse`]: a server-sent-events stream for responses plus a POST endpoint
//!   for requests
//!
//! Both adapters process one request at a time per channel, end to end.
//! Neither ever writes logs to stdout.

pub mod channel;
pub mod sse;
pub mod stdio;

use std::fmt;

pub use channel::{ActiveChannel, PushChannel, SessionId};
pub use sse::{router, PushState, DEFAULT_KEEP_ALIVE, MESSAGES_PATH, SSE_PATH};
pub use stdio::{serve, serve_stdio};

/// Errors that can occur in a transport adapter
#[derive(Debug)]
pub enum TransportError {
    /// A message was posted while no push channel is open
    NoActiveChannel,
    /// The channel or pipe was closed by the peer
    ConnectionClosed,
    /// A response could not be serialized
    SerializationError(String),
    /// IO error from the underlying pipe or socket
    IoError(std::io::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoActiveChannel => write!(f, "No active SSE connection"),
            Self::ConnectionClosed => write!(f, "Connection closed"),
            Self::SerializationError(msg) => write!(f, "Serialization error: {msg}"),
            Self::IoError(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err)
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
