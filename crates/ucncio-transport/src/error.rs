use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur in pipe transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No counterpart accepted the connection within the timeout.
    #[error("no peer accepted on {name} within {timeout:?}")]
    ConnectTimeout { name: String, timeout: Duration },

    /// Connecting failed for a reason other than the peer being absent.
    #[error("failed to connect to {name}: {source}")]
    Connect {
        name: String,
        source: std::io::Error,
    },

    /// The connection was lost mid-session (early EOF, reset, abort, or a
    /// failed write).
    #[error("transport closed: {0}")]
    Closed(#[source] std::io::Error),

    /// Failed to create the listening end of the pipe.
    #[error("failed to bind to {name}: {source}")]
    Bind {
        name: String,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },
}

impl TransportError {
    /// Shorthand for a closed connection with a synthetic cause.
    pub fn closed(kind: std::io::ErrorKind, msg: &str) -> Self {
        Self::Closed(std::io::Error::new(kind, msg.to_string()))
    }

    /// True for the connect-phase failures (`ConnectTimeout`, `Connect`).
    pub fn is_connect_failure(&self) -> bool {
        matches!(self, Self::ConnectTimeout { .. } | Self::Connect { .. })
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
