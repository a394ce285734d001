//! Named duplex pipe transport for the ucncio I/O bridge.
//!
//! Provides one interface over the platform's local pipe mechanism:
//! - Unix domain sockets (Linux/macOS)
//! - Named pipes (Windows)
//!
//! This is the lowest layer of ucncio. The pin exchange loop builds on the
//! [`Connection`] and [`Connector`] types provided here; no retry policy
//! lives at this layer.

pub mod client;
pub mod connection;
pub mod error;
pub mod name;
pub mod stream;

#[cfg(unix)]
pub mod uds;

#[cfg(windows)]
pub mod windows;

pub use client::{PipeClient, DEFAULT_CONNECT_TIMEOUT};
pub use connection::{Connection, ConnectionState, Connector};
pub use error::{Result, TransportError};
pub use name::{PipeName, DEFAULT_PIPE_NAME};
pub use stream::{AbortHandle, PipeStream};

#[cfg(unix)]
pub use uds::PipeListener;

#[cfg(windows)]
pub use windows::PipeListener;
