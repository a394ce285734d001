//! Virtual I/O board bridge for the uCNC controller.
//!
//! A controller process exchanges a fixed 40-byte pin record with an operator
//! panel over a local duplex pipe. This crate re-exports the layers:
//!
//! - [`transport`]: the named pipe (Unix socket / Windows named pipe)
//! - [`wire`]: the record codec and the logical pin-id map
//! - [`bridge`]: the connect/poll/reconnect loop and panel marshaling
//!   (behind the default `bridge` feature)

/// Re-export transport types.
pub mod transport {
    pub use ucncio_transport::*;
}

/// Re-export wire types.
pub mod wire {
    pub use ucncio_wire::*;
}

/// Re-export bridge types (requires `bridge` feature).
#[cfg(feature = "bridge")]
pub mod bridge {
    pub use ucncio_bridge::*;
}
