use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::stream::AbortHandle;

/// Lifecycle of one pipe connection.
///
/// A `Connection` only exists once connected; the connecting phase is the
/// blocking [`Connector::connect`] call itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Produces connections to the pipe's counterpart.
///
/// This is the seam the exchange loop is generic over: the real
/// [`PipeClient`](crate::PipeClient) in production, scripted doubles in tests.
pub trait Connector: Send {
    type Stream: Read + Write + Send;

    /// Attempt one connection, giving up after `timeout`.
    fn connect(&mut self, timeout: Duration) -> Result<Connection<Self::Stream>>;
}

/// An open connection that moves whole buffers across the pipe.
///
/// Handles partial reads and writes internally: callers always transfer
/// exactly the requested number of bytes or get `TransportError::Closed`.
pub struct Connection<T> {
    inner: Option<T>,
    abort: AbortHandle,
}

impl<T: Read + Write> Connection<T> {
    /// Wrap a connected stream together with the handle that can abort it.
    pub fn new(inner: T, abort: AbortHandle) -> Self {
        Self {
            inner: Some(inner),
            abort,
        }
    }

    /// Current state: `Connected` until closed or faulted.
    pub fn state(&self) -> ConnectionState {
        if self.inner.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Fill `buf` completely (blocking).
    ///
    /// Returns `Err(TransportError::Closed)` on EOF before the buffer is
    /// full, on reset, or when the connection was aborted. The connection is
    /// closed after any failure.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let result = match self.inner.as_mut() {
            Some(stream) => read_full(stream, buf),
            None => Err(not_connected()),
        };
        self.close_on_error(result)
    }

    /// Write all of `buf` and flush it to the counterpart (blocking).
    pub fn write_exact_and_flush(&mut self, buf: &[u8]) -> Result<()> {
        let result = match self.inner.as_mut() {
            Some(stream) => write_full(stream, buf),
            None => Err(not_connected()),
        };
        self.close_on_error(result)
    }

    /// Release the connection. Idempotent.
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            self.abort.abort();
            debug!("connection closed");
        }
    }

    /// A handle that unblocks in-flight calls on this connection.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Borrow the underlying stream, if still connected.
    pub fn get_ref(&self) -> Option<&T> {
        self.inner.as_ref()
    }

    fn close_on_error<R>(&mut self, result: Result<R>) -> Result<R> {
        if let Err(err) = &result {
            trace!(error = %err, "closing connection after failure");
            self.close();
        }
        result
    }
}

impl<T> Drop for Connection<T> {
    fn drop(&mut self) {
        if self.inner.take().is_some() {
            self.abort.abort();
        }
    }
}

impl<T> std::fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("connected", &self.inner.is_some())
            .finish()
    }
}

fn read_full<T: Read>(stream: &mut T, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(TransportError::closed(
                    ErrorKind::UnexpectedEof,
                    "peer closed the pipe mid-record",
                ))
            }
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Closed(err)),
        }
    }
    Ok(())
}

fn write_full<T: Write>(stream: &mut T, buf: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < buf.len() {
        match stream.write(&buf[offset..]) {
            Ok(0) => {
                return Err(TransportError::closed(
                    ErrorKind::WriteZero,
                    "pipe accepted no bytes",
                ))
            }
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) => return Err(TransportError::Closed(err)),
        }
    }

    loop {
        match stream.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) => return Err(TransportError::Closed(err)),
        }
    }
}

fn not_connected() -> TransportError {
    TransportError::closed(ErrorKind::NotConnected, "connection already closed")
}
