use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A connected pipe stream. Implements `Read + Write`.
///
/// On Unix, this wraps a Unix domain socket stream.
/// On Windows, this wraps a named pipe handle.
///
/// The OS handle is reference counted so an [`AbortHandle`] taken from the
/// stream stays valid for as long as either side holds it.
pub struct PipeStream {
    inner: PipeStreamInner,
    gate: Arc<AbortGate>,
}

/// Abort state shared between a stream and its abort handles.
///
/// Once aborted, every later read or write fails before reaching the OS, so
/// an abort that lands between two calls is not lost.
#[derive(Debug, Default)]
struct AbortGate {
    aborted: AtomicBool,
    in_flight: AtomicBool,
}

impl AbortGate {
    fn enter(&self) -> std::io::Result<InFlight<'_>> {
        self.in_flight.store(true, Ordering::SeqCst);
        if self.aborted.load(Ordering::SeqCst) {
            self.in_flight.store(false, Ordering::SeqCst);
            return Err(std::io::Error::new(
                ErrorKind::ConnectionAborted,
                "pipe stream aborted",
            ));
        }
        Ok(InFlight(self))
    }

    fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    fn in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Marks a call as inside the OS until dropped.
struct InFlight<'a>(&'a AbortGate);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::SeqCst);
    }
}

enum PipeStreamInner {
    #[cfg(unix)]
    Unix(Arc<std::os::unix::net::UnixStream>),
    #[cfg(windows)]
    Windows(Arc<std::fs::File>),
}

impl Read for PipeStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let _io = self.gate.enter()?;
        match &self.inner {
            #[cfg(unix)]
            PipeStreamInner::Unix(stream) => (&**stream).read(buf),
            #[cfg(windows)]
            PipeStreamInner::Windows(file) => (&**file).read(buf),
        }
    }
}

impl Write for PipeStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let _io = self.gate.enter()?;
        match &self.inner {
            #[cfg(unix)]
            PipeStreamInner::Unix(stream) => (&**stream).write(buf),
            #[cfg(windows)]
            PipeStreamInner::Windows(file) => (&**file).write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let _io = self.gate.enter()?;
        match &self.inner {
            #[cfg(unix)]
            PipeStreamInner::Unix(stream) => (&**stream).flush(),
            #[cfg(windows)]
            PipeStreamInner::Windows(file) => (&**file).flush(),
        }
    }
}

impl PipeStream {
    /// Create a PipeStream from a Unix domain socket stream.
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: PipeStreamInner::Unix(Arc::new(stream)),
            gate: Arc::default(),
        }
    }

    /// Create a PipeStream from an open named pipe handle.
    #[cfg(windows)]
    pub(crate) fn from_file(file: std::fs::File) -> Self {
        Self {
            inner: PipeStreamInner::Windows(Arc::new(file)),
            gate: Arc::default(),
        }
    }

    /// A handle that can unblock reads and writes on this stream from
    /// another thread.
    pub fn abort_handle(&self) -> AbortHandle {
        let gate = Arc::clone(&self.gate);
        match &self.inner {
            #[cfg(unix)]
            PipeStreamInner::Unix(stream) => {
                let stream = Arc::clone(stream);
                AbortHandle::new(move || {
                    gate.abort();
                    let _ = stream.shutdown(std::net::Shutdown::Both);
                })
            }
            #[cfg(windows)]
            PipeStreamInner::Windows(file) => {
                let file = Arc::clone(file);
                AbortHandle::new(move || {
                    gate.abort();
                    // CancelIoEx misses a call that has not reached the
                    // kernel yet; retry until the call is cancelled or done.
                    while gate.in_flight() {
                        if crate::windows::cancel_io(&file) {
                            break;
                        }
                        std::thread::sleep(std::time::Duration::from_millis(1));
                    }
                })
            }
        }
    }
}

impl std::fmt::Debug for PipeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            #[cfg(unix)]
            PipeStreamInner::Unix(_) => f.debug_struct("PipeStream").field("type", &"unix").finish(),
            #[cfg(windows)]
            PipeStreamInner::Windows(_) => f
                .debug_struct("PipeStream")
                .field("type", &"named-pipe")
                .finish(),
        }
    }
}

/// Unblocks in-flight reads and writes on a connection from another thread.
///
/// Aborting is idempotent. After an abort every blocked or subsequent call on
/// the connection fails with `TransportError::Closed`.
#[derive(Clone)]
pub struct AbortHandle {
    abort: Arc<dyn Fn() + Send + Sync>,
}

impl AbortHandle {
    /// Build a handle around an abort action.
    pub fn new(abort: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            abort: Arc::new(abort),
        }
    }

    /// A handle that does nothing, for streams that never block.
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Abort any in-flight blocking call.
    pub fn abort(&self) {
        (self.abort)();
    }
}

impl std::fmt::Debug for AbortHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbortHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn abort_handle_clones_share_action() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let handle = AbortHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let clone = handle.clone();
        handle.abort();
        clone.abort();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[cfg(unix)]
    #[test]
    fn abort_unblocks_pending_read() {
        let (left, _right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut stream = PipeStream::from_unix(left);
        let abort = stream.abort_handle();

        let reader = std::thread::spawn(move || {
            let mut buf = [0u8; 4];
            stream.read(&mut buf)
        });

        std::thread::sleep(std::time::Duration::from_millis(50));
        abort.abort();

        let result = reader.join().unwrap();
        assert!(matches!(result, Ok(0) | Err(_)));
    }

    #[cfg(unix)]
    #[test]
    fn abort_sticks_for_later_calls() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut stream = PipeStream::from_unix(left);
        let mut peer = PipeStream::from_unix(right);
        peer.write_all(&[1, 2, 3, 4]).unwrap();

        stream.abort_handle().abort();

        // Data already buffered is not handed out after an abort.
        let mut buf = [0u8; 4];
        let err = stream.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionAborted);
        let err = stream.write(&buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionAborted);
    }

    #[test]
    fn gate_tracks_calls_in_flight() {
        let gate = AbortGate::default();
        {
            let _io = gate.enter().unwrap();
            assert!(gate.in_flight());
        }
        assert!(!gate.in_flight());

        gate.abort();
        assert!(gate.enter().is_err());
        assert!(!gate.in_flight());
    }
}
