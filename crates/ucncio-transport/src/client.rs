use std::io::ErrorKind;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::connection::{Connection, Connector};
use crate::error::{Result, TransportError};
use crate::name::PipeName;
use crate::stream::PipeStream;

/// Default wait before a connect attempt is abandoned.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Delay between attempts while the counterpart has not created the pipe yet.
const RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Client end of the pipe: the panel side that dials the controller.
#[derive(Debug, Clone, Default)]
pub struct PipeClient {
    name: PipeName,
}

impl PipeClient {
    pub fn new(name: PipeName) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &PipeName {
        &self.name
    }

    /// Open the pipe, waiting up to `timeout` for a counterpart to accept.
    ///
    /// "Peer absent" conditions (no such pipe, refused, all instances busy)
    /// are retried until the deadline and then reported as
    /// `TransportError::ConnectTimeout`. Anything else fails immediately with
    /// `TransportError::Connect`.
    pub fn connect_stream(name: &PipeName, timeout: Duration) -> Result<PipeStream> {
        let deadline = Instant::now() + timeout;
        loop {
            match open(name, deadline) {
                Ok(stream) => {
                    debug!(pipe = %name, "connected to pipe");
                    return Ok(stream);
                }
                Err(err) if is_peer_absent(&err) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(TransportError::ConnectTimeout {
                            name: name.to_string(),
                            timeout,
                        });
                    }
                    trace!(pipe = %name, error = %err, "peer not ready, retrying");
                    std::thread::sleep(RETRY_INTERVAL.min(deadline - now));
                }
                Err(err) => {
                    return Err(TransportError::Connect {
                        name: name.to_string(),
                        source: err,
                    })
                }
            }
        }
    }
}

impl Connector for PipeClient {
    type Stream = PipeStream;

    fn connect(&mut self, timeout: Duration) -> Result<Connection<PipeStream>> {
        let stream = Self::connect_stream(&self.name, timeout)?;
        let abort = stream.abort_handle();
        Ok(Connection::new(stream, abort))
    }
}

#[cfg(unix)]
fn open(name: &PipeName, _deadline: Instant) -> std::io::Result<PipeStream> {
    let stream = std::os::unix::net::UnixStream::connect(name.address())?;
    Ok(PipeStream::from_unix(stream))
}

#[cfg(windows)]
fn open(name: &PipeName, deadline: Instant) -> std::io::Result<PipeStream> {
    crate::windows::open_client(&name.address(), deadline)
}

fn is_peer_absent(err: &std::io::Error) -> bool {
    if matches!(
        err.kind(),
        ErrorKind::NotFound | ErrorKind::ConnectionRefused | ErrorKind::TimedOut
    ) {
        return true;
    }
    #[cfg(windows)]
    {
        crate::windows::is_pipe_busy(err)
    }
    #[cfg(not(windows))]
    {
        false
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::uds::PipeListener;

    fn unique_pipe(tag: &str) -> PipeName {
        PipeName::from_path(std::env::temp_dir().join(format!(
            "ucncio-client-{tag}-{}-{}.sock",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        )))
    }

    #[test]
    fn missing_pipe_times_out() {
        let name = unique_pipe("missing");
        let start = Instant::now();
        let err = PipeClient::connect_stream(&name, Duration::from_millis(100)).unwrap_err();

        assert!(matches!(err, TransportError::ConnectTimeout { .. }));
        assert!(err.is_connect_failure());
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn connects_once_listener_appears() {
        let name = unique_pipe("late");
        let server_name = name.clone();

        let server = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            let listener = PipeListener::bind(&server_name).unwrap();
            let mut stream = listener.accept().unwrap();
            stream.write_all(b"ping").unwrap();
            stream.flush().unwrap();
        });

        let mut client = PipeClient::new(name);
        let mut conn = client.connect(Duration::from_secs(2)).unwrap();
        let mut buf = [0u8; 4];
        conn.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");

        server.join().unwrap();
    }

    #[test]
    fn connect_to_non_socket_fails() {
        let path = std::env::temp_dir().join(format!(
            "ucncio-client-file-{}.txt",
            std::process::id()
        ));
        std::fs::write(&path, b"not a socket").unwrap();

        let err = PipeClient::connect_stream(&PipeName::from_path(&path), Duration::from_millis(50))
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::Connect { .. } | TransportError::ConnectTimeout { .. }
        ));
        let _ = std::fs::remove_file(&path);
    }
}
