use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::name::PipeName;
use crate::stream::PipeStream;

/// Controller end of the pipe on Unix, backed by a Unix domain socket.
///
/// The socket file is created at the pipe's address and removed again on
/// `Drop`, as long as the path still refers to the socket this listener
/// created.
pub struct PipeListener {
    listener: UnixListener,
    path: PathBuf,
    created_inode: Option<(u64, u64)>,
}

impl PipeListener {
    /// Default permission mode for created socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;
    /// Maximum socket path length.
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind and listen on the pipe's socket path.
    ///
    /// If the file already exists and is a socket, it is removed first
    /// (stale socket from a previous controller run).
    pub fn bind(name: &PipeName) -> Result<Self> {
        let path = name.address();
        let bind_err = |source: std::io::Error| TransportError::Bind {
            name: name.to_string(),
            source,
        };

        let path_bytes = path.as_os_str().len();
        if path_bytes >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len: path_bytes,
                max: Self::MAX_PATH_LEN,
            });
        }

        // Never remove anything that is not a socket.
        if path.exists() {
            let metadata = std::fs::symlink_metadata(&path).map_err(bind_err)?;
            if !metadata.file_type().is_socket() {
                return Err(bind_err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "existing path is not a unix socket",
                )));
            }
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(bind_err)?;
        }

        let listener = UnixListener::bind(&path).map_err(bind_err)?;
        std::fs::set_permissions(
            &path,
            std::fs::Permissions::from_mode(Self::DEFAULT_SOCKET_MODE),
        )
        .map_err(bind_err)?;
        let created = std::fs::symlink_metadata(&path).map_err(bind_err)?;

        info!(?path, "controller pipe listening");

        Ok(Self {
            listener,
            path,
            created_inode: Some((created.dev(), created.ino())),
        })
    }

    /// Accept the next panel connection (blocking).
    pub fn accept(&self) -> Result<PipeStream> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(path = ?self.path, "accepted panel connection");
        Ok(PipeStream::from_unix(stream))
    }

    /// The socket path this listener is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PipeListener {
    fn drop(&mut self) {
        let Some((expected_dev, expected_ino)) = self.created_inode else {
            return;
        };
        if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
            if metadata.file_type().is_socket()
                && metadata.dev() == expected_dev
                && metadata.ino() == expected_ino
            {
                debug!(path = ?self.path, "cleaning up socket file");
                let _ = std::fs::remove_file(&self.path);
            } else {
                debug!(path = ?self.path, "socket path identity changed; skipping cleanup");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ucncio-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn bind_accept_connect() {
        let dir = temp_dir("uds");
        let sock_path = dir.join("board.sock");
        let name = PipeName::from_path(&sock_path);

        let listener = PipeListener::bind(&name).unwrap();
        assert!(sock_path.exists());

        let client_path = sock_path.clone();
        let handle = std::thread::spawn(move || {
            let mut client = std::os::unix::net::UnixStream::connect(&client_path).unwrap();
            client.write_all(&[0xA5; 40]).unwrap();
        });

        let mut server = listener.accept().unwrap();
        let mut buf = [0u8; 40];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [0xA5; 40]);

        handle.join().unwrap();

        drop(listener);
        assert!(
            !sock_path.exists(),
            "socket file should be cleaned up on drop"
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn path_too_long() {
        let long_path = "/tmp/".to_string() + &"a".repeat(200) + ".sock";
        let result = PipeListener::bind(&PipeName::from_path(long_path));
        assert!(matches!(result, Err(TransportError::PathTooLong { .. })));
    }

    #[test]
    fn bind_default_permissions_hardened() {
        let dir = temp_dir("uds-perms");
        let sock_path = dir.join("perm.sock");

        let listener = PipeListener::bind(&PipeName::from_path(&sock_path)).unwrap();
        let mode = std::fs::metadata(&sock_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        drop(listener);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bind_replaces_stale_socket() {
        let dir = temp_dir("uds-stale");
        let sock_path = dir.join("stale.sock");
        let name = PipeName::from_path(&sock_path);

        let first = PipeListener::bind(&name).unwrap();
        // Simulate a crashed controller: the file outlives the listener.
        std::mem::forget(first);

        let second = PipeListener::bind(&name);
        assert!(second.is_ok());

        drop(second);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bind_rejects_existing_non_socket_file() {
        let dir = temp_dir("uds-file");
        let sock_path = dir.join("not-a-socket.sock");
        std::fs::write(&sock_path, b"regular-file").unwrap();

        let result = PipeListener::bind(&PipeName::from_path(&sock_path));
        assert!(matches!(result, Err(TransportError::Bind { .. })));

        let _ = std::fs::remove_file(&sock_path);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
