use std::fmt;
use std::path::{Path, PathBuf};

/// Well-known pipe name shared with the controller process.
pub const DEFAULT_PIPE_NAME: &str = "ucncio";

/// Identifies the local pipe both endpoints rendezvous on.
///
/// A bare name maps to `\\.\pipe\<name>` on Windows and to
/// `<temp_dir>/<name>.sock` on Unix. An explicit path bypasses that mapping,
/// which is what tests use to keep sockets isolated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeName {
    kind: NameKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameKind {
    Named(String),
    Path(PathBuf),
}

impl PipeName {
    /// A pipe identified by its well-known name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            kind: NameKind::Named(name.into()),
        }
    }

    /// A pipe at an explicit platform address (socket path or `\\.\pipe\...`).
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            kind: NameKind::Path(path.as_ref().to_path_buf()),
        }
    }

    /// Parse user input: anything containing a path separator is an address,
    /// everything else is a name.
    pub fn parse(input: &str) -> Self {
        if input.contains('/') || input.contains('\\') {
            Self::from_path(input)
        } else {
            Self::new(input)
        }
    }

    /// The platform address this name resolves to.
    pub fn address(&self) -> PathBuf {
        match &self.kind {
            NameKind::Path(path) => path.clone(),
            NameKind::Named(name) => Self::named_address(name),
        }
    }

    #[cfg(windows)]
    fn named_address(name: &str) -> PathBuf {
        PathBuf::from(format!(r"\\.\pipe\{name}"))
    }

    #[cfg(not(windows))]
    fn named_address(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{name}.sock"))
    }
}

impl Default for PipeName {
    fn default() -> Self {
        Self::new(DEFAULT_PIPE_NAME)
    }
}

impl fmt::Display for PipeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address().display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_name_is_well_known() {
        assert_eq!(PipeName::default(), PipeName::new("ucncio"));
    }

    #[cfg(unix)]
    #[test]
    fn named_pipe_maps_into_temp_dir() {
        let addr = PipeName::new("ucncio").address();
        assert_eq!(addr, std::env::temp_dir().join("ucncio.sock"));
    }

    #[cfg(windows)]
    #[test]
    fn named_pipe_maps_into_pipe_namespace() {
        let addr = PipeName::new("ucncio").address();
        assert_eq!(addr, PathBuf::from(r"\\.\pipe\ucncio"));
    }

    #[test]
    fn parse_distinguishes_paths_from_names() {
        assert_eq!(PipeName::parse("board"), PipeName::new("board"));
        assert_eq!(
            PipeName::parse("/tmp/board.sock"),
            PipeName::from_path("/tmp/board.sock")
        );
        assert_eq!(
            PipeName::from_path("/tmp/board.sock").address(),
            PathBuf::from("/tmp/board.sock")
        );
    }
}
