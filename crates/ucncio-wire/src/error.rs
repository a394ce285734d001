/// Errors that can occur while decoding a pin record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// The buffer is not exactly one record long.
    #[error("malformed pin record ({len} bytes, expected {expected})")]
    MalformedRecord { len: usize, expected: usize },
}

pub type Result<T> = std::result::Result<T, WireError>;
