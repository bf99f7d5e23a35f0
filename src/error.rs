use std::fmt;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the codec, transport and pipeline.
///
/// The codec is pure: its errors are returned synchronously and nothing is
/// retried. The transport surfaces the first error and closes the socket; it
/// never retries at the packet level.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Raster wrong shape/dtype, empty filename, or payload too large for the
    /// fan's storage.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Transport-layer failure. See [`TransportError`] for the specific kind.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// Caller attempted DATA before NAME, an unknown control command, or a
    /// filename that stays over 99 bytes after truncation.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    /// Underlying socket I/O error not otherwise classified.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Wire data failed to decode/encode.
    #[error("invalid binary data: {0}")]
    Decode(#[from] binrw::Error),
}

/// The three ways a fan transport exchange can fail.
#[derive(Debug)]
pub enum TransportError {
    /// Connection refused or unroutable. At the liveness layer this means
    /// "offline".
    ConnectFailed(std::io::Error),
    /// Deadline exceeded on connect, send, or status read.
    Timeout,
    /// Mid-upload socket error. The upload is not resumable; the caller must
    /// start a new NAME.
    SendFailed(std::io::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::ConnectFailed(e) => write!(f, "connect failed: {e}"),
            TransportError::Timeout => write!(f, "timed out"),
            TransportError::SendFailed(e) => write!(f, "send failed: {e}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::ConnectFailed(e) | TransportError::SendFailed(e) => Some(e),
            TransportError::Timeout => None,
        }
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Error::Transport(TransportError::Timeout)
    }
}
