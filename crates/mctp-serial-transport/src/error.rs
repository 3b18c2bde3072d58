use std::path::PathBuf;

/// Errors that can occur on a byte channel.
///
/// Every variant is fatal for the link: "no data yet" is never an error, it
/// is `Ok(None)` from [`crate::ByteChannel::read_byte`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the specified device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on the channel.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the channel or the device went away.
    #[error("channel closed")]
    Closed,
}

impl TransportError {
    /// Returns true if this error means the channel is gone for good.
    pub fn is_disconnect(&self) -> bool {
        match self {
            TransportError::Closed => true,
            TransportError::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::NotConnected
            ),
            TransportError::Open { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
