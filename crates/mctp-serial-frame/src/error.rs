use std::time::Duration;

use mctp_serial_transport::TransportError;

/// Errors that can occur while framing or deframing packets.
///
/// Sync loss and checksum mismatches are not errors: the receiver recovers
/// from them locally and reports them as drops. Only buffer overflows,
/// misuse of the transmit builder and channel failures surface here.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The byte channel failed or was closed.
    #[error("channel failure: {0}")]
    Channel(#[from] TransportError),

    /// An incoming frame would not fit the receive buffer.
    #[error("receive buffer overflow ({len} payload bytes, capacity {capacity})")]
    BufferOverflow { len: usize, capacity: usize },

    /// A received packet has not been taken yet.
    #[error("packet pending (take the ready packet before receiving more)")]
    PacketPending,

    /// Frames must carry at least one payload byte.
    #[error("empty payload")]
    EmptyPayload,

    /// The payload does not fit the one-byte length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The transmit builder was ended with a different amount of data than declared.
    #[error("frame length mismatch (declared {declared} bytes, wrote {written})")]
    LengthMismatch { declared: usize, written: usize },

    /// No packet arrived within the allotted time.
    #[error("timed out after {0:?} waiting for a packet")]
    Timeout(Duration),
}

impl FrameError {
    /// Returns true if the link is unusable after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FrameError::Channel(_))
    }
}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        FrameError::Channel(TransportError::Io(err))
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
