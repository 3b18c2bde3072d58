use std::io::{ErrorKind, Read, Write};

use tracing::trace;

use crate::error::{Result, TransportError};

/// A byte-oriented link: non-blocking source, blocking sink.
///
/// `read_byte` must never block waiting for data. It returns `Ok(None)` when
/// nothing is available yet and an error only when the channel is broken or
/// closed, so callers can tell a quiet line from a dead one.
pub trait ByteChannel {
    /// Read one byte if one is available.
    fn read_byte(&mut self) -> Result<Option<u8>>;

    /// Write one byte (may block until the sink accepts it).
    fn write_byte(&mut self, byte: u8) -> Result<()>;

    /// Write a run of bytes.
    fn write_buffer(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            self.write_byte(byte)?;
        }
        Ok(())
    }

    /// Flush anything buffered on the sink side.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<C: ByteChannel + ?Sized> ByteChannel for &mut C {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        (**self).write_byte(byte)
    }

    fn write_buffer(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_buffer(bytes)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

impl<C: ByteChannel + ?Sized> ByteChannel for Box<C> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        (**self).write_byte(byte)
    }

    fn write_buffer(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_buffer(bytes)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Adapts any `Read + Write` stream into a [`ByteChannel`].
///
/// The stream should be non-blocking or carry a short read timeout:
/// `WouldBlock` and `TimedOut` both map to "no data yet". A zero-length read
/// is end-of-stream and reported as [`TransportError::Closed`]. Writes and
/// flushes retry on the same kinds until the sink accepts every byte.
pub struct IoChannel<T> {
    inner: T,
}

impl<T: Read + Write> IoChannel<T> {
    /// Wrap a stream.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the channel and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Write> ByteChannel for IoChannel<T> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(_) => {
                    trace!(byte = byte[0], "rx byte");
                    return Ok(Some(byte[0]));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    return Ok(None)
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write_buffer(&[byte])
    }

    fn write_buffer(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if sink_busy(err.kind()) => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        trace!(len = bytes.len(), "tx bytes");
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if sink_busy(err.kind()) => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

/// Sink errors retried instead of abandoning a partly written buffer.
fn sink_busy(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
    )
}

impl<T> std::fmt::Debug for IoChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoChannel")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}
