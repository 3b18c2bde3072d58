use std::path::{Path, PathBuf};
use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{ByteChannel, IoChannel};

/// Default line rate for MCTP serial links.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Port timeout. An expired read is "no byte yet"; an expired write is retried.
const POLL_TIMEOUT: Duration = Duration::from_millis(1);

/// A physical UART opened through `serialport`, configured 8N1.
pub struct SerialChannel {
    inner: IoChannel<Box<dyn SerialPort>>,
    path: PathBuf,
}

impl SerialChannel {
    /// Open `path` at the default baud rate.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_baud(path, DEFAULT_BAUD_RATE)
    }

    /// Open `path` at an explicit baud rate.
    pub fn open_with_baud(path: impl AsRef<Path>, baud_rate: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let port = serialport::new(path.to_string_lossy(), baud_rate)
            .timeout(POLL_TIMEOUT)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e.into(),
            })?;

        if let Err(err) = port.clear(serialport::ClearBuffer::All) {
            debug!(?path, %err, "could not purge serial buffers");
        }

        info!(?path, baud_rate, "opened serial port");
        Ok(Self {
            inner: IoChannel::new(port),
            path,
        })
    }

    /// The device path this channel was opened on.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteChannel for SerialChannel {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        self.inner.read_byte()
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.inner.write_byte(byte)
    }

    fn write_buffer(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_buffer(bytes)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}

impl std::fmt::Debug for SerialChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialChannel")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_missing_device_reports_path() {
        let missing = "/dev/mctp-serial-does-not-exist";
        let err = SerialChannel::open(missing).unwrap_err();
        match err {
            TransportError::Open { path, .. } => assert_eq!(path, PathBuf::from(missing)),
            other => panic!("unexpected error: {other}"),
        }
    }
}
