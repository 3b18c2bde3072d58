use bytes::BytesMut;
use mctp_serial_transport::ByteChannel;
use tracing::{debug, trace};

use crate::codec::{put_header, put_stuffed, put_trailer, validate_payload_len};
use crate::error::{FrameError, Result};
use crate::wire::SYNC;

/// Streams one frame onto a byte channel: `start → data* → end`.
///
/// The payload length is declared up front because it travels in the header.
/// Once `start` has put a sync byte on the wire the peer's receiver is
/// mid-frame, so a `Framer` always finishes the frame it started: if it is
/// dropped before [`end`](Self::end), or `end` finds the wrong amount of
/// data, a bare sync byte is written instead of an FCS. The receiver sees a
/// sync inside the body and resynchronizes.
///
/// Pass `&mut channel` to keep ownership of the channel.
pub struct Framer<C: ByteChannel> {
    sink: C,
    scratch: BytesMut,
    fcs: u16,
    declared: usize,
    written: usize,
    finished: bool,
}

impl<C: ByteChannel> Framer<C> {
    /// Write the opening sync and header for a `payload_len`-byte frame.
    pub fn start(mut sink: C, payload_len: usize) -> Result<Self> {
        validate_payload_len(payload_len)?;

        let mut scratch = BytesMut::with_capacity(16);
        let fcs = put_header(payload_len, &mut scratch);
        sink.write_buffer(&scratch)?;
        trace!(payload_len, "frame started");

        Ok(Self {
            sink,
            scratch,
            fcs,
            declared: payload_len,
            written: 0,
            finished: false,
        })
    }

    /// Write payload bytes, byte-stuffing reserved values.
    ///
    /// Writing more than the declared length is refused before anything
    /// reaches the wire.
    pub fn data(&mut self, bytes: &[u8]) -> Result<()> {
        let total = self.written + bytes.len();
        if total > self.declared {
            return Err(FrameError::LengthMismatch {
                declared: self.declared,
                written: total,
            });
        }

        self.scratch.clear();
        self.fcs = put_stuffed(bytes, self.fcs, &mut self.scratch);
        self.sink.write_buffer(&self.scratch)?;
        self.written = total;
        Ok(())
    }

    /// Write the FCS and closing sync, returning the FCS.
    pub fn end(mut self) -> Result<u16> {
        self.finished = true;
        if self.written != self.declared {
            debug!(
                declared = self.declared,
                written = self.written,
                "short frame, aborting"
            );
            self.sink.write_byte(SYNC)?;
            self.sink.flush()?;
            return Err(FrameError::LengthMismatch {
                declared: self.declared,
                written: self.written,
            });
        }

        self.scratch.clear();
        put_trailer(self.fcs, &mut self.scratch);
        self.sink.write_buffer(&self.scratch)?;
        self.sink.flush()?;
        trace!(fcs = self.fcs, "frame ended");
        Ok(self.fcs)
    }

    /// Abandon the frame, invalidating it on the wire.
    pub fn abort(mut self) -> Result<()> {
        self.finished = true;
        self.sink.write_byte(SYNC)?;
        self.sink.flush()?;
        Ok(())
    }

    /// Running FCS over everything written so far.
    pub fn fcs(&self) -> u16 {
        self.fcs
    }

    /// Payload bytes still owed before `end`.
    pub fn remaining(&self) -> usize {
        self.declared - self.written
    }
}

impl<C: ByteChannel> Drop for Framer<C> {
    fn drop(&mut self) {
        if !self.finished {
            debug!("framer dropped mid-frame, aborting");
            let _ = self.sink.write_byte(SYNC);
            let _ = self.sink.flush();
        }
    }
}
