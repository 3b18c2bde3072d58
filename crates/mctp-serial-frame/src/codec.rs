use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::warn;

use crate::error::{FrameError, Result};
use crate::fcs;
use crate::receiver::{Receiver, RxOutcome};
use crate::stats::RxStats;
use crate::wire::{self, ESCAPE, MAX_PAYLOAD, SERIAL_REVISION, SYNC, TRANSPORT_HEADER};

/// Default idle timeout before an unfinished frame is abandoned.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for a link's framing layer.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Receive buffer capacity in payload bytes. Default: [`MAX_PAYLOAD`].
    pub buffer_capacity: usize,
    /// Abandon a partial frame after this long without a byte. `None` waits forever.
    pub idle_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: MAX_PAYLOAD,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
        }
    }
}

/// Check that a payload can be described by the one-byte count field.
pub fn validate_payload_len(len: usize) -> Result<()> {
    if len == 0 {
        return Err(FrameError::EmptyPayload);
    }
    if len > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: MAX_PAYLOAD,
        });
    }
    Ok(())
}

/// Write the opening sync and fixed header, returning the seeded running FCS.
pub(crate) fn put_header(payload_len: usize, dst: &mut BytesMut) -> u16 {
    let header = [
        SYNC,
        SERIAL_REVISION,
        wire::byte_count(payload_len) as u8,
        TRANSPORT_HEADER[0],
        TRANSPORT_HEADER[1],
        TRANSPORT_HEADER[2],
        TRANSPORT_HEADER[3],
    ];
    dst.put_slice(&header);
    fcs::update(fcs::FCS_INIT, &header)
}

/// Byte-stuff `bytes` into `dst`, folding the unstuffed bytes into `running`.
pub(crate) fn put_stuffed(bytes: &[u8], running: u16, dst: &mut BytesMut) -> u16 {
    let mut running = running;
    for &byte in bytes {
        if wire::needs_escape(byte) {
            dst.put_u8(ESCAPE);
            dst.put_u8(wire::escape(byte));
        } else {
            dst.put_u8(byte);
        }
        running = fcs::update_byte(running, byte);
    }
    running
}

/// Write the FCS (big-endian) and the closing sync.
pub(crate) fn put_trailer(running: u16, dst: &mut BytesMut) {
    dst.put_u16(running);
    dst.put_u8(SYNC);
}

/// Number of wire bytes `payload` occupies once framed.
pub fn encoded_len(payload: &[u8]) -> usize {
    let escapes = payload.iter().filter(|&&b| wire::needs_escape(b)).count();
    wire::FRAME_OVERHEAD + payload.len() + escapes
}

/// Encode a payload into a complete wire frame.
///
/// Returns the FCS that was written. The payload must be 1..=[`MAX_PAYLOAD`]
/// bytes long.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<u16> {
    validate_payload_len(payload.len())?;
    dst.reserve(encoded_len(payload));

    let running = put_header(payload.len(), dst);
    let running = put_stuffed(payload, running, dst);
    put_trailer(running, dst);
    Ok(running)
}

/// Result of decoding a captured byte stream.
#[derive(Debug, Default)]
pub struct DecodeReport {
    /// Packets in arrival order.
    pub packets: Vec<Bytes>,
    /// Counters accumulated while decoding.
    pub stats: RxStats,
}

/// Run a captured byte stream through a fresh receiver.
///
/// Every packet is taken as soon as it is ready. Overflowing frames are
/// counted and skipped. No idle timeout applies to an offline capture.
pub fn decode_frames(wire: &[u8], config: &FrameConfig) -> DecodeReport {
    let config = FrameConfig {
        idle_timeout: None,
        ..config.clone()
    };
    let mut receiver = Receiver::new(&config);
    let mut packets = Vec::new();

    for &byte in wire {
        match receiver.push_byte(byte) {
            Ok(RxOutcome::PacketReady) => packets.extend(receiver.take_packet()),
            Ok(_) => {}
            Err(err) => warn!(%err, "skipping frame"),
        }
    }

    DecodeReport {
        packets,
        stats: *receiver.stats(),
    }
}
