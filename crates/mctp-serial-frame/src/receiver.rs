use std::time::{Duration, Instant};

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::codec::FrameConfig;
use crate::error::{FrameError, Result};
use crate::fcs;
use crate::stats::RxStats;
use crate::wire::{
    self, DEST_EID, ESCAPE, FLAGS_SINGLE_PACKET, HEADER_BYTES_COUNTED, MCTP_VERSION,
    SERIAL_REVISION, SOURCE_EID, SYNC,
};

/// Receive state machine states, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxState {
    WaitingForSync,
    GettingRevision,
    ByteCount,
    Version,
    DestId,
    SourceId,
    Flags,
    Body,
    Escape,
    FcsHigh,
    FcsLow,
    EndSync,
}

/// Why a frame in progress was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// A fixed header field or the closing sync had the wrong value.
    SyncLoss,
    /// A sync byte appeared inside the frame body.
    UnexpectedSync,
    /// An escape byte was followed by a byte that is not an escaped form.
    BadEscape,
    /// The recomputed FCS did not match the wire FCS.
    ChecksumMismatch,
    /// The line went quiet in the middle of a frame.
    IdleTimeout,
}

/// What a single byte did to the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxOutcome {
    /// The byte was absorbed; no frame boundary was reached.
    Consumed,
    /// The byte completed a valid frame. Take it with [`Receiver::take_packet`].
    PacketReady,
    /// The byte caused the frame in progress to be discarded.
    Dropped(DropReason),
}

/// Resumable MCTP serial receive state machine.
///
/// Consumes exactly one byte per [`push_byte`](Self::push_byte) call and
/// carries its state across calls, so it can be driven from a polling loop,
/// a codec, or an offline capture. Protocol errors are recovered locally by
/// returning to [`RxState::WaitingForSync`]; the offending byte is consumed,
/// never replayed as a sync candidate. Consecutive sync bytes share one
/// flag, so a frame that directly follows a rejected one is still found.
///
/// A completed packet stays in the buffer until taken. While it is pending
/// the receiver refuses further input with [`FrameError::PacketPending`].
#[derive(Debug)]
pub struct Receiver {
    state: RxState,
    buf: BytesMut,
    capacity: usize,
    remaining: usize,
    fcs: u16,
    wire_fcs: u16,
    ready: bool,
    idle_timeout: Option<Duration>,
    last_activity: Option<Instant>,
    stats: RxStats,
}

impl Receiver {
    /// Create a receiver sized and timed by `config`.
    pub fn new(config: &FrameConfig) -> Self {
        Self {
            state: RxState::WaitingForSync,
            buf: BytesMut::with_capacity(config.buffer_capacity),
            capacity: config.buffer_capacity,
            remaining: 0,
            fcs: fcs::FCS_INIT,
            wire_fcs: 0,
            ready: false,
            idle_timeout: config.idle_timeout,
            last_activity: None,
            stats: RxStats::default(),
        }
    }

    /// Current state.
    pub fn state(&self) -> RxState {
        self.state
    }

    /// Receive buffer capacity in payload bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Counters accumulated since creation.
    pub fn stats(&self) -> &RxStats {
        &self.stats
    }

    /// True once a valid frame has been received and not yet taken.
    pub fn is_packet_ready(&self) -> bool {
        self.ready
    }

    /// Borrow the ready packet without consuming it.
    pub fn packet(&self) -> Option<&[u8]> {
        self.ready.then_some(self.buf.as_ref())
    }

    /// Take the ready packet and clear the ready flag.
    pub fn take_packet(&mut self) -> Option<Bytes> {
        if !self.ready {
            return None;
        }
        self.ready = false;
        Some(self.buf.split().freeze())
    }

    /// Feed one byte, timestamped now.
    pub fn push_byte(&mut self, byte: u8) -> Result<RxOutcome> {
        self.push_byte_at(byte, Instant::now())
    }

    /// Feed one byte that arrived at `now`.
    pub fn push_byte_at(&mut self, byte: u8, now: Instant) -> Result<RxOutcome> {
        if self.ready {
            return Err(FrameError::PacketPending);
        }
        self.stats.bytes += 1;
        self.last_activity = Some(now);
        trace!(state = ?self.state, byte, "rx");

        match self.state {
            RxState::WaitingForSync => {
                if byte == SYNC {
                    self.fcs = fcs::update_byte(fcs::FCS_INIT, byte);
                    self.state = RxState::GettingRevision;
                }
                Ok(RxOutcome::Consumed)
            }
            RxState::GettingRevision if byte == SYNC => {
                // Back-to-back flags: the previous frame's closing sync was
                // taken as an opener, so this one starts the real frame.
                self.fcs = fcs::update_byte(fcs::FCS_INIT, byte);
                Ok(RxOutcome::Consumed)
            }
            RxState::GettingRevision => {
                self.expect_field(byte, SERIAL_REVISION, RxState::ByteCount)
            }
            RxState::ByteCount => self.begin_body(byte),
            RxState::Version => self.expect_field(byte, MCTP_VERSION, RxState::DestId),
            RxState::DestId => self.expect_field(byte, DEST_EID, RxState::SourceId),
            RxState::SourceId => self.expect_field(byte, SOURCE_EID, RxState::Flags),
            RxState::Flags => self.expect_field(byte, FLAGS_SINGLE_PACKET, RxState::Body),
            RxState::Body => match byte {
                ESCAPE => {
                    self.state = RxState::Escape;
                    Ok(RxOutcome::Consumed)
                }
                SYNC => Ok(self.drop_frame(DropReason::UnexpectedSync, byte)),
                _ => self.store(byte),
            },
            RxState::Escape => match wire::unescape(byte) {
                Some(original) => self.store(original),
                None => Ok(self.drop_frame(DropReason::BadEscape, byte)),
            },
            RxState::FcsHigh => {
                self.wire_fcs = u16::from(byte) << 8;
                self.state = RxState::FcsLow;
                Ok(RxOutcome::Consumed)
            }
            RxState::FcsLow => {
                self.wire_fcs |= u16::from(byte);
                self.state = RxState::EndSync;
                Ok(RxOutcome::Consumed)
            }
            RxState::EndSync => {
                if byte != SYNC {
                    return Ok(self.drop_frame(DropReason::SyncLoss, byte));
                }
                if self.fcs != self.wire_fcs {
                    debug!(
                        computed = format_args!("{:#06x}", self.fcs),
                        wire = format_args!("{:#06x}", self.wire_fcs),
                        "fcs mismatch"
                    );
                    return Ok(self.drop_frame(DropReason::ChecksumMismatch, byte));
                }
                self.state = RxState::WaitingForSync;
                self.last_activity = None;
                self.ready = true;
                self.stats.frames += 1;
                debug!(len = self.buf.len(), "packet ready");
                Ok(RxOutcome::PacketReady)
            }
        }
    }

    /// Abandon a frame that has been idle for longer than the idle timeout.
    ///
    /// Returns true if a frame was abandoned.
    pub fn expire(&mut self, now: Instant) -> bool {
        let (Some(timeout), Some(last)) = (self.idle_timeout, self.last_activity) else {
            return false;
        };
        if self.ready || self.state == RxState::WaitingForSync {
            return false;
        }
        if now.saturating_duration_since(last) < timeout {
            return false;
        }
        debug!(state = ?self.state, ?timeout, "abandoning idle frame");
        self.stats.idle_timeouts += 1;
        self.abort_frame();
        true
    }

    /// Discard any frame in progress and any unconsumed packet.
    pub fn reset(&mut self) {
        self.ready = false;
        self.abort_frame();
    }

    fn expect_field(&mut self, byte: u8, expected: u8, next: RxState) -> Result<RxOutcome> {
        if byte != expected {
            return Ok(self.drop_frame(DropReason::SyncLoss, byte));
        }
        self.fcs = fcs::update_byte(self.fcs, byte);
        self.state = next;
        Ok(RxOutcome::Consumed)
    }

    fn begin_body(&mut self, byte: u8) -> Result<RxOutcome> {
        let count = usize::from(byte);
        if count <= HEADER_BYTES_COUNTED {
            return Ok(self.drop_frame(DropReason::SyncLoss, byte));
        }
        let len = count - HEADER_BYTES_COUNTED;
        if len > self.capacity {
            return Err(self.overflow(len));
        }
        self.fcs = fcs::update_byte(self.fcs, byte);
        self.remaining = len;
        self.buf.clear();
        self.buf.reserve(len);
        self.state = RxState::Version;
        Ok(RxOutcome::Consumed)
    }

    fn store(&mut self, byte: u8) -> Result<RxOutcome> {
        if self.buf.len() >= self.capacity || self.remaining == 0 {
            return Err(self.overflow(self.buf.len() + 1));
        }
        self.buf.put_u8(byte);
        self.fcs = fcs::update_byte(self.fcs, byte);
        self.remaining -= 1;
        self.state = if self.remaining == 0 {
            RxState::FcsHigh
        } else {
            RxState::Body
        };
        Ok(RxOutcome::Consumed)
    }

    fn drop_frame(&mut self, reason: DropReason, byte: u8) -> RxOutcome {
        debug!(state = ?self.state, byte, ?reason, "dropping frame");
        match reason {
            DropReason::SyncLoss => self.stats.sync_losses += 1,
            DropReason::UnexpectedSync => self.stats.unexpected_syncs += 1,
            DropReason::BadEscape => self.stats.bad_escapes += 1,
            DropReason::ChecksumMismatch => self.stats.checksum_mismatches += 1,
            DropReason::IdleTimeout => self.stats.idle_timeouts += 1,
        }
        self.abort_frame();
        RxOutcome::Dropped(reason)
    }

    fn overflow(&mut self, len: usize) -> FrameError {
        warn!(len, capacity = self.capacity, "receive buffer overflow");
        self.stats.overflows += 1;
        self.abort_frame();
        FrameError::BufferOverflow {
            len,
            capacity: self.capacity,
        }
    }

    fn abort_frame(&mut self) {
        self.state = RxState::WaitingForSync;
        self.remaining = 0;
        self.wire_fcs = 0;
        self.last_activity = None;
        if !self.ready {
            self.buf.clear();
        }
    }
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new(&FrameConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::encode_frame;

    fn wire(payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(payload, &mut buf).unwrap();
        buf.to_vec()
    }

    fn feed(receiver: &mut Receiver, bytes: &[u8]) -> Vec<RxOutcome> {
        bytes
            .iter()
            .map(|&b| receiver.push_byte(b).unwrap())
            .collect()
    }

    #[test]
    fn minimal_frame_roundtrips() {
        let mut rx = Receiver::default();
        let outcomes = feed(
            &mut rx,
            &[0x7E, 0x01, 0x05, 0x01, 0x00, 0x00, 0xC8, 0x41, 0x13, 0x09, 0x7E],
        );

        assert_eq!(outcomes.last(), Some(&RxOutcome::PacketReady));
        assert!(outcomes[..outcomes.len() - 1]
            .iter()
            .all(|o| *o == RxOutcome::Consumed));
        assert!(rx.is_packet_ready());
        assert_eq!(rx.packet(), Some(&b"A"[..]));
        assert_eq!(rx.take_packet().unwrap().as_ref(), b"A");
        assert!(!rx.is_packet_ready());
        assert_eq!(rx.take_packet(), None);
        assert_eq!(rx.state(), RxState::WaitingForSync);
    }

    #[test]
    fn walks_every_state_in_order() {
        let mut rx = Receiver::default();
        let expected = [
            RxState::GettingRevision,
            RxState::ByteCount,
            RxState::Version,
            RxState::DestId,
            RxState::SourceId,
            RxState::Flags,
            RxState::Body,
            RxState::Body,
            RxState::Body,
            RxState::Escape,
            RxState::Body,
            RxState::FcsHigh,
            RxState::FcsLow,
            RxState::EndSync,
            RxState::WaitingForSync,
        ];
        let frame = wire(b"AB~C");
        assert_eq!(frame.len(), expected.len());
        for (&byte, &state) in frame.iter().zip(expected.iter()) {
            rx.push_byte(byte).unwrap();
            assert_eq!(rx.state(), state);
        }
        assert_eq!(rx.take_packet().unwrap().as_ref(), b"AB~C");
    }

    #[test]
    fn stuffed_sync_and_escape_are_recovered() {
        for payload in [&b"AB~CD"[..], &b"AB}CD"[..], &[0x7E, 0x7D, 0x7E, 0x7D][..]] {
            let mut rx = Receiver::default();
            feed(&mut rx, &wire(payload));
            assert_eq!(rx.take_packet().unwrap().as_ref(), payload);
        }
    }

    #[test]
    fn noise_before_sync_is_ignored() {
        let mut rx = Receiver::default();
        let mut bytes = vec![0x00, 0xFF, 0x01, 0x5E];
        bytes.extend(wire(b"data"));
        feed(&mut rx, &bytes);
        assert_eq!(rx.take_packet().unwrap().as_ref(), b"data");
        assert_eq!(rx.stats().dropped(), 0);
    }

    #[test]
    fn short_byte_count_resyncs_without_buffer_writes() {
        for count in 0..=4u8 {
            let mut rx = Receiver::default();
            feed(&mut rx, &[0x7E, 0x01]);
            let outcome = rx.push_byte(count).unwrap();
            assert_eq!(outcome, RxOutcome::Dropped(DropReason::SyncLoss));
            assert_eq!(rx.state(), RxState::WaitingForSync);
            assert!(rx.buf.is_empty());
        }
    }

    #[test]
    fn each_fixed_field_mismatch_resyncs() {
        let good = wire(b"A");
        // Revision, version, dest, source, flags.
        for index in [1usize, 3, 4, 5, 6] {
            let mut bad = good.clone();
            bad[index] ^= 0x02;

            let mut rx = Receiver::default();
            let outcomes = feed(&mut rx, &bad[..=index]);
            assert_eq!(
                outcomes.last(),
                Some(&RxOutcome::Dropped(DropReason::SyncLoss)),
                "field at offset {index}"
            );
            assert_eq!(rx.state(), RxState::WaitingForSync);

            // The very next valid frame is still detected.
            feed(&mut rx, &good);
            assert_eq!(rx.take_packet().unwrap().as_ref(), b"A");
        }
    }

    #[test]
    fn mismatched_byte_is_not_retried_as_sync() {
        let mut rx = Receiver::default();
        feed(&mut rx, &[0x7E, 0x01, 0x05]);
        assert_eq!(
            rx.push_byte(0x7E).unwrap(),
            RxOutcome::Dropped(DropReason::SyncLoss)
        );
        assert_eq!(rx.state(), RxState::WaitingForSync);
    }

    #[test]
    fn repeated_sync_is_a_shared_flag() {
        let mut rx = Receiver::default();
        let outcomes = feed(&mut rx, &[0x7E, 0x7E, 0x7E]);
        assert!(outcomes.iter().all(|o| *o == RxOutcome::Consumed));
        assert_eq!(rx.state(), RxState::GettingRevision);

        feed(&mut rx, &wire(b"A")[1..]);
        assert_eq!(rx.take_packet().unwrap().as_ref(), b"A");
        assert_eq!(rx.stats().dropped(), 0);
    }

    #[test]
    fn frame_directly_after_rejected_frame_arrives() {
        let good = wire(b"next");
        // Bad flags, bad checksum, short byte count.
        let mut bad_flags = wire(b"A");
        bad_flags[6] = 0xC9;
        let mut bad_fcs = wire(b"A");
        bad_fcs[8] ^= 0x01;
        let short_count = vec![0x7E, 0x01, 0x03, 0x01, 0x00, 0x00, 0xC8, 0x7E];

        for bad in [bad_flags, bad_fcs, short_count] {
            let mut rx = Receiver::default();
            let mut capture = bad.clone();
            capture.extend_from_slice(&good);
            let outcomes = feed(&mut rx, &capture);

            assert_eq!(outcomes.last(), Some(&RxOutcome::PacketReady));
            assert_eq!(rx.take_packet().unwrap().as_ref(), b"next");
            assert_eq!(rx.stats().dropped(), 1);
        }
    }

    #[test]
    fn sync_inside_body_aborts() {
        let mut rx = Receiver::default();
        let frame = wire(b"hello");
        feed(&mut rx, &frame[..9]);
        assert_eq!(
            rx.push_byte(0x7E).unwrap(),
            RxOutcome::Dropped(DropReason::UnexpectedSync)
        );
        assert_eq!(rx.state(), RxState::WaitingForSync);
        assert_eq!(rx.stats().unexpected_syncs, 1);
    }

    #[test]
    fn bad_escape_aborts() {
        let mut rx = Receiver::default();
        feed(&mut rx, &[0x7E, 0x01, 0x06, 0x01, 0x00, 0x00, 0xC8, 0x41, 0x7D]);
        assert_eq!(rx.state(), RxState::Escape);
        assert_eq!(
            rx.push_byte(0x41).unwrap(),
            RxOutcome::Dropped(DropReason::BadEscape)
        );
        assert_eq!(rx.state(), RxState::WaitingForSync);
        assert_eq!(rx.stats().bad_escapes, 1);
    }

    #[test]
    fn corrupted_fcs_is_rejected() {
        let mut frame = wire(b"A");
        let n = frame.len();
        frame[n - 2] ^= 0x01;

        let mut rx = Receiver::default();
        let outcomes = feed(&mut rx, &frame);
        assert_eq!(
            outcomes.last(),
            Some(&RxOutcome::Dropped(DropReason::ChecksumMismatch))
        );
        assert!(!rx.is_packet_ready());
        assert_eq!(rx.stats().checksum_mismatches, 1);
    }

    #[test]
    fn corrupted_payload_is_rejected() {
        let mut frame = wire(b"payload");
        frame[8] ^= 0x10;

        let mut rx = Receiver::default();
        feed(&mut rx, &frame);
        assert!(!rx.is_packet_ready());
        assert_eq!(rx.stats().checksum_mismatches, 1);
    }

    #[test]
    fn missing_closing_sync_is_sync_loss() {
        let mut frame = wire(b"A");
        let n = frame.len();
        frame[n - 1] = 0x00;

        let mut rx = Receiver::default();
        let outcomes = feed(&mut rx, &frame);
        assert_eq!(
            outcomes.last(),
            Some(&RxOutcome::Dropped(DropReason::SyncLoss))
        );
        assert!(!rx.is_packet_ready());
    }

    #[test]
    fn oversized_frame_is_a_reported_overflow() {
        let config = FrameConfig {
            buffer_capacity: 4,
            ..FrameConfig::default()
        };
        let mut rx = Receiver::new(&config);
        feed(&mut rx, &[0x7E, 0x01]);

        let err = rx.push_byte(0x04 + 5).unwrap_err();
        assert!(matches!(
            err,
            FrameError::BufferOverflow {
                len: 5,
                capacity: 4
            }
        ));
        assert!(!err.is_fatal());
        assert_eq!(rx.state(), RxState::WaitingForSync);
        assert_eq!(rx.stats().overflows, 1);

        feed(&mut rx, &wire(b"four"));
        assert_eq!(rx.take_packet().unwrap().as_ref(), b"four");
    }

    #[test]
    fn pending_packet_blocks_further_input() {
        let mut rx = Receiver::default();
        feed(&mut rx, &wire(b"one"));
        assert!(rx.is_packet_ready());

        let err = rx.push_byte(0x7E).unwrap_err();
        assert!(matches!(err, FrameError::PacketPending));
        assert_eq!(rx.packet(), Some(&b"one"[..]));

        assert_eq!(rx.take_packet().unwrap().as_ref(), b"one");
        feed(&mut rx, &wire(b"two"));
        assert_eq!(rx.take_packet().unwrap().as_ref(), b"two");
    }

    #[test]
    fn taken_packet_survives_the_next_frame() {
        let mut rx = Receiver::default();
        feed(&mut rx, &wire(b"first"));
        let first = rx.take_packet().unwrap();
        feed(&mut rx, &wire(b"second"));
        let second = rx.take_packet().unwrap();
        assert_eq!(first.as_ref(), b"first");
        assert_eq!(second.as_ref(), b"second");
    }

    #[test]
    fn idle_frame_expires() {
        let config = FrameConfig {
            idle_timeout: Some(Duration::from_millis(50)),
            ..FrameConfig::default()
        };
        let mut rx = Receiver::new(&config);
        let start = Instant::now();
        let frame = wire(b"late");

        for &byte in &frame[..6] {
            rx.push_byte_at(byte, start).unwrap();
        }
        assert!(!rx.expire(start + Duration::from_millis(10)));
        assert_eq!(rx.state(), RxState::Flags);

        assert!(rx.expire(start + Duration::from_millis(60)));
        assert_eq!(rx.state(), RxState::WaitingForSync);
        assert_eq!(rx.stats().idle_timeouts, 1);

        // Nothing in progress: nothing to expire.
        assert!(!rx.expire(start + Duration::from_secs(10)));
    }

    #[test]
    fn no_idle_timeout_waits_forever() {
        let config = FrameConfig {
            idle_timeout: None,
            ..FrameConfig::default()
        };
        let mut rx = Receiver::new(&config);
        let start = Instant::now();
        rx.push_byte_at(0x7E, start).unwrap();
        assert!(!rx.expire(start + Duration::from_secs(3600)));
        assert_eq!(rx.state(), RxState::GettingRevision);
    }

    #[test]
    fn reset_discards_everything() {
        let mut rx = Receiver::default();
        feed(&mut rx, &wire(b"x"));
        assert!(rx.is_packet_ready());
        rx.reset();
        assert!(!rx.is_packet_ready());
        assert_eq!(rx.take_packet(), None);
        assert_eq!(rx.state(), RxState::WaitingForSync);
    }

    #[test]
    fn frames_back_to_back_all_arrive() {
        let mut rx = Receiver::default();
        let mut got = Vec::new();
        for payload in [&b"a"[..], &b"~~"[..], &b"}"[..], &b"last one"[..]] {
            for byte in wire(payload) {
                if rx.push_byte(byte).unwrap() == RxOutcome::PacketReady {
                    got.push(rx.take_packet().unwrap());
                }
            }
        }
        assert_eq!(got.len(), 4);
        assert_eq!(got[1].as_ref(), b"~~");
        assert_eq!(rx.stats().frames, 4);
    }
}
