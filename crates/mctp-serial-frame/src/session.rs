use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use mctp_serial_transport::ByteChannel;
use tracing::{debug, warn};

use crate::codec::{encode_frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::receiver::{DropReason, Receiver, RxOutcome};
use crate::stats::{LinkStats, TxStats};
use crate::wire::MAX_PAYLOAD;

/// Result of one [`Session::poll_receive`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxStatus {
    /// No byte was available; nothing changed.
    Idle,
    /// One byte was consumed without completing a frame.
    Consumed,
    /// A packet is ready to be taken.
    PacketReady,
    /// The frame in progress was discarded.
    Dropped(DropReason),
    /// A previous packet has not been taken; no byte was read.
    Pending,
}

/// One MCTP serial link: a byte channel plus both directions of framing state.
///
/// Every operation takes `&mut self`, so a session cannot be driven from two
/// places at once without external synchronization. Receive and transmit
/// state are independent and may be interleaved freely.
pub struct Session<C> {
    channel: C,
    receiver: Receiver,
    scratch: BytesMut,
    tx: TxStats,
    config: FrameConfig,
}

impl<C: ByteChannel> Session<C> {
    /// Start a session on `channel` with default configuration.
    pub fn init(channel: C) -> Self {
        Self::with_config(channel, FrameConfig::default())
    }

    /// Start a session on `channel` with explicit configuration.
    pub fn with_config(channel: C, config: FrameConfig) -> Self {
        debug!(
            capacity = config.buffer_capacity,
            idle_timeout = ?config.idle_timeout,
            "session initialized"
        );
        Self {
            channel,
            receiver: Receiver::new(&config),
            scratch: BytesMut::with_capacity(2 * MAX_PAYLOAD + 16),
            tx: TxStats::default(),
            config,
        }
    }

    /// Advance the receive state machine by at most one byte.
    ///
    /// Never blocks. Returns [`RxStatus::Idle`] when the channel has nothing
    /// to offer and [`RxStatus::Pending`] without reading while a packet
    /// awaits [`take_packet`](Self::take_packet). Channel failures are fatal
    /// and returned as [`FrameError::Channel`]; a buffer overflow is reported
    /// but leaves the session usable.
    pub fn poll_receive(&mut self) -> Result<RxStatus> {
        if self.receiver.is_packet_ready() {
            return Ok(RxStatus::Pending);
        }

        let Some(byte) = self.channel.read_byte()? else {
            // Partial frames age only while the line is quiet.
            if self.receiver.expire(Instant::now()) {
                return Ok(RxStatus::Dropped(DropReason::IdleTimeout));
            }
            return Ok(RxStatus::Idle);
        };

        let status = match self.receiver.push_byte(byte)? {
            RxOutcome::Consumed => RxStatus::Consumed,
            RxOutcome::PacketReady => RxStatus::PacketReady,
            RxOutcome::Dropped(reason) => RxStatus::Dropped(reason),
        };
        Ok(status)
    }

    /// True if a received packet is waiting.
    pub fn is_packet_ready(&self) -> bool {
        self.receiver.is_packet_ready()
    }

    /// Take the waiting packet, letting reception resume.
    pub fn take_packet(&mut self) -> Option<Bytes> {
        self.receiver.take_packet()
    }

    /// Frame `payload` and write it to the channel.
    ///
    /// The whole frame is encoded before the first byte is written, so an
    /// invalid payload never leaves a partial frame on the wire.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.scratch.clear();
        encode_frame(payload, &mut self.scratch)?;
        self.channel.write_buffer(&self.scratch)?;
        self.channel.flush()?;

        self.tx.frames += 1;
        self.tx.bytes += self.scratch.len() as u64;
        debug!(
            payload_len = payload.len(),
            wire_len = self.scratch.len(),
            "frame sent"
        );
        Ok(())
    }

    /// Poll until a packet arrives or `timeout` elapses.
    ///
    /// Sleeps `poll_interval` whenever the channel is idle. Buffer overflows
    /// are logged and skipped; channel failures end the wait.
    pub fn recv_timeout(&mut self, timeout: Duration, poll_interval: Duration) -> Result<Bytes> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.poll_receive() {
                Ok(RxStatus::PacketReady | RxStatus::Pending) => {
                    if let Some(packet) = self.take_packet() {
                        return Ok(packet);
                    }
                }
                Ok(RxStatus::Idle) => {
                    if Instant::now() >= deadline {
                        return Err(FrameError::Timeout(timeout));
                    }
                    std::thread::sleep(poll_interval);
                }
                Ok(RxStatus::Consumed | RxStatus::Dropped(_)) => {}
                Err(err @ FrameError::BufferOverflow { .. }) => {
                    warn!(%err, "skipping oversized frame");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Snapshot of both directions' counters.
    pub fn stats(&self) -> LinkStats {
        LinkStats {
            rx: *self.receiver.stats(),
            tx: self.tx,
        }
    }

    /// Current receive state machine.
    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    /// Current configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Borrow the underlying channel.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Mutably borrow the underlying channel.
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Consume the session and return the channel.
    pub fn into_inner(self) -> C {
        self.channel
    }
}

impl<C> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.receiver.state())
            .field("ready", &self.receiver.is_packet_ready())
            .field("tx", &self.tx)
            .finish()
    }
}
