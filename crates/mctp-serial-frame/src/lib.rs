//! MCTP-over-serial framing.
//!
//! Turns a raw serial byte stream into validated MCTP packets and back:
//! - A 0x7E sync byte delimits every frame
//! - 0x7E and 0x7D inside the payload are byte-stuffed as 0x7D 0x5E / 0x7D 0x5D
//! - A 16-bit RFC 1662 FCS over the unstuffed frame guards against corruption
//!
//! The [`Receiver`] is a resumable state machine that consumes one byte per
//! call, so it works from a polling loop ([`Session::poll_receive`]), an
//! offline capture ([`decode_frames`]) or an async codec (`async` feature).

pub mod codec;
pub mod error;
pub mod fcs;
pub mod receiver;
pub mod session;
pub mod stats;
pub mod wire;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use codec::{
    decode_frames, encode_frame, encoded_len, validate_payload_len, DecodeReport, FrameConfig,
    DEFAULT_IDLE_TIMEOUT,
};
pub use error::{FrameError, Result};
pub use receiver::{DropReason, Receiver, RxOutcome, RxState};
pub use session::{RxStatus, Session};
pub use stats::{LinkStats, RxStats, TxStats};
pub use wire::{ESCAPE, MAX_PAYLOAD, SYNC};
pub use writer::Framer;

#[cfg(feature = "async")]
pub use async_codec::MctpSerialCodec;
