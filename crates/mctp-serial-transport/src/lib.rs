//! Byte-channel abstraction for MCTP serial links.
//!
//! The framing layer never talks to a UART directly. It consumes a
//! [`ByteChannel`], a non-blocking byte source and blocking byte sink:
//! - [`IoChannel`] adapts any `Read + Write` stream (pipes, sockets, ttys)
//! - [`LoopbackChannel`] connects two in-memory endpoints
//! - `SerialChannel` opens a physical port (behind the `serial` feature)
//!
//! This is the lowest layer of mctp-serial. Everything else builds on top of
//! the [`ByteChannel`] trait provided here.

pub mod error;
pub mod loopback;
pub mod traits;

#[cfg(feature = "serial")]
pub mod serial;

pub use error::{Result, TransportError};
pub use loopback::LoopbackChannel;
pub use traits::{ByteChannel, IoChannel};

#[cfg(feature = "serial")]
pub use serial::{SerialChannel, DEFAULT_BAUD_RATE};
