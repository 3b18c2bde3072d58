//! MCTP-over-serial transport framing.
//!
//! mctp-serial turns a UART byte stream into validated MCTP packets and back,
//! using sync/escape byte-stuffing and an RFC 1662 FCS-16 per frame.
//!
//! # Crate Structure
//!
//! - [`transport`]: Byte-channel abstraction (std streams, loopback, UART)
//! - [`frame`]: FCS engine, receive state machine, transmit framer, sessions
//!
//! ```
//! use mctp_serial::frame::Session;
//! use mctp_serial::transport::LoopbackChannel;
//!
//! let (a, b) = LoopbackChannel::pair();
//! let mut host = Session::init(a);
//! let mut device = Session::init(b);
//!
//! host.send(b"AB~CD").unwrap();
//! while !device.is_packet_ready() {
//!     device.poll_receive().unwrap();
//! }
//! assert_eq!(device.take_packet().unwrap().as_ref(), b"AB~CD");
//! ```

/// Re-export transport types.
pub mod transport {
    pub use mctp_serial_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use mctp_serial_frame::*;
}
