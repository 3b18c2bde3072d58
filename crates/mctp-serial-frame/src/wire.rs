//! Wire-level constants for the MCTP serial binding.
//!
//! ```text
//! ┌──────┬──────┬───────┬─────────┬──────┬─────┬───────┬──────────────┬────────┬──────┐
//! │ Sync │ Rev  │ Count │ Version │ Dest │ Src │ Flags │ Payload      │ FCS    │ Sync │
//! │ 0x7E │ 0x01 │ len+4 │ 0x01    │ 0x00 │ 0x00│ 0xC8  │ (byte-stuffed│ (2B BE)│ 0x7E │
//! └──────┴──────┴───────┴─────────┴──────┴─────┴───────┴──────────────┴────────┴──────┘
//! ```

/// Frame delimiter.
pub const SYNC: u8 = 0x7E;

/// Marks the next byte as an escaped reserved value.
pub const ESCAPE: u8 = 0x7D;

/// Escaped form of [`SYNC`].
pub const ESCAPED_SYNC: u8 = 0x5E;

/// Escaped form of [`ESCAPE`].
pub const ESCAPED_ESCAPE: u8 = 0x5D;

/// Difference between a reserved byte and its escaped form.
pub const ESCAPE_XOR: u8 = 0x20;

/// Serial binding protocol revision.
pub const SERIAL_REVISION: u8 = 0x01;

/// MCTP transport header version.
pub const MCTP_VERSION: u8 = 0x01;

/// Destination endpoint ID (point-to-point link, null EID).
pub const DEST_EID: u8 = 0x00;

/// Source endpoint ID (point-to-point link, null EID).
pub const SOURCE_EID: u8 = 0x00;

/// SOM | EOM | tag owner, tag 0: a single-packet message.
pub const FLAGS_SINGLE_PACKET: u8 = 0xC8;

/// Header bytes included in the byte count (version, dest, source, flags).
pub const HEADER_BYTES_COUNTED: usize = 4;

/// The fixed transport header that follows the byte count.
pub const TRANSPORT_HEADER: [u8; HEADER_BYTES_COUNTED] =
    [MCTP_VERSION, DEST_EID, SOURCE_EID, FLAGS_SINGLE_PACKET];

/// Largest payload the one-byte count field can describe.
pub const MAX_PAYLOAD: usize = u8::MAX as usize - HEADER_BYTES_COUNTED;

/// Unstuffed bytes around the payload: sync, revision, count, header, FCS, sync.
pub const FRAME_OVERHEAD: usize = 3 + HEADER_BYTES_COUNTED + 2 + 1;

/// Returns true if `byte` must be byte-stuffed inside a frame body.
pub const fn needs_escape(byte: u8) -> bool {
    byte == SYNC || byte == ESCAPE
}

/// The escaped form of a reserved byte.
pub const fn escape(byte: u8) -> u8 {
    byte ^ ESCAPE_XOR
}

/// Recover the original byte from its escaped form.
///
/// Only [`ESCAPED_SYNC`] and [`ESCAPED_ESCAPE`] are valid after an escape.
pub const fn unescape(byte: u8) -> Option<u8> {
    match byte {
        ESCAPED_SYNC | ESCAPED_ESCAPE => Some(byte + ESCAPE_XOR),
        _ => None,
    }
}

/// Byte count field value for a payload of `payload_len` bytes.
pub const fn byte_count(payload_len: usize) -> usize {
    payload_len + HEADER_BYTES_COUNTED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_bytes_escape_and_back() {
        assert!(needs_escape(SYNC));
        assert!(needs_escape(ESCAPE));
        assert!(!needs_escape(ESCAPED_SYNC));
        assert!(!needs_escape(0x00));

        assert_eq!(escape(SYNC), ESCAPED_SYNC);
        assert_eq!(escape(ESCAPE), ESCAPED_ESCAPE);
        assert_eq!(unescape(ESCAPED_SYNC), Some(SYNC));
        assert_eq!(unescape(ESCAPED_ESCAPE), Some(ESCAPE));
    }

    #[test]
    fn unescape_rejects_other_bytes() {
        assert_eq!(unescape(0x41), None);
        assert_eq!(unescape(SYNC), None);
        assert_eq!(unescape(0x5F), None);
    }

    #[test]
    fn size_limits() {
        assert_eq!(MAX_PAYLOAD, 251);
        assert_eq!(byte_count(1), 5);
        assert_eq!(byte_count(MAX_PAYLOAD), 255);
        assert_eq!(FRAME_OVERHEAD, 10);
    }
}
