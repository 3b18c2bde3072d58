//! `tokio_util::codec` adapter over the receive state machine and encoder.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::codec::{encode_frame, FrameConfig};
use crate::error::FrameError;
use crate::receiver::{Receiver, RxOutcome};
use crate::stats::RxStats;

/// Codec for `Framed` MCTP serial streams.
///
/// Decoding feeds every buffered byte through a [`Receiver`]; dropped frames
/// are skipped silently (they show up in [`stats`](Self::stats)) and a buffer
/// overflow is yielded as an error.
#[derive(Debug)]
pub struct MctpSerialCodec {
    receiver: Receiver,
}

impl MctpSerialCodec {
    pub fn new() -> Self {
        Self::with_config(&FrameConfig::default())
    }

    pub fn with_config(config: &FrameConfig) -> Self {
        // No idle timeout: stalled frames are bounded by the stream.
        let config = FrameConfig {
            idle_timeout: None,
            ..config.clone()
        };
        Self {
            receiver: Receiver::new(&config),
        }
    }

    pub fn stats(&self) -> &RxStats {
        self.receiver.stats()
    }
}

impl Default for MctpSerialCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for MctpSerialCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while src.has_remaining() {
            let byte = src.get_u8();
            if let RxOutcome::PacketReady = self.receiver.push_byte(byte)? {
                trace!(remaining = src.len(), "decoded packet");
                return Ok(self.receiver.take_packet());
            }
        }
        Ok(None)
    }
}

impl Encoder<Bytes> for MctpSerialCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item, dst)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;

    #[tokio::test]
    async fn framed_roundtrip_over_duplex() {
        let (client, server) = tokio::io::duplex(256);
        let mut writer = FramedWrite::new(client, MctpSerialCodec::new());
        let mut reader = FramedRead::new(server, MctpSerialCodec::new());

        writer.send(Bytes::from_static(b"AB~CD")).await.unwrap();
        writer.send(Bytes::from_static(b"AB}CD")).await.unwrap();
        writer.send(Bytes::from_static(b"A")).await.unwrap();
        drop(writer);

        let first = reader.next().await.unwrap().unwrap();
        let second = reader.next().await.unwrap().unwrap();
        let third = reader.next().await.unwrap().unwrap();
        assert_eq!(first.as_ref(), b"AB~CD");
        assert_eq!(second.as_ref(), b"AB}CD");
        assert_eq!(third.as_ref(), b"A");
        assert!(reader.next().await.is_none());
    }

    #[test]
    fn decode_skips_corrupt_frames() {
        let mut codec = MctpSerialCodec::new();
        let mut src = BytesMut::new();
        encode_frame(b"bad", &mut src).unwrap();
        src[8] ^= 0x01;
        encode_frame(b"good", &mut src).unwrap();

        let packet = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(packet.as_ref(), b"good");
        assert!(src.is_empty());
        assert_eq!(codec.stats().checksum_mismatches, 1);
    }

    #[test]
    fn decode_waits_for_more_bytes() {
        let mut codec = MctpSerialCodec::new();
        let mut wire = BytesMut::new();
        encode_frame(b"partial", &mut wire).unwrap();
        let mut tail = wire.split_off(5);

        assert!(codec.decode(&mut wire).unwrap().is_none());
        assert_eq!(
            codec.decode(&mut tail).unwrap().unwrap().as_ref(),
            b"partial"
        );
    }

    #[test]
    fn decode_leaves_following_frames_buffered() {
        let mut codec = MctpSerialCodec::new();
        let mut src = BytesMut::new();
        encode_frame(b"one", &mut src).unwrap();
        encode_frame(b"two", &mut src).unwrap();

        assert_eq!(codec.decode(&mut src).unwrap().unwrap().as_ref(), b"one");
        assert!(!src.is_empty());
        assert_eq!(codec.decode(&mut src).unwrap().unwrap().as_ref(), b"two");
    }

    #[test]
    fn overflow_is_an_error() {
        let config = FrameConfig {
            buffer_capacity: 2,
            ..FrameConfig::default()
        };
        let mut codec = MctpSerialCodec::with_config(&config);
        let mut src = BytesMut::new();
        encode_frame(b"oversized", &mut src).unwrap();

        let err = codec.decode(&mut src).unwrap_err();
        assert!(matches!(err, FrameError::BufferOverflow { .. }));
    }

    #[test]
    fn encode_rejects_empty_payload() {
        let mut codec = MctpSerialCodec::new();
        let mut dst = BytesMut::new();
        let err = codec.encode(Bytes::new(), &mut dst).unwrap_err();
        assert!(matches!(err, FrameError::EmptyPayload));
    }
}
