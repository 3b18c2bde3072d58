use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::ByteChannel;

#[derive(Debug, Default)]
struct Pipe {
    queue: VecDeque<u8>,
    writer_alive: bool,
}

/// One end of an in-memory, full-duplex byte link.
///
/// Created in connected pairs by [`LoopbackChannel::pair`]. Bytes written on
/// one end are read, in order, on the other. Once an end is dropped its peer
/// drains whatever is left and then sees [`TransportError::Closed`].
#[derive(Debug)]
pub struct LoopbackChannel {
    inbound: Arc<Mutex<Pipe>>,
    outbound: Arc<Mutex<Pipe>>,
}

impl LoopbackChannel {
    /// Create two connected endpoints.
    pub fn pair() -> (Self, Self) {
        let a_to_b = Arc::new(Mutex::new(Pipe {
            queue: VecDeque::new(),
            writer_alive: true,
        }));
        let b_to_a = Arc::new(Mutex::new(Pipe {
            queue: VecDeque::new(),
            writer_alive: true,
        }));

        let a = Self {
            inbound: Arc::clone(&b_to_a),
            outbound: Arc::clone(&a_to_b),
        };
        let b = Self {
            inbound: a_to_b,
            outbound: b_to_a,
        };
        (a, b)
    }

    /// Number of bytes waiting to be read on this end.
    pub fn pending(&self) -> usize {
        lock(&self.inbound).queue.len()
    }

    /// Inject raw bytes as if the peer had written them.
    ///
    /// Useful for feeding hand-built or corrupted wire data to a receiver.
    pub fn inject(&self, bytes: &[u8]) {
        lock(&self.inbound).queue.extend(bytes.iter().copied());
    }
}

impl ByteChannel for LoopbackChannel {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut pipe = lock(&self.inbound);
        match pipe.queue.pop_front() {
            Some(byte) => Ok(Some(byte)),
            None if pipe.writer_alive => Ok(None),
            None => Err(TransportError::Closed),
        }
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write_buffer(&[byte])
    }

    fn write_buffer(&mut self, bytes: &[u8]) -> Result<()> {
        // The peer's inbound pipe is our outbound one; if the peer is gone
        // nobody holds the other Arc.
        if Arc::strong_count(&self.outbound) < 2 {
            return Err(TransportError::Closed);
        }
        lock(&self.outbound).queue.extend(bytes.iter().copied());
        Ok(())
    }
}

impl Drop for LoopbackChannel {
    fn drop(&mut self) {
        lock(&self.outbound).writer_alive = false;
        debug!("loopback endpoint closed");
    }
}

fn lock(pipe: &Mutex<Pipe>) -> MutexGuard<'_, Pipe> {
    pipe.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
