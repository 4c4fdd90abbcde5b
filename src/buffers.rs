//! Fixed-size PIO/DMA staging buffers.
//!
//! Both buffers are owned byte arrays with explicit cursors; nothing ever
//! hands out an interior pointer, so the head/size invariants in the
//! governing spec hold by construction rather than by caller discipline.

use crate::error::GdromFault;

pub const BUFFER_CAPACITY: usize = 64 * 1024;

/// The 12-byte SPI packet the host writes through the data register while
/// the drive is in `READ_ATA_DATA`.
pub const PACKET_LEN: usize = 12;

/// PIO staging buffer. Used both to receive a 12-byte packet / SET_MODE
/// payload from the host, and to stream a reply payload to the host.
#[derive(Debug)]
pub struct PioBuffer {
    bytes: Vec<u8>,
    head: usize,
    size: usize,
    /// Destination offset for a SET_MODE write into hardware-info; unused
    /// for every other host->device payload.
    dest_offset: usize,
}

impl PioBuffer {
    pub fn new() -> Self {
        PioBuffer {
            bytes: vec![0u8; BUFFER_CAPACITY],
            head: 0,
            size: 0,
            dest_offset: 0,
        }
    }

    /// Exposed for the cursor-bound invariant checks in this crate's tests.
    #[allow(dead_code)]
    pub fn head(&self) -> usize {
        self.head
    }

    /// Exposed for the cursor-bound invariant checks in this crate's tests.
    #[allow(dead_code)]
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dest_offset(&self) -> usize {
        self.dest_offset
    }

    pub fn set_dest_offset(&mut self, offset: usize) {
        self.dest_offset = offset;
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.size]
    }

    /// Arm the buffer to receive `expected` bytes from the host (a 12-byte
    /// packet, or an SPI host->device payload of `expected` bytes).
    pub fn arm_receive(&mut self, expected: usize) -> Result<(), GdromFault> {
        if expected > BUFFER_CAPACITY {
            return Err(GdromFault::BufferOverrun {
                cursor: expected,
                limit: BUFFER_CAPACITY,
            });
        }
        self.head = 0;
        self.size = expected;
        Ok(())
    }

    /// Arm the buffer to send `payload` to the host.
    pub fn arm_send(&mut self, payload: &[u8]) -> Result<(), GdromFault> {
        if payload.len() > BUFFER_CAPACITY {
            return Err(GdromFault::BufferOverrun {
                cursor: payload.len(),
                limit: BUFFER_CAPACITY,
            });
        }
        self.bytes[..payload.len()].copy_from_slice(payload);
        self.head = 0;
        self.size = payload.len();
        Ok(())
    }

    /// Append a 2-byte PIO word at the current head, advancing it. Used for
    /// host->device writes (packet bytes, SET_MODE payload).
    pub fn push_word(&mut self, lo: u8, hi: u8) -> Result<(), GdromFault> {
        if self.head + 2 > BUFFER_CAPACITY {
            return Err(GdromFault::BufferOverrun {
                cursor: self.head + 2,
                limit: BUFFER_CAPACITY,
            });
        }
        self.bytes[self.head] = lo;
        self.bytes[self.head + 1] = hi;
        self.head += 2;
        Ok(())
    }

    /// Read a 2-byte PIO word at the current head, advancing it. Used for
    /// device->host reads. Bounds against the armed logical `size`, not just
    /// buffer capacity: an odd-length reply's last word reads one real byte
    /// and zero-fills the other rather than exposing whatever stale byte
    /// follows it in the backing array.
    pub fn pop_word(&mut self) -> Result<(u8, u8), GdromFault> {
        if self.head >= self.size {
            return Err(GdromFault::BufferOverrun {
                cursor: self.head + 2,
                limit: self.size,
            });
        }
        let lo = self.bytes[self.head];
        let hi = if self.head + 1 < self.size {
            self.bytes[self.head + 1]
        } else {
            0
        };
        self.head += 2;
        Ok((lo, hi))
    }

    pub fn is_receive_complete(&self) -> bool {
        self.head >= self.size
    }

    pub fn is_drained(&self) -> bool {
        self.head >= self.size
    }
}

impl Default for PioBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// DMA staging buffer. Filled in batches by the CD-read loop and drained in
/// bulk by the host bridge's DMA transfer call.
#[derive(Debug)]
pub struct DmaBuffer {
    bytes: Vec<u8>,
    head: usize,
    size: usize,
}

impl DmaBuffer {
    pub fn new() -> Self {
        DmaBuffer {
            bytes: vec![0u8; BUFFER_CAPACITY],
            head: 0,
            size: 0,
        }
    }

    /// Exposed for the cursor-bound invariant checks in this crate's tests.
    #[allow(dead_code)]
    pub fn head(&self) -> usize {
        self.head
    }

    /// Exposed for the cursor-bound invariant checks in this crate's tests.
    #[allow(dead_code)]
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn remaining(&self) -> &[u8] {
        &self.bytes[self.head..self.size]
    }

    /// Fill the buffer from `payload`, resetting the head cursor.
    pub fn fill(&mut self, payload: &[u8]) -> Result<(), GdromFault> {
        if payload.len() > BUFFER_CAPACITY {
            return Err(GdromFault::BufferOverrun {
                cursor: payload.len(),
                limit: BUFFER_CAPACITY,
            });
        }
        self.bytes[..payload.len()].copy_from_slice(payload);
        self.head = 0;
        self.size = payload.len();
        Ok(())
    }

    /// Advance the head cursor after `n` bytes have been copied to the
    /// guest; returns whether the buffer is now fully drained.
    pub fn advance(&mut self, n: usize) -> Result<bool, GdromFault> {
        if self.head + n > self.size {
            return Err(GdromFault::BufferOverrun {
                cursor: self.head + n,
                limit: self.size,
            });
        }
        self.head += n;
        Ok(self.head >= self.size)
    }

    #[allow(dead_code)]
    pub fn is_drained(&self) -> bool {
        self.head >= self.size
    }
}

impl Default for DmaBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pio_buffer_head_never_exceeds_size_during_a_receive() {
        let mut buf = PioBuffer::new();
        buf.arm_receive(PACKET_LEN).unwrap();
        for _ in 0..6 {
            buf.push_word(0, 0).unwrap();
            assert!(buf.head() <= buf.size());
        }
        assert!(buf.is_receive_complete());
    }

    #[test]
    fn dma_buffer_rejects_overrun_advance() {
        let mut buf = DmaBuffer::new();
        buf.fill(&[1, 2, 3, 4]).unwrap();
        assert!(matches!(
            buf.advance(5),
            Err(GdromFault::BufferOverrun { .. })
        ));
    }
}
