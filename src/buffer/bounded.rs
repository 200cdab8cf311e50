//! Bounded one-shot segment buffer
//!
//! Accumulates exactly one recording segment and refuses silent
//! wraparound: a write that would exceed capacity discards everything
//! recorded so far before it is applied ("most recent complete burst"),
//! and a single chunk larger than capacity keeps only its head. Note the
//! asymmetry with the ring policy, which keeps an oversized chunk's tail.

use super::CaptureBuffer;
use crate::error::BufferError;

/// Fixed-capacity byte store without circular wraparound; reads always
/// start from offset 0.
pub struct BoundedBuffer {
    data: Vec<u8>,
    capacity: usize,
    write_pos: usize,
    total_written: u64,
}

impl BoundedBuffer {
    /// Create a bounded buffer with the given byte capacity.
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        if capacity == 0 {
            return Err(BufferError::ZeroCapacity);
        }
        Ok(Self {
            data: vec![0; capacity],
            capacity,
            write_pos: 0,
            total_written: 0,
        })
    }

    fn reset_cursors(&mut self) {
        self.write_pos = 0;
        self.total_written = 0;
    }
}

impl CaptureBuffer for BoundedBuffer {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn total_written(&self) -> u64 {
        self.total_written
    }

    fn write(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }

        // Drop-and-restart: an overflowing write wins outright over
        // whatever was recorded before it.
        if self.total_written + bytes.len() as u64 > self.capacity as u64 {
            tracing::debug!(
                "Bounded buffer overflow ({} + {} > {}), discarding prior content",
                self.total_written,
                bytes.len(),
                self.capacity
            );
            self.reset_cursors();

            // A chunk larger than the whole buffer: keep its head only.
            if bytes.len() > self.capacity {
                self.data.copy_from_slice(&bytes[..self.capacity]);
                self.total_written = self.capacity as u64;
                return;
            }
        }

        for &b in bytes {
            self.data[self.write_pos] = b;
            self.write_pos = (self.write_pos + 1) % self.capacity;
        }
        self.total_written += bytes.len() as u64;
    }

    fn read(&self) -> Vec<u8> {
        let available = (self.total_written.min(self.capacity as u64)) as usize;
        self.data[..available].to_vec()
    }

    fn read_and_clear(&mut self) -> Vec<u8> {
        let out = self.read();
        self.clear();
        out
    }

    fn clear(&mut self) {
        self.reset_cursors();
        self.data.fill(0);
    }

    fn set_capacity(&mut self, capacity: usize) -> Result<(), BufferError> {
        if capacity == 0 {
            return Err(BufferError::ZeroCapacity);
        }
        self.data = vec![0; capacity];
        self.capacity = capacity;
        self.reset_cursors();
        Ok(())
    }

    fn is_full(&self) -> bool {
        self.total_written >= self.capacity as u64
    }

    fn available_space(&self) -> usize {
        self.capacity - (self.total_written.min(self.capacity as u64)) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_writes_accumulate_from_start() {
        let mut buf = BoundedBuffer::new(16).unwrap();
        buf.write(&[1, 2, 3]);
        buf.write(&[4, 5]);

        assert_eq!(buf.read(), vec![1, 2, 3, 4, 5]);
        assert_eq!(buf.available_space(), 11);
        assert!(!buf.is_full());
    }

    #[test]
    fn test_overflow_discards_prior_content() {
        let mut buf = BoundedBuffer::new(16).unwrap();
        buf.write(&[1; 10]);
        buf.write(&[2; 10]);

        // Not a 16-byte splice of both: the second chunk alone survives.
        assert_eq!(buf.read(), vec![2; 10]);
        assert_eq!(buf.total_written(), 10);
    }

    #[test]
    fn test_oversized_chunk_keeps_head() {
        let mut buf = BoundedBuffer::new(4).unwrap();
        buf.write(&[9, 9]);
        buf.write(&[1, 2, 3, 4, 5, 6, 7, 8]);

        // Head of the chunk, unlike the ring policy's tail.
        assert_eq!(buf.read(), vec![1, 2, 3, 4]);
        assert!(buf.is_full());
        assert_eq!(buf.available_space(), 0);
    }

    #[test]
    fn test_exact_fill_is_not_overflow() {
        let mut buf = BoundedBuffer::new(8).unwrap();
        buf.write(&[1, 2, 3, 4]);
        buf.write(&[5, 6, 7, 8]);

        assert_eq!(buf.read(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(buf.is_full());
    }

    #[test]
    fn test_read_and_clear_hands_off_once() {
        let mut buf = BoundedBuffer::new(1024).unwrap();
        buf.write(&[7; 500]);

        let segment = buf.read_and_clear();
        assert_eq!(segment.len(), 500);
        assert!(segment.iter().all(|&b| b == 7));

        assert!(buf.read().is_empty());
        assert_eq!(buf.total_written(), 0);
        assert_eq!(buf.available_space(), 1024);
    }

    #[test]
    fn test_read_and_clear_matches_read_then_clear() {
        let mut a = BoundedBuffer::new(32).unwrap();
        let mut b = BoundedBuffer::new(32).unwrap();
        for buf in [&mut a, &mut b] {
            buf.write(&[1, 2, 3, 4, 5]);
        }

        let combined = a.read_and_clear();
        let separate = b.read();
        b.clear();

        assert_eq!(combined, separate);
        assert_eq!(a.read(), b.read());
    }

    #[test]
    fn test_clear_resets_space_accounting() {
        let mut buf = BoundedBuffer::new(8).unwrap();
        buf.write(&[1; 8]);
        assert!(buf.is_full());

        buf.clear();
        assert!(!buf.is_full());
        assert_eq!(buf.available_space(), 8);
        assert!(buf.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_set_capacity_guards_zero() {
        let mut buf = BoundedBuffer::new(8).unwrap();
        assert!(matches!(
            buf.set_capacity(0),
            Err(BufferError::ZeroCapacity)
        ));
        assert!(BoundedBuffer::new(0).is_err());
    }

    #[test]
    fn test_zero_length_write_is_noop() {
        let mut buf = BoundedBuffer::new(4).unwrap();
        buf.write(&[]);
        assert_eq!(buf.total_written(), 0);
        assert!(buf.read().is_empty());
    }
}
