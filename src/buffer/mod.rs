//! In-memory capture buffers for PCM bytes
//!
//! Two buffering policies share one contract: a ring buffer that always
//! holds the most recent window of audio, and a bounded buffer that holds
//! exactly one recording segment and is consumed once via `read_and_clear`.
//!
//! The producer is the audio callback thread; the consumer is the
//! recording controller. All access to one buffer instance is serialized
//! by the single mutex inside [`SharedBuffer`].

pub mod bounded;
pub mod ring;

pub use bounded::BoundedBuffer;
pub use ring::RingBuffer;

use crate::config::BufferPolicy;
use crate::error::BufferError;
use std::sync::{Arc, Mutex, PoisonError};

/// Byte sink/source contract shared by both buffering policies.
///
/// Implementations hold plain fields and are not synchronized themselves;
/// the lock lives in [`SharedBuffer`] so that `read_and_clear` can combine
/// view and reset under one guard.
pub trait CaptureBuffer: Send {
    /// Fixed byte capacity, set at construction or via `set_capacity`
    fn capacity(&self) -> usize;

    /// Monotonic count of bytes written since the last clear
    fn total_written(&self) -> u64;

    /// Append bytes according to the policy. Never fails; a zero-length
    /// write is a no-op.
    fn write(&mut self, bytes: &[u8]);

    /// Non-destructive view of the readable span, oldest first
    fn read(&self) -> Vec<u8>;

    /// Capture the readable span and reset in one step. Only atomic with
    /// respect to writers when called through [`SharedBuffer`].
    fn read_and_clear(&mut self) -> Vec<u8>;

    /// Reset cursors and zero-fill the backing store; capacity unchanged
    fn clear(&mut self);

    /// Reallocate to `capacity` bytes, discarding existing content
    fn set_capacity(&mut self, capacity: usize) -> Result<(), BufferError>;

    /// Whether the buffer refuses further writes without discarding.
    /// Always false for the ring policy.
    fn is_full(&self) -> bool;

    /// Bytes writable before the policy's overflow behavior triggers.
    /// Always `capacity` for the ring policy.
    fn available_space(&self) -> usize;
}

/// Cloneable handle to one buffer instance.
///
/// Every public operation acquires the instance lock for its duration, so
/// the audio callback's `write` and the controller's `read_and_clear`
/// never observe a torn state. Do not pair `read` with a separate `clear`
/// where a producer may be running; that window is exactly what
/// `read_and_clear` exists to close.
#[derive(Clone)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Box<dyn CaptureBuffer>>>,
}

impl SharedBuffer {
    pub fn new(buffer: Box<dyn CaptureBuffer>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(buffer)),
        }
    }

    // A poisoned mutex here only means a thread panicked mid-operation;
    // the byte cursors are reset on the next clear, so recover the guard.
    fn lock(&self) -> std::sync::MutexGuard<'_, Box<dyn CaptureBuffer>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    pub fn total_written(&self) -> u64 {
        self.lock().total_written()
    }

    pub fn write(&self, bytes: &[u8]) {
        self.lock().write(bytes);
    }

    pub fn read(&self) -> Vec<u8> {
        self.lock().read()
    }

    pub fn read_and_clear(&self) -> Vec<u8> {
        self.lock().read_and_clear()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn set_capacity(&self, capacity: usize) -> Result<(), BufferError> {
        self.lock().set_capacity(capacity)
    }

    pub fn is_full(&self) -> bool {
        self.lock().is_full()
    }

    pub fn available_space(&self) -> usize {
        self.lock().available_space()
    }
}

/// Factory function to create a shared buffer for the configured policy
pub fn create_buffer(policy: BufferPolicy, capacity: usize) -> Result<SharedBuffer, BufferError> {
    let buffer: Box<dyn CaptureBuffer> = match policy {
        BufferPolicy::Ring => Box::new(RingBuffer::new(capacity)?),
        BufferPolicy::Bounded => Box::new(BoundedBuffer::new(capacity)?),
    };
    Ok(SharedBuffer::new(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_selects_policy() {
        let ring = create_buffer(BufferPolicy::Ring, 8).unwrap();
        let bounded = create_buffer(BufferPolicy::Bounded, 8).unwrap();

        // Distinguishing behavior: cumulative overflow keeps the newest
        // window in a ring but only the triggering chunk in a bounded buffer.
        ring.write(&[1, 2, 3, 4, 5, 6]);
        ring.write(&[7, 8, 9, 10]);
        assert_eq!(ring.read(), vec![3, 4, 5, 6, 7, 8, 9, 10]);

        bounded.write(&[1, 2, 3, 4, 5, 6]);
        bounded.write(&[7, 8, 9, 10]);
        assert_eq!(bounded.read(), vec![7, 8, 9, 10]);
    }

    #[test]
    fn test_factory_rejects_zero_capacity() {
        assert!(create_buffer(BufferPolicy::Ring, 0).is_err());
        assert!(create_buffer(BufferPolicy::Bounded, 0).is_err());
    }

    #[test]
    fn test_shared_handle_clones_see_same_instance() {
        let buffer = create_buffer(BufferPolicy::Bounded, 16).unwrap();
        let writer = buffer.clone();

        writer.write(&[1, 2, 3]);
        assert_eq!(buffer.read(), vec![1, 2, 3]);

        let taken = buffer.read_and_clear();
        assert_eq!(taken, vec![1, 2, 3]);
        assert!(writer.read().is_empty());
    }
}
