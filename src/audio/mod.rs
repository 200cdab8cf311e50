//! Audio capture module
//!
//! Captures microphone input via cpal (PipeWire, PulseAudio, and ALSA
//! backends) and streams it as mono 16-bit little-endian PCM bytes into
//! the active capture buffer. The capture callback only ever calls
//! `write` on the buffer handle; it never blocks beyond the buffer lock.

pub mod cpal_capture;

use crate::buffer::SharedBuffer;
use crate::config::AudioConfig;
use crate::error::AudioError;

/// Trait for audio capture implementations
#[async_trait::async_trait]
pub trait AudioCapture: Send {
    /// Start capturing into `sink`. Fails if no usable input device is
    /// available; the caller must not treat a failed start as recording.
    async fn start(&mut self, sink: SharedBuffer) -> Result<(), AudioError>;

    /// Stop capturing and tear down the stream
    async fn stop(&mut self) -> Result<(), AudioError>;

    /// Whether a capture stream is currently running
    fn is_running(&self) -> bool;
}

/// Factory function to create audio capture
pub fn create_capture(config: &AudioConfig) -> Result<Box<dyn AudioCapture>, AudioError> {
    Ok(Box::new(cpal_capture::CpalCapture::new(config)))
}
