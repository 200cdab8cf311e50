//! Speech-to-text transcription module
//!
//! Transcription is an external collaborator: the recording core hands a
//! finished PCM segment to a [`Transcriber`] and receives text or an
//! error asynchronously. The only built-in backend posts audio to an
//! OpenAI-compatible endpoint; retry policy, if any, belongs to the
//! server side, not here.

pub mod remote;

use crate::config::TranscribeConfig;
use crate::error::TranscribeError;

/// Trait for speech-to-text implementations
pub trait Transcriber: Send + Sync {
    /// Transcribe one segment of mono s16le PCM bytes to text
    fn transcribe(&self, pcm: &[u8]) -> Result<String, TranscribeError>;
}

/// Factory function to create the configured transcriber
pub fn create_transcriber(
    config: &TranscribeConfig,
    sample_rate: u32,
) -> Result<Box<dyn Transcriber>, TranscribeError> {
    Ok(Box::new(remote::RemoteTranscriber::new(config, sample_rate)?))
}
