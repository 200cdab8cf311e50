//! Error types for keyvox
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use thiserror::Error;

/// Top-level error type for the keyvox application
#[derive(Error, Debug)]
pub enum KeyvoxError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Hotkey error: {0}")]
    Hotkey(#[from] HotkeyError),

    #[error("Audio capture error: {0}")]
    Audio(#[from] AudioError),

    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("Transcription error: {0}")]
    Transcribe(#[from] TranscribeError),

    #[error("{0} is only allowed while idle")]
    NotIdle(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to hotkey detection
#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("Cannot open input device '{0}'. Is the user in the 'input' group?\n  Run: sudo usermod -aG input $USER\n  Then log out and back in.")]
    DeviceAccess(String),

    #[error("Unknown key name: '{0}'. Use evtest or wev to find valid key names.")]
    UnknownKey(String),

    #[error("No keyboard device found in /dev/input/")]
    NoKeyboard,

    #[error("Exclusive key grab failed: {0}")]
    GrabFailed(String),

    #[error("evdev error: {0}")]
    Evdev(String),
}

/// Errors related to audio capture
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No audio input available. Check your microphone.")]
    CaptureUnavailable,

    #[error("Audio device not found: '{0}'. List devices with: pactl list sources short")]
    DeviceNotFound(String),

    #[error("Audio connection failed: {0}")]
    Connection(String),

    #[error("Audio stream error: {0}")]
    StreamError(String),
}

/// Errors related to capture buffer misuse
///
/// These indicate programmer errors rather than runtime conditions.
#[derive(Error, Debug)]
pub enum BufferError {
    #[error("Buffer capacity must be greater than zero")]
    ZeroCapacity,
}

/// Errors related to speech-to-text transcription
#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Audio format error: {0}")]
    AudioFormat(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Remote server error: {0}")]
    RemoteError(String),
}

/// Result type alias using KeyvoxError
pub type Result<T> = std::result::Result<T, KeyvoxError>;

#[cfg(target_os = "linux")]
impl From<evdev::Error> for HotkeyError {
    fn from(e: evdev::Error) -> Self {
        HotkeyError::Evdev(e.to_string())
    }
}
