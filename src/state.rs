//! State machine states for the recording workflow
//!
//! The controller walks Idle -> Recording -> Processing -> Idle. Only the
//! controller mutates the state; the daemon and external integrations
//! read it for display.

use std::time::Instant;

/// Recording workflow state
#[derive(Debug, Clone)]
pub enum RecorderState {
    /// Waiting for user input
    Idle,

    /// Audio is being captured into the active buffer
    Recording {
        /// When recording started
        started_at: Instant,
    },

    /// Capture stopped; segment handed to the transcriber, awaiting result
    Processing,
}

impl RecorderState {
    /// Create a new idle state
    pub fn new() -> Self {
        RecorderState::Idle
    }

    /// Check if in idle state
    pub fn is_idle(&self) -> bool {
        matches!(self, RecorderState::Idle)
    }

    /// Check if in recording state
    pub fn is_recording(&self) -> bool {
        matches!(self, RecorderState::Recording { .. })
    }

    /// Check if a segment is with the transcriber
    pub fn is_processing(&self) -> bool {
        matches!(self, RecorderState::Processing)
    }

    /// Get recording duration if currently recording
    pub fn recording_duration(&self) -> Option<std::time::Duration> {
        match self {
            RecorderState::Recording { started_at } => Some(started_at.elapsed()),
            _ => None,
        }
    }

    /// Lowercase name written to the state file
    pub fn as_str(&self) -> &'static str {
        match self {
            RecorderState::Idle => "idle",
            RecorderState::Recording { .. } => "recording",
            RecorderState::Processing => "processing",
        }
    }
}

impl Default for RecorderState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecorderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecorderState::Idle => write!(f, "Idle"),
            RecorderState::Recording { started_at } => {
                write!(f, "Recording ({:.1}s)", started_at.elapsed().as_secs_f32())
            }
            RecorderState::Processing => write!(f, "Processing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_idle() {
        let state = RecorderState::new();
        assert!(state.is_idle());
        assert!(!state.is_recording());
        assert!(!state.is_processing());
    }

    #[test]
    fn test_recording_state() {
        let state = RecorderState::Recording {
            started_at: Instant::now(),
        };
        assert!(state.is_recording());
        assert!(!state.is_idle());
        assert!(state.recording_duration().is_some());
    }

    #[test]
    fn test_idle_has_no_duration() {
        assert!(RecorderState::Idle.recording_duration().is_none());
        assert!(RecorderState::Processing.recording_duration().is_none());
    }

    #[test]
    fn test_state_file_names() {
        assert_eq!(RecorderState::Idle.as_str(), "idle");
        assert_eq!(
            RecorderState::Recording {
                started_at: Instant::now()
            }
            .as_str(),
            "recording"
        );
        assert_eq!(RecorderState::Processing.as_str(), "processing");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(format!("{}", RecorderState::Idle), "Idle");

        let state = RecorderState::Recording {
            started_at: Instant::now(),
        };
        assert!(format!("{}", state).starts_with("Recording"));
    }
}
