//! Recording controller
//!
//! The state machine that ties buffer lifecycle to user input: Idle ->
//! Recording -> Processing -> Idle, driven by press edges (toggle mode)
//! or held-state changes (push-to-talk). Owns the active capture buffer,
//! the audio capture handle, and the transcriber.
//!
//! The controller is single-threaded by contract: it is driven from one
//! task (the daemon loop). Transcription runs on a blocking task with the
//! already-extracted bytes and reports back through the results channel,
//! so input arriving while a segment is processing is observed and
//! ignored rather than queued into a re-entrant start.

use crate::audio::AudioCapture;
use crate::buffer::SharedBuffer;
use crate::config::InputMode;
use crate::error::{KeyvoxError, TranscribeError};
use crate::state::RecorderState;
use crate::transcribe::Transcriber;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Notifications emitted toward the UI collaborator (daemon, state file)
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// The workflow state changed
    StateChanged(RecorderState),
    /// A segment finished transcribing successfully
    Transcribed(String),
    /// A runtime error was recovered to Idle
    Error(String),
}

/// Outcome of one segment's transcription, routed back into
/// [`RecordingController::transcription_finished`] by the daemon.
pub type SegmentResult = Result<String, TranscribeError>;

/// Recording workflow state machine
pub struct RecordingController {
    mode: InputMode,
    state: RecorderState,
    buffer: SharedBuffer,
    capture: Box<dyn AudioCapture>,
    transcriber: Arc<dyn Transcriber>,
    events_tx: mpsc::UnboundedSender<ControllerEvent>,
    results_tx: mpsc::UnboundedSender<SegmentResult>,
}

impl RecordingController {
    /// Create a controller in the Idle state.
    ///
    /// Returns the controller plus two receivers: UI notifications, and
    /// segment results that the caller must feed back into
    /// [`transcription_finished`](Self::transcription_finished).
    pub fn new(
        mode: InputMode,
        buffer: SharedBuffer,
        capture: Box<dyn AudioCapture>,
        transcriber: Arc<dyn Transcriber>,
    ) -> (
        Self,
        mpsc::UnboundedReceiver<ControllerEvent>,
        mpsc::UnboundedReceiver<SegmentResult>,
    ) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        (
            Self {
                mode,
                state: RecorderState::Idle,
                buffer,
                capture,
                transcriber,
                events_tx,
                results_tx,
            },
            events_rx,
            results_rx,
        )
    }

    /// Current workflow state, readable for display
    pub fn state(&self) -> &RecorderState {
        &self.state
    }

    /// Current input mode
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Error unless the controller is Idle. Reconfiguration (mode switch,
    /// key rebind) is rejected mid-segment.
    pub fn ensure_idle(&self, operation: &'static str) -> Result<(), KeyvoxError> {
        if self.state.is_idle() {
            Ok(())
        } else {
            Err(KeyvoxError::NotIdle(operation))
        }
    }

    /// Switch between toggle and push-to-talk. Only permitted while Idle.
    pub fn set_mode(&mut self, mode: InputMode) -> Result<(), KeyvoxError> {
        self.ensure_idle("mode switch")?;
        self.mode = mode;
        Ok(())
    }

    /// A discrete press edge from the key monitor. Drives the machine in
    /// toggle mode; push-to-talk uses [`hold_changed`](Self::hold_changed).
    pub async fn press_edge(&mut self) {
        if self.mode != InputMode::Toggle {
            tracing::trace!("Ignoring press edge outside toggle mode");
            return;
        }

        match self.state {
            RecorderState::Idle => self.start_recording().await,
            RecorderState::Recording { .. } => self.stop_and_handoff().await,
            RecorderState::Processing => {
                tracing::debug!("Press edge ignored while processing");
            }
        }
    }

    /// The monitored key's held state changed. Drives the machine in
    /// push-to-talk mode; anything that does not match the current state
    /// (release while Idle, press while Processing) is a no-op.
    pub async fn hold_changed(&mut self, active: bool) {
        if self.mode != InputMode::PushToTalk {
            tracing::trace!("Ignoring hold change outside push-to-talk mode");
            return;
        }

        if active && self.state.is_idle() {
            self.start_recording().await;
        } else if !active && self.state.is_recording() {
            self.stop_and_handoff().await;
        } else {
            tracing::trace!(
                "Hold change (active={}) is a no-op in state {}",
                active,
                self.state
            );
        }
    }

    /// The transcriber finished the in-flight segment. Success and failure
    /// both terminate it: the machine returns to Idle either way, with the
    /// error forwarded outward.
    pub fn transcription_finished(&mut self, result: SegmentResult) {
        if !self.state.is_processing() {
            tracing::warn!("Stray transcription result in state {}", self.state);
            return;
        }

        match result {
            Ok(text) => {
                tracing::info!("Transcription finished ({} chars)", text.chars().count());
                self.emit(ControllerEvent::Transcribed(text));
            }
            Err(e) => {
                tracing::error!("Transcription failed: {}", e);
                self.emit(ControllerEvent::Error(e.to_string()));
            }
        }

        self.set_state(RecorderState::Idle);
    }

    /// Abort an in-progress recording without transcription (safety
    /// timeout). The captured bytes are discarded.
    pub async fn cancel_recording(&mut self) {
        if !self.state.is_recording() {
            return;
        }

        if let Err(e) = self.capture.stop().await {
            tracing::warn!("Error stopping capture: {}", e);
        }
        self.buffer.clear();
        self.set_state(RecorderState::Idle);
    }

    async fn start_recording(&mut self) {
        // Fresh segment: discard anything left over in the buffer.
        self.buffer.clear();

        match self.capture.start(self.buffer.clone()).await {
            Ok(()) => {
                tracing::info!("Recording started");
                self.set_state(RecorderState::Recording {
                    started_at: Instant::now(),
                });
            }
            Err(e) => {
                // Never silently enter Recording without a live source.
                tracing::error!("Failed to start audio capture: {}", e);
                self.emit(ControllerEvent::Error(e.to_string()));
            }
        }
    }

    async fn stop_and_handoff(&mut self) {
        let duration = self.state.recording_duration().unwrap_or_default();
        tracing::info!("Recording stopped ({:.1}s)", duration.as_secs_f32());

        if let Err(e) = self.capture.stop().await {
            tracing::warn!("Error stopping capture: {}", e);
        }

        // The one atomic hand-off: view + reset under a single lock, so a
        // straggling capture callback cannot interleave between them.
        let segment = self.buffer.read_and_clear();

        if segment.is_empty() {
            tracing::debug!("Empty segment, nothing to transcribe");
            self.set_state(RecorderState::Idle);
            return;
        }

        self.set_state(RecorderState::Processing);

        let transcriber = self.transcriber.clone();
        let results_tx = self.results_tx.clone();
        tokio::task::spawn_blocking(move || {
            let result = transcriber.transcribe(&segment);
            let _ = results_tx.send(result);
        });
    }

    fn set_state(&mut self, state: RecorderState) {
        tracing::debug!("State: {} -> {}", self.state, state);
        self.state = state;
        self.emit(ControllerEvent::StateChanged(self.state.clone()));
    }

    fn emit(&self, event: ControllerEvent) {
        if self.events_tx.send(event).is_err() {
            tracing::trace!("Controller event receiver dropped");
        }
    }
}
