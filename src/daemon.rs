//! Daemon module - main event loop orchestration
//!
//! Wires the key monitor into the recording controller and surfaces
//! controller notifications outward (log output plus an optional state
//! file that status bars and other integrations can watch).

use crate::audio;
use crate::buffer;
use crate::config::{Config, InputMode};
use crate::controller::{ControllerEvent, RecordingController};
use crate::error::{KeyvoxError, Result};
use crate::hotkey::{HotkeyEvent, KeyMonitor};
use crate::transcribe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};

/// Write state to file for external integrations (e.g., Waybar)
fn write_state_file(path: &PathBuf, state: &str) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create state file directory: {}", e);
            return;
        }
    }

    if let Err(e) = std::fs::write(path, state) {
        tracing::warn!("Failed to write state file: {}", e);
    } else {
        tracing::trace!("State file updated: {}", state);
    }
}

/// Remove state file on shutdown
fn cleanup_state_file(path: &PathBuf) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove state file: {}", e);
        }
    }
}

/// Main daemon that orchestrates all components
pub struct Daemon {
    config: Config,
    state_file_path: Option<PathBuf>,
}

impl Daemon {
    /// Create a new daemon with the given configuration
    pub fn new(config: Config) -> Self {
        let state_file_path = config.resolve_state_file();
        Self {
            config,
            state_file_path,
        }
    }

    /// Update the state file if configured
    fn update_state(&self, state_name: &str) {
        if let Some(ref path) = self.state_file_path {
            write_state_file(path, state_name);
        }
    }

    /// Run the daemon main loop
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("Starting keyvox daemon");

        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| KeyvoxError::Config(format!("Failed to set up SIGTERM handler: {}", e)))?;

        if let Some(ref path) = self.state_file_path {
            tracing::info!("State file: {:?}", path);
        }

        // Capture buffer shared between the audio callback and controller
        let shared_buffer = buffer::create_buffer(
            self.config.buffer.policy,
            self.config.buffer.capacity_bytes,
        )?;
        tracing::info!(
            "Capture buffer: {:?}, {} bytes",
            self.config.buffer.policy,
            self.config.buffer.capacity_bytes
        );

        let capture = audio::create_capture(&self.config.audio)?;
        let transcriber: Arc<dyn transcribe::Transcriber> = Arc::from(
            transcribe::create_transcriber(&self.config.transcribe, self.config.audio.sample_rate)?,
        );

        let (mut controller, mut events_rx, mut results_rx) = RecordingController::new(
            self.config.hotkey.mode,
            shared_buffer,
            capture,
            transcriber,
        );

        // Key monitor; on failure the hotkey feature degrades instead of
        // taking the daemon down.
        let (mut monitor, mut hotkey_rx) = if self.config.hotkey.enabled {
            match KeyMonitor::start(&self.config.hotkey) {
                Ok((monitor, rx)) => {
                    let mode_desc = match self.config.hotkey.mode {
                        InputMode::PushToTalk => "hold to record, release to transcribe",
                        InputMode::Toggle => "press to start/stop recording",
                    };
                    tracing::info!(
                        "Listening for hotkey: {} ({})",
                        self.config.hotkey.key,
                        mode_desc
                    );
                    (Some(monitor), Some(rx))
                }
                Err(e) => {
                    tracing::error!("Hotkey unavailable, continuing without it: {}", e);
                    (None, None)
                }
            }
        } else {
            tracing::info!("Built-in hotkey disabled");
            (None, None)
        };

        let max_duration = Duration::from_secs(self.config.audio.max_duration_secs as u64);

        self.update_state("idle");

        // Main event loop
        loop {
            tokio::select! {
                // Key monitor edges (only if the monitor is running)
                Some(hotkey_event) = async {
                    match &mut hotkey_rx {
                        Some(rx) => rx.recv().await,
                        None => std::future::pending().await,
                    }
                } => {
                    match (hotkey_event, controller.mode()) {
                        (HotkeyEvent::Pressed, InputMode::Toggle) => {
                            controller.press_edge().await;
                        }
                        (HotkeyEvent::Released, InputMode::Toggle) => {
                            tracing::trace!("Ignoring release edge in toggle mode");
                        }
                        (HotkeyEvent::Pressed, InputMode::PushToTalk) => {
                            controller.hold_changed(true).await;
                        }
                        (HotkeyEvent::Released, InputMode::PushToTalk) => {
                            controller.hold_changed(false).await;
                        }
                    }
                }

                // Controller notifications toward the outside world
                Some(event) = events_rx.recv() => {
                    match event {
                        ControllerEvent::StateChanged(state) => {
                            tracing::info!("State: {}", state);
                            self.update_state(state.as_str());
                        }
                        ControllerEvent::Transcribed(text) => {
                            tracing::info!("Transcribed: {:?}", text);
                            println!("{}", text);
                        }
                        ControllerEvent::Error(message) => {
                            tracing::error!("{}", message);
                        }
                    }
                }

                // Segment results routed back into the state machine
                Some(result) = results_rx.recv() => {
                    controller.transcription_finished(result);
                }

                // Safety timeout for runaway recordings
                _ = tokio::time::sleep(Duration::from_millis(100)), if controller.state().is_recording() => {
                    if let Some(duration) = controller.state().recording_duration() {
                        if duration > max_duration {
                            tracing::warn!(
                                "Recording timeout ({:.0}s limit), discarding segment",
                                max_duration.as_secs_f32()
                            );
                            controller.cancel_recording().await;
                        }
                    }
                }

                // Graceful shutdown
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT, shutting down...");
                    break;
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down...");
                    break;
                }
            }
        }

        // Cleanup: join the monitor thread (releasing any device grab)
        // before removing the state file.
        if let Some(ref mut monitor) = monitor {
            monitor.stop();
        }

        if let Some(ref path) = self.state_file_path {
            cleanup_state_file(path);
        }

        tracing::info!("Daemon stopped");

        Ok(())
    }
}
