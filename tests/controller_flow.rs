//! End-to-end recording workflow tests
//!
//! Drives the controller with scripted capture and transcription
//! collaborators: the capture stub plays the audio callback's role by
//! writing a payload into the shared buffer, and the transcriber records
//! exactly what was handed to it.

use async_trait::async_trait;
use keyvox::audio::AudioCapture;
use keyvox::buffer::{create_buffer, SharedBuffer};
use keyvox::config::{BufferPolicy, InputMode};
use keyvox::controller::{ControllerEvent, RecordingController, SegmentResult};
use keyvox::error::{AudioError, KeyvoxError, TranscribeError};
use keyvox::transcribe::Transcriber;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Capture stub that "records" a fixed payload: it writes the payload
/// into the sink on start, the way the real callback thread would.
struct ScriptedCapture {
    payload: Vec<u8>,
    running: bool,
}

#[async_trait]
impl AudioCapture for ScriptedCapture {
    async fn start(&mut self, sink: SharedBuffer) -> Result<(), AudioError> {
        sink.write(&self.payload);
        self.running = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), AudioError> {
        self.running = false;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

/// Capture stub with no audio source available
struct UnavailableCapture;

#[async_trait]
impl AudioCapture for UnavailableCapture {
    async fn start(&mut self, _sink: SharedBuffer) -> Result<(), AudioError> {
        Err(AudioError::CaptureUnavailable)
    }

    async fn stop(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn is_running(&self) -> bool {
        false
    }
}

/// Transcriber that records what it was handed
struct RecordingTranscriber {
    received: Arc<Mutex<Vec<Vec<u8>>>>,
    reply: Result<String, String>,
}

impl Transcriber for RecordingTranscriber {
    fn transcribe(&self, pcm: &[u8]) -> Result<String, TranscribeError> {
        self.received.lock().unwrap().push(pcm.to_vec());
        self.reply
            .clone()
            .map_err(TranscribeError::RemoteError)
    }
}

struct Harness {
    controller: RecordingController,
    events: mpsc::UnboundedReceiver<ControllerEvent>,
    results: mpsc::UnboundedReceiver<SegmentResult>,
    received: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Harness {
    fn new(mode: InputMode, payload: Vec<u8>, reply: Result<String, String>) -> Self {
        let buffer = create_buffer(BufferPolicy::Bounded, 1024).unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let transcriber = Arc::new(RecordingTranscriber {
            received: received.clone(),
            reply,
        });
        let capture = Box::new(ScriptedCapture {
            payload,
            running: false,
        });

        let (controller, events, results) =
            RecordingController::new(mode, buffer, capture, transcriber);

        Self {
            controller,
            events,
            results,
            received,
        }
    }

    fn drain_state_names(&mut self) -> Vec<&'static str> {
        let mut names = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            if let ControllerEvent::StateChanged(state) = event {
                names.push(state.as_str());
            }
        }
        names
    }
}

#[tokio::test]
async fn toggle_double_press_transcribes_the_captured_segment() {
    let payload: Vec<u8> = (0..500).map(|i| (i % 250) as u8).collect();
    let mut h = Harness::new(
        InputMode::Toggle,
        payload.clone(),
        Ok("five hundred bytes of speech".to_string()),
    );

    h.controller.press_edge().await;
    assert!(h.controller.state().is_recording());

    h.controller.press_edge().await;
    assert!(h.controller.state().is_processing());

    let result = h.results.recv().await.unwrap();
    h.controller.transcription_finished(result);
    assert!(h.controller.state().is_idle());

    // the transcriber got exactly the bytes the capture produced
    let received = h.received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0], payload);
    drop(received);

    assert_eq!(
        h.drain_state_names(),
        vec!["recording", "processing", "idle"]
    );
}

#[tokio::test]
async fn push_to_talk_hold_and_release_cycle() {
    let mut h = Harness::new(InputMode::PushToTalk, vec![42; 100], Ok("ok".to_string()));

    h.controller.hold_changed(true).await;
    assert!(h.controller.state().is_recording());

    h.controller.hold_changed(false).await;
    assert!(h.controller.state().is_processing());

    let result = h.results.recv().await.unwrap();
    assert_eq!(result.unwrap(), "ok");
}

#[tokio::test]
async fn push_to_talk_stray_events_are_noops() {
    let mut h = Harness::new(InputMode::PushToTalk, vec![1; 10], Ok("x".to_string()));

    // release while Idle
    h.controller.hold_changed(false).await;
    assert!(h.controller.state().is_idle());

    h.controller.hold_changed(true).await;
    // a second press while already recording
    h.controller.hold_changed(true).await;
    assert!(h.controller.state().is_recording());

    h.controller.hold_changed(false).await;
    // release again while processing
    h.controller.hold_changed(false).await;
    assert!(h.controller.state().is_processing());

    // exactly one segment was handed off despite the duplicate events
    let result = h.results.recv().await.unwrap();
    h.controller.transcription_finished(result);
    assert!(h.results.try_recv().is_err());
    assert_eq!(h.received.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn capture_unavailable_surfaces_error_and_stays_idle() {
    let buffer = create_buffer(BufferPolicy::Bounded, 256).unwrap();
    let transcriber = Arc::new(RecordingTranscriber {
        received: Arc::new(Mutex::new(Vec::new())),
        reply: Ok("unused".to_string()),
    });
    let (mut controller, mut events, _results) = RecordingController::new(
        InputMode::Toggle,
        buffer,
        Box::new(UnavailableCapture),
        transcriber,
    );

    controller.press_edge().await;
    assert!(controller.state().is_idle());

    match events.try_recv().unwrap() {
        ControllerEvent::Error(message) => {
            assert!(message.contains("audio input"), "got: {}", message);
        }
        other => panic!("expected error event, got {:?}", other),
    }
}

#[tokio::test]
async fn transcription_failure_still_terminates_the_segment() {
    let mut h = Harness::new(
        InputMode::Toggle,
        vec![9; 64],
        Err("server exploded".to_string()),
    );

    h.controller.press_edge().await;
    h.controller.press_edge().await;

    let result = h.results.recv().await.unwrap();
    assert!(result.is_err());
    h.controller.transcription_finished(result);

    // failure terminates the segment the same way success does
    assert!(h.controller.state().is_idle());

    let names = h.drain_state_names();
    assert_eq!(names, vec!["recording", "processing", "idle"]);
}

#[tokio::test]
async fn second_segment_starts_from_a_clean_buffer() {
    let mut h = Harness::new(InputMode::Toggle, vec![5; 200], Ok("first".to_string()));

    h.controller.press_edge().await;
    h.controller.press_edge().await;
    let result = h.results.recv().await.unwrap();
    h.controller.transcription_finished(result);

    h.controller.press_edge().await;
    h.controller.press_edge().await;
    let result = h.results.recv().await.unwrap();
    h.controller.transcription_finished(result);

    let received = h.received.lock().unwrap();
    assert_eq!(received.len(), 2);
    // no leftover bytes from the first segment bled into the second
    assert_eq!(received[0].len(), 200);
    assert_eq!(received[1].len(), 200);
}

#[tokio::test]
async fn reconfiguration_is_rejected_mid_segment() {
    let mut h = Harness::new(InputMode::Toggle, vec![3; 30], Ok("t".to_string()));

    h.controller.press_edge().await;
    assert!(matches!(
        h.controller.set_mode(InputMode::PushToTalk),
        Err(KeyvoxError::NotIdle(_))
    ));
    assert!(h.controller.ensure_idle("key rebind").is_err());

    h.controller.press_edge().await;
    let result = h.results.recv().await.unwrap();
    h.controller.transcription_finished(result);

    assert!(h.controller.set_mode(InputMode::PushToTalk).is_ok());
    assert_eq!(h.controller.mode(), InputMode::PushToTalk);
}
