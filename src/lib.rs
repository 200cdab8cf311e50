//! Keyvox: hotkey-driven dictation core for Linux
//!
//! This library provides the core functionality for:
//! - Detecting one hotkey's press/hold state via evdev (kernel-level,
//!   works on X11 and all Wayland compositors)
//! - Buffering captured PCM bytes in memory under one of two policies:
//!   a rolling ring buffer or a bounded one-shot segment buffer
//! - Driving the recording state machine (Idle -> Recording -> Processing)
//!   from toggle presses or push-to-talk hold state
//! - Handing finished segments to an OpenAI-compatible transcription
//!   endpoint
//!
//! # Architecture
//!
//! ```text
//!          ┌──────────────┐  press/release   ┌────────────────────┐
//!          │  KeyMonitor  │ ───────────────▶ │       Daemon       │
//!          │   (evdev)    │   edge channel   │  (tokio select)    │
//!          └──────────────┘                  └────────────────────┘
//!                                                      │ edges, results
//!                                                      ▼
//!          ┌──────────────┐   write(bytes)   ┌────────────────────┐
//!          │ AudioCapture │ ───────────────▶ │    SharedBuffer    │
//!          │    (cpal)    │  callback thread │  (ring | bounded)  │
//!          └──────────────┘                  └────────────────────┘
//!                  ▲                                   │ read_and_clear
//!            start │ stop                              ▼
//!          ┌─────────────────────────────────────────────────────────┐
//!          │                  RecordingController                    │
//!          │   Idle ──▶ Recording ──▶ Processing ──▶ Idle            │
//!          └─────────────────────────────────────────────────────────┘
//!                                                      │ segment
//!                                                      ▼
//!                                            ┌────────────────────┐
//!                                            │    Transcriber     │
//!                                            │  (remote, ureq)    │
//!                                            └────────────────────┘
//! ```

pub mod audio;
pub mod buffer;
pub mod config;
pub mod controller;
pub mod daemon;
pub mod error;
pub mod hotkey;
pub mod state;
pub mod transcribe;

pub use buffer::SharedBuffer;
pub use config::Config;
pub use controller::RecordingController;
pub use daemon::Daemon;
pub use error::{KeyvoxError, Result};
pub use state::RecorderState;
