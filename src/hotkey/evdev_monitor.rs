//! evdev-based key monitor
//!
//! A dedicated thread polls keyboard devices for press/release of the
//! configured key. The held state is published through a lock-free
//! atomic; discrete edges go out over a channel so toggle mode gets a
//! deterministic notification instead of sampling the flag on a timer.
//!
//! Stopping is cooperative: the thread checks a stop flag each loop
//! iteration, and teardown joins it before the devices (and any
//! exclusive grab on them) are released.

use super::HotkeyEvent;
use crate::config::HotkeyConfig;
use crate::error::HotkeyError;
use evdev::{Device, InputEventKind, Key};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;

/// Sleep between polls; bounds both CPU cost and stop latency.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Monitors one key across all keyboard devices.
///
/// One monitor per binding: to rebind, drop (or [`stop`](Self::stop))
/// the old monitor and start a new one. Dropping blocks until the
/// polling thread has observed the stop flag and exited, which in turn
/// releases any device grab. No system-wide grab outlives the monitor.
pub struct KeyMonitor {
    is_active: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl KeyMonitor {
    /// Resolve the configured key, discover keyboard devices, and start
    /// the polling thread. Returns the monitor handle plus the receiver
    /// for press/release edges.
    ///
    /// On failure (unknown key name, no devices, no permission) no thread
    /// is started; callers are expected to degrade rather than crash, with
    /// the held state reading permanently false.
    pub fn start(
        config: &HotkeyConfig,
    ) -> Result<(Self, mpsc::Receiver<HotkeyEvent>), HotkeyError> {
        let target_key = parse_key_name(&config.key)?;
        let device_paths = find_keyboard_devices()?;

        if device_paths.is_empty() {
            return Err(HotkeyError::NoKeyboard);
        }

        tracing::debug!(
            "Found {} keyboard device(s): {:?}",
            device_paths.len(),
            device_paths
        );

        let is_active = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel(32);

        let thread = {
            let is_active = is_active.clone();
            let stop = stop.clone();
            let exclusive = config.exclusive;
            thread::Builder::new()
                .name("keyvox-hotkey".into())
                .spawn(move || {
                    monitor_loop(device_paths, target_key, exclusive, is_active, stop, tx);
                })
                .map_err(|e| HotkeyError::Evdev(format!("Failed to spawn thread: {}", e)))?
        };

        Ok((
            Self {
                is_active,
                stop,
                thread: Some(thread),
            },
            rx,
        ))
    }

    /// Current held state of the monitored key. Lock-free; safe to poll
    /// from any thread.
    pub fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }

    /// Signal the polling thread and wait for it to exit. Idempotent.
    /// Join latency is bounded by the poll interval.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                tracing::warn!("Hotkey monitor thread panicked");
            }
        }
    }
}

impl Drop for KeyMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Keyboard devices held by the polling thread, with the grab state tied
/// to the value's lifetime: dropping this releases every grab.
struct MonitorHandle {
    devices: Vec<Device>,
    grabbed: bool,
}

impl MonitorHandle {
    /// Open the devices in non-blocking mode; optionally grab them.
    fn open(paths: &[PathBuf], exclusive: bool) -> Self {
        let mut devices: Vec<Device> = paths
            .iter()
            .filter_map(|path| match Device::open(path) {
                Ok(device) => {
                    // Non-blocking so fetch_events returns immediately
                    // when no events are pending.
                    let fd = device.as_raw_fd();
                    unsafe {
                        let flags = libc::fcntl(fd, libc::F_GETFL);
                        if flags != -1 {
                            libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
                        }
                    }
                    tracing::debug!("Opened device (non-blocking): {:?}", path);
                    Some(device)
                }
                Err(e) => {
                    tracing::warn!("Failed to open {:?}: {}", path, e);
                    None
                }
            })
            .collect();

        let mut grabbed = false;
        if exclusive {
            for device in &mut devices {
                match device.grab() {
                    Ok(()) => grabbed = true,
                    Err(e) => {
                        tracing::warn!(
                            "Exclusive grab failed for {:?}: {}",
                            device.name().unwrap_or("unknown"),
                            e
                        );
                    }
                }
            }
            if grabbed {
                tracing::info!("Input devices grabbed exclusively");
            }
        }

        Self { devices, grabbed }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        if self.grabbed {
            for device in &mut self.devices {
                if let Err(e) = device.ungrab() {
                    tracing::warn!("Failed to release device grab: {}", e);
                }
            }
            tracing::debug!("Device grabs released");
        }
    }
}

/// Edge detection for one key: deduplicates repeats and ignores other
/// key codes. Pure state, separated from the device loop so it can be
/// driven by simulated events in tests.
struct KeyTracker {
    target: Key,
    was_pressed: bool,
}

impl KeyTracker {
    fn new(target: Key) -> Self {
        Self {
            target,
            was_pressed: false,
        }
    }

    /// Apply one raw key event (value 1 = press, 0 = release, 2 = repeat).
    /// Returns the edge to publish, if any.
    fn apply(&mut self, key: Key, value: i32) -> Option<HotkeyEvent> {
        if key != self.target {
            return None;
        }
        match value {
            1 if !self.was_pressed => {
                self.was_pressed = true;
                Some(HotkeyEvent::Pressed)
            }
            0 if self.was_pressed => {
                self.was_pressed = false;
                Some(HotkeyEvent::Released)
            }
            // repeats (2) and redundant press/release are swallowed
            _ => None,
        }
    }
}

/// Main polling loop running on the dedicated thread
fn monitor_loop(
    device_paths: Vec<PathBuf>,
    target_key: Key,
    exclusive: bool,
    is_active: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    tx: mpsc::Sender<HotkeyEvent>,
) {
    let mut handle = MonitorHandle::open(&device_paths, exclusive);

    if handle.devices.is_empty() {
        tracing::error!("No keyboard devices could be opened");
        return;
    }

    let mut tracker = KeyTracker::new(target_key);

    tracing::info!("Monitoring {:?}", target_key);

    while !stop.load(Ordering::SeqCst) {
        for device in &mut handle.devices {
            let events = match device.fetch_events() {
                Ok(events) => events,
                // Non-blocking read with nothing pending
                Err(_) => continue,
            };
            for event in events {
                if let InputEventKind::Key(key) = event.kind() {
                    if let Some(edge) = tracker.apply(key, event.value()) {
                        is_active.store(edge == HotkeyEvent::Pressed, Ordering::SeqCst);
                        tracing::debug!("Hotkey {:?}", edge);
                        if tx.blocking_send(edge).is_err() {
                            // Receiver gone; keep the atomic up to date
                            // for anyone still polling the held state.
                            tracing::trace!("Hotkey event receiver dropped");
                        }
                    }
                }
            }
        }

        thread::sleep(POLL_INTERVAL);
    }

    tracing::debug!("Hotkey monitor stopping");
    // MonitorHandle drop releases any grab after the loop exits.
    drop(handle);
}

/// Find all keyboard input devices under /dev/input
fn find_keyboard_devices() -> Result<Vec<PathBuf>, HotkeyError> {
    let mut keyboards = Vec::new();

    let input_dir = std::fs::read_dir("/dev/input")
        .map_err(|e| HotkeyError::DeviceAccess(format!("/dev/input: {}", e)))?;

    for entry in input_dir {
        let entry = entry.map_err(|e| HotkeyError::DeviceAccess(e.to_string()))?;
        let path = entry.path();

        let is_event_device = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false);

        if !is_event_device {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => {
                // A keyboard should have at least some letter keys
                let has_keys = device
                    .supported_keys()
                    .map(|keys| {
                        keys.contains(Key::KEY_A)
                            && keys.contains(Key::KEY_Z)
                            && keys.contains(Key::KEY_ENTER)
                    })
                    .unwrap_or(false);

                if has_keys {
                    tracing::debug!(
                        "Found keyboard: {:?} ({:?})",
                        path,
                        device.name().unwrap_or("unknown")
                    );
                    keyboards.push(path);
                }
            }
            Err(e) => {
                // Permission denied is common for non-input-group users
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    return Err(HotkeyError::DeviceAccess(path.display().to_string()));
                }
                // Other errors (device busy, etc.) - just skip
                tracing::trace!("Skipping {:?}: {}", path, e);
            }
        }
    }

    Ok(keyboards)
}

const FUNCTION_KEYS: [Key; 24] = [
    Key::KEY_F1,
    Key::KEY_F2,
    Key::KEY_F3,
    Key::KEY_F4,
    Key::KEY_F5,
    Key::KEY_F6,
    Key::KEY_F7,
    Key::KEY_F8,
    Key::KEY_F9,
    Key::KEY_F10,
    Key::KEY_F11,
    Key::KEY_F12,
    Key::KEY_F13,
    Key::KEY_F14,
    Key::KEY_F15,
    Key::KEY_F16,
    Key::KEY_F17,
    Key::KEY_F18,
    Key::KEY_F19,
    Key::KEY_F20,
    Key::KEY_F21,
    Key::KEY_F22,
    Key::KEY_F23,
    Key::KEY_F24,
];

/// Parse a key name string to an evdev Key
pub fn parse_key_name(name: &str) -> Result<Key, HotkeyError> {
    // Normalize: uppercase, - and space become _
    let normalized: String = name
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();

    let bare = normalized.strip_prefix("KEY_").unwrap_or(&normalized);

    // Function keys F1-F24 (F13-F24 are often unbound and make good hotkeys)
    if let Some(n) = bare.strip_prefix('F').and_then(|s| s.parse::<usize>().ok()) {
        if (1..=FUNCTION_KEYS.len()).contains(&n) {
            return Ok(FUNCTION_KEYS[n - 1]);
        }
    }

    let key = match bare {
        // Lock keys (good hotkey candidates)
        "SCROLLLOCK" => Key::KEY_SCROLLLOCK,
        "PAUSE" => Key::KEY_PAUSE,
        "CAPSLOCK" => Key::KEY_CAPSLOCK,
        "NUMLOCK" => Key::KEY_NUMLOCK,
        "INSERT" => Key::KEY_INSERT,

        // Modifier keys
        "LEFTALT" | "LALT" => Key::KEY_LEFTALT,
        "RIGHTALT" | "RALT" => Key::KEY_RIGHTALT,
        "LEFTCTRL" | "LCTRL" => Key::KEY_LEFTCTRL,
        "RIGHTCTRL" | "RCTRL" => Key::KEY_RIGHTCTRL,
        "LEFTSHIFT" | "LSHIFT" => Key::KEY_LEFTSHIFT,
        "RIGHTSHIFT" | "RSHIFT" => Key::KEY_RIGHTSHIFT,
        "LEFTMETA" | "LMETA" | "SUPER" => Key::KEY_LEFTMETA,
        "RIGHTMETA" | "RMETA" => Key::KEY_RIGHTMETA,

        // Navigation keys
        "HOME" => Key::KEY_HOME,
        "END" => Key::KEY_END,
        "PAGEUP" => Key::KEY_PAGEUP,
        "PAGEDOWN" => Key::KEY_PAGEDOWN,
        "DELETE" => Key::KEY_DELETE,

        // Common keys
        "SPACE" => Key::KEY_SPACE,
        "ENTER" => Key::KEY_ENTER,
        "TAB" => Key::KEY_TAB,
        "BACKSPACE" => Key::KEY_BACKSPACE,
        "ESC" | "ESCAPE" => Key::KEY_ESC,
        "GRAVE" | "BACKTICK" => Key::KEY_GRAVE,

        _ => {
            return Err(HotkeyError::UnknownKey(format!(
                "{}. Try: SCROLLLOCK, PAUSE, F13-F24, or run 'evtest' to find key names",
                name
            )));
        }
    };

    Ok(key)
}
