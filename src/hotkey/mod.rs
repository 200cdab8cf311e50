//! Hotkey monitoring module
//!
//! Detects raw press/hold state of one designated key system-wide,
//! independent of window focus, using the Linux evdev interface. This
//! operates at the kernel input layer, so it works on X11 and on every
//! Wayland compositor alike.
//!
//! Requires the user to be in the 'input' group.

#[cfg(target_os = "linux")]
pub mod evdev_monitor;

#[cfg(target_os = "linux")]
pub use evdev_monitor::KeyMonitor;

/// Edge events emitted by the key monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// The monitored key went down
    Pressed,
    /// The monitored key came back up
    Released,
}
