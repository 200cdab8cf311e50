//! Configuration loading and types for keyvox
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/keyvox/config.toml)
//! 3. Environment variables (KEYVOX_*)

use crate::error::KeyvoxError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Keyvox Configuration
#
# Location: ~/.config/keyvox/config.toml

# State file for external integrations (Waybar, polybar, etc.)
# Use "auto" for default location ($XDG_RUNTIME_DIR/keyvox/state),
# a custom path, or "disabled" to turn off. The daemon writes state
# ("idle", "recording", "processing") to this file whenever it changes.
state_file = "auto"

[hotkey]
# Key that controls recording
# Common choices: SCROLLLOCK, PAUSE, RIGHTALT, F13-F24
# Use `evtest` to find key names for your keyboard
key = "SCROLLLOCK"

# Input mode: "push_to_talk" or "toggle"
# - push_to_talk: Hold the key to record, release to transcribe (default)
# - toggle: Press once to start recording, press again to stop
# mode = "push_to_talk"

# Grab the input devices exclusively so the key never reaches the focused
# application while keyvox runs. The grab is device-wide (EVIOCGRAB), so
# this swallows ALL keys on the grabbed keyboard - leave off unless you
# dedicate a device (foot pedal, macro pad) to dictation.
# exclusive = false

# Enable built-in hotkey detection (default: true)
# enabled = true

[audio]
# Audio input device ("default" uses system default)
# List devices with: pactl list sources short
device = "default"

# Capture sample rate in Hz (mono, 16-bit PCM)
sample_rate = 24000

# Maximum recording duration in seconds (safety limit)
max_duration_secs = 120

[buffer]
# Buffering policy for captured PCM bytes:
# - "bounded": one recording segment, consumed once at stop time. An
#   overflowing write discards everything recorded so far (default).
# - "ring": rolling window that always holds the most recent bytes;
#   older audio is silently overwritten. 1 MiB holds ~21s at 24 kHz.
policy = "bounded"

# Capacity in bytes. 5 MiB holds ~109s of 24 kHz mono 16-bit PCM.
capacity_bytes = 5242880

[transcribe]
# OpenAI-compatible transcription endpoint
endpoint = "https://api.openai.com"

# Model name sent to the server
model = "whisper-1"

# API key. Prefer the KEYVOX_API_KEY environment variable over
# putting secrets in this file.
# api_key = "sk-..."

# Optional prompt to bias the transcription vocabulary
# prompt = ""

# Request timeout in seconds
timeout_secs = 30
"#;

/// Hotkey input mode
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Hold key to record, release to stop (default)
    #[default]
    PushToTalk,
    /// Press once to start recording, press again to stop
    Toggle,
}

/// Capture buffer policy
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BufferPolicy {
    /// One bounded segment; overflow discards prior content
    #[default]
    Bounded,
    /// Rolling window; oldest bytes silently overwritten
    Ring,
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub hotkey: HotkeyConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub buffer: BufferConfig,

    #[serde(default)]
    pub transcribe: TranscribeConfig,

    /// Optional path to state file for external integrations (e.g., Waybar).
    /// When set, the daemon writes current state ("idle", "recording",
    /// "processing") to this file whenever state changes.
    #[serde(default = "default_state_file")]
    pub state_file: Option<String>,
}

/// Hotkey detection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HotkeyConfig {
    /// Key name (evdev KEY_* constant name, without the KEY_ prefix)
    /// Examples: "SCROLLLOCK", "RIGHTALT", "PAUSE", "F24"
    #[serde(default = "default_hotkey_key")]
    pub key: String,

    /// Input mode: push_to_talk (hold to record) or toggle (press to start/stop)
    #[serde(default)]
    pub mode: InputMode,

    /// Grab input devices exclusively (EVIOCGRAB) so the key does not
    /// propagate to the focused application. Device-wide, not per-key.
    #[serde(default)]
    pub exclusive: bool,

    /// Enable built-in hotkey detection (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Audio capture configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioConfig {
    /// PipeWire/PulseAudio device name, or "default"
    #[serde(default = "default_device")]
    pub device: String,

    /// Capture sample rate in Hz (mono, 16-bit PCM)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Maximum recording duration in seconds (safety limit)
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: u32,
}

/// Capture buffer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BufferConfig {
    /// Buffering policy
    #[serde(default)]
    pub policy: BufferPolicy,

    /// Capacity in bytes
    #[serde(default = "default_capacity_bytes")]
    pub capacity_bytes: usize,
}

/// Remote transcription configuration
///
/// These values are opaque to the recording core; they are forwarded to
/// the transcription collaborator unvalidated (beyond the URL scheme).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscribeConfig {
    /// OpenAI-compatible endpoint base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name sent to the server
    #[serde(default = "default_model")]
    pub model: String,

    /// API key (KEYVOX_API_KEY environment variable takes precedence)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Optional prompt to bias the transcription vocabulary
    #[serde(default)]
    pub prompt: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_hotkey_key() -> String {
    "SCROLLLOCK".to_string()
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    24000
}

fn default_max_duration() -> u32 {
    120
}

fn default_capacity_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_endpoint() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "whisper-1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_state_file() -> Option<String> {
    Some("auto".to_string())
}

fn default_true() -> bool {
    true
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            key: default_hotkey_key(),
            mode: InputMode::default(),
            exclusive: false,
            enabled: true,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
            max_duration_secs: default_max_duration(),
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            policy: BufferPolicy::default(),
            capacity_bytes: default_capacity_bytes(),
        }
    }
}

impl Default for TranscribeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            prompt: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hotkey: HotkeyConfig::default(),
            audio: AudioConfig::default(),
            buffer: BufferConfig::default(),
            transcribe: TranscribeConfig::default(),
            state_file: default_state_file(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "keyvox")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the runtime directory for ephemeral files (state, sockets)
    pub fn runtime_dir() -> PathBuf {
        // Use XDG_RUNTIME_DIR if available, otherwise fall back to /tmp
        std::env::var("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
            .join("keyvox")
    }

    /// Resolve the state file path from config
    /// Returns None if state_file is not configured or explicitly disabled
    pub fn resolve_state_file(&self) -> Option<PathBuf> {
        self.state_file.as_ref().and_then(|path| {
            match path.to_lowercase().as_str() {
                "disabled" | "none" | "off" | "false" => None,
                "auto" => Some(Self::runtime_dir().join("state")),
                _ => Some(PathBuf::from(path)),
            }
        })
    }

    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "keyvox")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config, KeyvoxError> {
    // Start with defaults
    let mut config = Config::default();

    // Determine config file path
    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    // Load from file if it exists
    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| KeyvoxError::Config(format!("Failed to read config: {}", e)))?;

            config = toml::from_str(&contents)
                .map_err(|e| KeyvoxError::Config(format!("Invalid config: {}", e)))?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    // Override from environment variables
    if let Ok(key) = std::env::var("KEYVOX_HOTKEY") {
        config.hotkey.key = key;
    }
    if let Ok(model) = std::env::var("KEYVOX_MODEL") {
        config.transcribe.model = model;
    }
    if let Ok(api_key) = std::env::var("KEYVOX_API_KEY") {
        config.transcribe.api_key = Some(api_key);
    }

    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &Config, path: &Path) -> Result<(), KeyvoxError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| KeyvoxError::Config(format!("Failed to create config dir: {}", e)))?;
    }

    let contents = toml::to_string_pretty(config)
        .map_err(|e| KeyvoxError::Config(format!("Failed to serialize config: {}", e)))?;

    std::fs::write(path, contents)
        .map_err(|e| KeyvoxError::Config(format!("Failed to write config: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.hotkey.key, "SCROLLLOCK");
        assert_eq!(config.hotkey.mode, InputMode::PushToTalk);
        assert!(!config.hotkey.exclusive);
        assert_eq!(config.audio.sample_rate, 24000);
        assert_eq!(config.buffer.policy, BufferPolicy::Bounded);
        assert_eq!(config.buffer.capacity_bytes, 5 * 1024 * 1024);
        assert_eq!(config.transcribe.model, "whisper-1");
    }

    #[test]
    fn test_default_config_template_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.hotkey.key, "SCROLLLOCK");
        assert_eq!(config.buffer.capacity_bytes, 5242880);
        assert_eq!(config.state_file.as_deref(), Some("auto"));
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
            [hotkey]
            key = "PAUSE"
            mode = "toggle"
            exclusive = true

            [audio]
            device = "pipewire"
            sample_rate = 16000
            max_duration_secs = 30

            [buffer]
            policy = "ring"
            capacity_bytes = 1048576

            [transcribe]
            endpoint = "http://localhost:8080"
            model = "whisper-large"
            timeout_secs = 10
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.hotkey.key, "PAUSE");
        assert_eq!(config.hotkey.mode, InputMode::Toggle);
        assert!(config.hotkey.exclusive);
        assert_eq!(config.audio.device, "pipewire");
        assert_eq!(config.buffer.policy, BufferPolicy::Ring);
        assert_eq!(config.buffer.capacity_bytes, 1024 * 1024);
        assert_eq!(config.transcribe.endpoint, "http://localhost:8080");
        assert_eq!(config.transcribe.timeout_secs, 10);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let toml_str = r#"
            [hotkey]
            key = "F13"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.hotkey.key, "F13");
        assert_eq!(config.hotkey.mode, InputMode::PushToTalk); // default
        assert!(config.hotkey.enabled); // default
        assert_eq!(config.buffer.policy, BufferPolicy::Bounded); // default
        assert_eq!(config.transcribe.endpoint, "https://api.openai.com");
    }

    #[test]
    fn test_resolve_state_file() {
        let mut config = Config::default();

        config.state_file = Some("disabled".to_string());
        assert!(config.resolve_state_file().is_none());

        config.state_file = Some("/run/user/1000/keyvox/state".to_string());
        assert_eq!(
            config.resolve_state_file(),
            Some(PathBuf::from("/run/user/1000/keyvox/state"))
        );

        config.state_file = Some("auto".to_string());
        let resolved = config.resolve_state_file().unwrap();
        assert!(resolved.ends_with("keyvox/state"));
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.hotkey.key = "F24".to_string();
        config.buffer.policy = BufferPolicy::Ring;
        config.buffer.capacity_bytes = 2048;

        save_config(&config, &path).unwrap();
        let reloaded = load_config(Some(&path)).unwrap();

        assert_eq!(reloaded.hotkey.key, "F24");
        assert_eq!(reloaded.buffer.policy, BufferPolicy::Ring);
        assert_eq!(reloaded.buffer.capacity_bytes, 2048);
    }
}
