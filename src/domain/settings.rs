use crate::domain::descriptor::SdpSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_false")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_false(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_false(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "bt_hid_mouse".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// Shape of the in-process Bluetooth stack used when no platform backend is wired in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopbackSettings {
    #[serde(default = "default_true")]
    pub adapter_present: bool,
    #[serde(default = "default_true")]
    pub adapter_enabled: bool,
    /// Host that attaches as soon as the HID app is registered.
    #[serde(default)]
    pub auto_connect_host: Option<String>,
}

impl Default for LoopbackSettings {
    fn default() -> Self {
        Self {
            adapter_present: true,
            adapter_enabled: true,
            auto_connect_host: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_settings: LogSettings,

    // RPC
    #[serde(default = "default_socket_name")]
    pub socket_name: String,

    // HID
    #[serde(default = "default_click_release_delay_ms")]
    pub click_release_delay_ms: u64,
    #[serde(default)]
    pub sdp: SdpSettings,

    // Platform
    #[serde(default = "default_true")]
    pub permissions_granted: bool,
    #[serde(default)]
    pub loopback: LoopbackSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_settings: LogSettings::default(),
            socket_name: default_socket_name(),
            click_release_delay_ms: default_click_release_delay_ms(),
            sdp: SdpSettings::default(),
            permissions_granted: true,
            loopback: LoopbackSettings::default(),
        }
    }
}

impl Settings {
    pub fn click_release_delay(&self) -> Duration {
        Duration::from_millis(self.click_release_delay_ms)
    }
}

fn default_socket_name() -> String {
    "bt_hid_mouse.sock".to_string()
}
fn default_click_release_delay_ms() -> u64 {
    50
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::with_path(settings_path))
    }

    /// Load from an explicit file, falling back to defaults if it is missing or unreadable.
    pub fn with_path(settings_path: PathBuf) -> Self {
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();
        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("BtHidMouse");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}
