use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
pub const CONFIRM_COUNTDOWN_SECS: u32 = 60; // fail-open: executes when it reaches zero
pub const SYNC_TIMEOUT_SECS: u64 = 10;
pub const ONETIME_TOLERANCE_SECS: i64 = 60; // ±60 s around the scheduled minute
pub const SKIP_PROBE_LIMIT: usize = 5;
pub const DEVICE_SLOT_CAPACITY: usize = 10;
pub const DEFAULT_DEVICE_PORT: u16 = 80;
pub const DEFAULT_DEVICE_BIND: &str = "0.0.0.0";
pub const DEFAULT_BROADCAST_ADDR: &str = "255.255.255.255:9";
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 540; // JST
pub const DEFAULT_REMOTE_POLL_SECS: u64 = 10;

/// Top-level config (smartpower.toml + SMARTPOWER_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmartPowerConfig {
    #[serde(default)]
    pub desktop: DesktopConfig,
    #[serde(default)]
    pub device: DeviceConfig,
}

/// Settings for the desktop scheduler binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesktopConfig {
    /// Flat JSON state file holding every schedule.
    #[serde(default = "default_state_path")]
    pub state_path: String,
    /// How often the monitor samples the wall clock. Must stay well below a minute.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_countdown")]
    pub confirm_countdown_secs: u32,
    #[serde(default = "default_sync_timeout")]
    pub sync_timeout_secs: u64,
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            confirm_countdown_secs: CONFIRM_COUNTDOWN_SECS,
            sync_timeout_secs: SYNC_TIMEOUT_SECS,
        }
    }
}

/// Settings for the Wake-on-LAN device binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_device_bind")]
    pub bind: String,
    #[serde(default = "default_device_port")]
    pub port: u16,
    /// Where magic packets are sent (UDP, usually the subnet broadcast on port 9).
    #[serde(default = "default_broadcast_addr")]
    pub broadcast_addr: String,
    /// Offset of the device's local clock from UTC.
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,
    /// Informational; the host OS is expected to keep the clock in sync.
    #[serde(default)]
    pub ntp_server: Option<String>,
    /// Log every schedule check, not only matches.
    #[serde(default)]
    pub debug: bool,
    /// Named wake targets for `/wol_by_name`.
    #[serde(default)]
    pub targets: Vec<WakeTarget>,
    pub remote_trigger: Option<RemoteTriggerConfig>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            bind: default_device_bind(),
            port: DEFAULT_DEVICE_PORT,
            broadcast_addr: default_broadcast_addr(),
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            ntp_server: None,
            debug: false,
            targets: Vec::new(),
            remote_trigger: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WakeTarget {
    pub name: String,
    /// Colon-separated hex hardware address.
    pub mac: String,
}

/// Remote relay polled by the device for on-demand wake requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteTriggerConfig {
    pub url: String,
    #[serde(default = "default_remote_poll_secs")]
    pub poll_secs: u64,
}

fn default_state_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.smartpower/state.json", home)
}
fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}
fn default_countdown() -> u32 {
    CONFIRM_COUNTDOWN_SECS
}
fn default_sync_timeout() -> u64 {
    SYNC_TIMEOUT_SECS
}
fn default_device_bind() -> String {
    DEFAULT_DEVICE_BIND.to_string()
}
fn default_device_port() -> u16 {
    DEFAULT_DEVICE_PORT
}
fn default_broadcast_addr() -> String {
    DEFAULT_BROADCAST_ADDR.to_string()
}
fn default_utc_offset() -> i32 {
    DEFAULT_UTC_OFFSET_MINUTES
}
fn default_remote_poll_secs() -> u64 {
    DEFAULT_REMOTE_POLL_SECS
}

impl SmartPowerConfig {
    /// Load config from a TOML file with SMARTPOWER_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `SMARTPOWER_DESKTOP__POLL_INTERVAL_MS=500`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("SMARTPOWER_").split("__"))
            .extract()
            .map_err(|e| crate::error::SmartPowerError::Config(e.to_string()))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.smartpower/smartpower.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = SmartPowerConfig::load(Some("/nonexistent/smartpower.toml")).unwrap();
        assert_eq!(cfg.desktop.confirm_countdown_secs, CONFIRM_COUNTDOWN_SECS);
        assert_eq!(cfg.desktop.sync_timeout_secs, SYNC_TIMEOUT_SECS);
        assert_eq!(cfg.device.port, DEFAULT_DEVICE_PORT);
        assert!(cfg.device.remote_trigger.is_none());
    }

    #[test]
    fn toml_overrides_nested_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smartpower.toml");
        std::fs::write(
            &path,
            r#"
[desktop]
poll_interval_ms = 250

[device]
port = 8080

[[device.targets]]
name = "desk"
mac = "AA:BB:CC:DD:EE:FF"

[device.remote_trigger]
url = "https://relay.example/wol"
"#,
        )
        .unwrap();

        let cfg = SmartPowerConfig::load(path.to_str()).unwrap();
        assert_eq!(cfg.desktop.poll_interval_ms, 250);
        assert_eq!(cfg.device.port, 8080);
        assert_eq!(cfg.device.targets[0].name, "desk");
        let remote = cfg.device.remote_trigger.unwrap();
        assert_eq!(remote.poll_secs, DEFAULT_REMOTE_POLL_SECS);
    }
}
