pub mod daemon;
pub mod device;
pub mod schedule;
pub mod settings;

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDateTime;
use smartpower_core::config::DesktopConfig;
use smartpower_core::types::parse_hhmm;
use smartpower_scheduler::{JsonFileBackend, ScheduleState, ScheduleStore, SharedStore};

use crate::sync_client::{DeviceClient, SyncError};

/// Everything a command handler needs.
pub struct Context {
    pub config: DesktopConfig,
}

impl Context {
    pub fn new(config: DesktopConfig) -> Self {
        Self { config }
    }

    pub fn open_store(&self) -> ScheduleStore {
        let backend = JsonFileBackend::new(&self.config.state_path);
        ScheduleStore::open(Box::new(backend), now())
    }

    pub fn open_shared(&self) -> SharedStore {
        Arc::new(Mutex::new(self.open_store()))
    }

    pub fn device_client(&self, state: &ScheduleState) -> Result<DeviceClient, SyncError> {
        let url = state.device_url().ok_or(SyncError::NotConfigured)?;
        DeviceClient::new(url, Duration::from_secs(self.config.sync_timeout_secs))
    }
}

/// Local wall-clock time; every schedule is expressed in it.
pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// `HH:MM` command-line argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
}

impl FromStr for TimeOfDay {
    type Err = smartpower_core::SmartPowerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hour, minute) = parse_hhmm(s)?;
        Ok(Self { hour, minute })
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Weekday argument: `0`-`6` (0 = Monday) or an English name.
pub fn weekday_arg(s: &str) -> Result<u8, String> {
    smartpower_core::types::parse_weekday(s).map_err(|e| e.to_string())
}

/// `YYYY-MM-DD HH:MM` argument.
pub fn slot_arg(s: &str) -> Result<NaiveDateTime, String> {
    smartpower_core::types::parse_slot(s).map_err(|e| e.to_string())
}
