use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use smartpower_core::types::format_slot;
use smartpower_core::Action;
use smartpower_protocol::{DailyWake, MacAddress, OneTimeSlot, ScheduleSnapshot, WeeklySlot};
use tracing::info;

use crate::types::{DailySetting, OneTimeEntry, WeeklyEntry};

/// Everything persisted in the flat state file.
///
/// Field names are the on-disk keys; do not rename them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleState {
    /// Per-action daily settings. Older files hold a single setting here,
    /// which is read as the shutdown setting.
    #[serde(default, deserialize_with = "daily_compat")]
    pub daily: BTreeMap<Action, DailySetting>,
    #[serde(default)]
    pub weekly_schedules: Vec<WeeklyEntry>,
    #[serde(default)]
    pub onetime: Vec<OneTimeEntry>,

    // companion device
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub target_mac: String,
    /// Last snapshot the device returned, never what was sent.
    #[serde(default)]
    pub wake_daily: DailyWake,
    #[serde(default)]
    pub wake_weekly: Vec<WeeklySlot>,
    #[serde(default)]
    pub wake_onetime: Vec<OneTimeSlot>,

    #[serde(default)]
    pub debug_mode: bool,
    #[serde(default)]
    pub disclaimer_accepted: bool,
    /// Suppressed occurrences as `YYYY-MM-DD HH:MM`.
    #[serde(default)]
    pub skipped_dates: BTreeSet<String>,
}

impl ScheduleState {
    pub fn daily(&self, action: Action) -> DailySetting {
        self.daily.get(&action).copied().unwrap_or_default()
    }

    pub fn is_skipped(&self, at: NaiveDateTime) -> bool {
        self.skipped_dates.contains(&format_slot(at))
    }

    pub fn target_mac(&self) -> Option<MacAddress> {
        self.target_mac.parse().ok()
    }

    /// Base URL of the device, `None` until an address is configured.
    pub fn device_url(&self) -> Option<String> {
        let ip = self.ip.trim();
        if ip.is_empty() {
            return None;
        }
        if ip.starts_with("http://") || ip.starts_with("https://") {
            Some(ip.trim_end_matches('/').to_string())
        } else {
            Some(format!("http://{ip}"))
        }
    }

    pub fn wake_snapshot(&self) -> ScheduleSnapshot {
        ScheduleSnapshot {
            daily: self.wake_daily,
            weekly: self.wake_weekly.clone(),
            onetime: self.wake_onetime.clone(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DailyCompat {
    PerAction(BTreeMap<Action, DailySetting>),
    Legacy(DailySetting),
}

fn daily_compat<'de, D>(d: D) -> Result<BTreeMap<Action, DailySetting>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match DailyCompat::deserialize(d)? {
        DailyCompat::PerAction(map) => map,
        DailyCompat::Legacy(setting) => {
            info!("migrating legacy single daily setting to shutdown");
            BTreeMap::from([(Action::Shutdown, setting)])
        }
    })
}
