//! Wake schedule matching on the device.
//!
//! Mirrors the desktop monitor for [`Action::Wake`](smartpower_core::Action)
//! only: no confirmation, a match wakes the target right away. Schedules
//! live in fixed slot tables; a one-time entry that fires is removed.

use chrono::{Datelike, NaiveDateTime, Timelike};
use smartpower_core::config::DEVICE_SLOT_CAPACITY;
use smartpower_core::types::{floor_to_minute, validate_time, validate_weekday};
use smartpower_core::Kind;
use smartpower_protocol::{
    DailyWake, DecodedSync, MacAddress, OneTimeSlot, ScheduleSnapshot, WeeklySlot,
};
use tracing::{debug, info, warn};

use crate::arena::SlotArena;
use crate::error::{DeviceError, Result};

/// Calendar reading from the device clock. `weekday` counts from Sunday = 0,
/// as the firmware clock does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub weekday: u8,
}

impl DeviceTime {
    pub fn from_naive(at: NaiveDateTime) -> Self {
        Self {
            year: at.year().clamp(0, u16::MAX as i32) as u16,
            month: at.month() as u8,
            day: at.day() as u8,
            hour: at.hour() as u8,
            minute: at.minute() as u8,
            weekday: at.weekday().num_days_from_sunday() as u8,
        }
    }

    /// Weekday with 0 = Monday … 6 = Sunday, the numbering used on the wire.
    pub fn monday_based_weekday(&self) -> u8 {
        (self.weekday + 6) % 7
    }

    fn minute_key(&self) -> (u16, u8, u8, u8, u8) {
        (self.year, self.month, self.day, self.hour, self.minute)
    }
}

/// A wake that fired this minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeMatch {
    pub kind: Kind,
    pub hour: u8,
    pub minute: u8,
}

#[derive(Debug, Default)]
pub struct RemoteScheduleEngine {
    daily: DailyWake,
    weekly: SlotArena<WeeklySlot, DEVICE_SLOT_CAPACITY>,
    onetime: SlotArena<OneTimeSlot, DEVICE_SLOT_CAPACITY>,
    target: Option<MacAddress>,
    last_minute: Option<(u16, u8, u8, u8, u8)>,
}

impl RemoteScheduleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// MAC woken by schedules and by requests that name no target.
    pub fn target(&self) -> Option<MacAddress> {
        self.target
    }

    pub fn set_target(&mut self, mac: MacAddress) {
        self.target = Some(mac);
    }

    pub fn snapshot(&self) -> ScheduleSnapshot {
        ScheduleSnapshot {
            daily: self.daily,
            weekly: self.weekly.to_vec(),
            onetime: self.onetime.to_vec(),
        }
    }

    /// Match `now` once per minute: one-time, then weekly, then daily.
    pub fn check(&mut self, now: &DeviceTime) -> Option<WakeMatch> {
        let key = now.minute_key();
        if self.last_minute == Some(key) {
            return None;
        }
        self.last_minute = Some(key);
        debug!(
            hour = now.hour,
            minute = now.minute,
            weekday = now.weekday,
            "checking wake schedules"
        );

        let hit = self
            .onetime
            .position(|o| (o.year, o.month, o.day, o.hour, o.minute) == key);
        if let Some(index) = hit {
            self.onetime.remove(index);
            info!(index, "one-time wake fired and removed");
            return Some(WakeMatch {
                kind: Kind::OneTime,
                hour: now.hour,
                minute: now.minute,
            });
        }

        let weekday = now.monday_based_weekday();
        let weekly_hit = self
            .weekly
            .iter()
            .any(|w| w.weekday == weekday && w.hour == now.hour && w.minute == now.minute);
        if weekly_hit {
            return Some(WakeMatch {
                kind: Kind::Weekly,
                hour: now.hour,
                minute: now.minute,
            });
        }

        let d = self.daily;
        (d.enabled && d.hour == now.hour && d.minute == now.minute).then_some(WakeMatch {
            kind: Kind::Daily,
            hour: now.hour,
            minute: now.minute,
        })
    }

    /// Bulk replacement from `/update_schedule`.
    ///
    /// Malformed items were already dropped by the decoder; items beyond
    /// capacity are dropped here.
    pub fn apply_sync(&mut self, sync: DecodedSync) {
        for rejected in &sync.rejected {
            warn!("sync item dropped: {rejected}");
        }
        if let Some(mac) = sync.mac {
            self.target = Some(mac);
        }
        if let Some(daily) = sync.daily {
            self.daily = daily;
        }
        let dropped_weekly = self.weekly.replace_with(sync.weekly);
        let dropped_onetime = self.onetime.replace_with(sync.onetime);
        if dropped_weekly + dropped_onetime > 0 {
            debug!(dropped_weekly, dropped_onetime, "sync items beyond capacity dropped");
        }
        info!(
            weekly = self.weekly.len(),
            onetime = self.onetime.len(),
            daily_enabled = self.daily.enabled,
            "schedule synced"
        );
    }

    pub fn set_daily(&mut self, daily: DailyWake) -> Result<()> {
        validate_time(daily.hour, daily.minute)?;
        self.daily = daily;
        info!(
            enabled = daily.enabled,
            hour = daily.hour,
            minute = daily.minute,
            "daily wake set"
        );
        Ok(())
    }

    pub fn add_weekly(&mut self, slot: WeeklySlot) -> Result<()> {
        validate_weekday(slot.weekday)?;
        validate_time(slot.hour, slot.minute)?;
        self.weekly.try_push(slot).map_err(|_| DeviceError::Full {
            table: "weekly",
            capacity: DEVICE_SLOT_CAPACITY,
        })?;
        info!(
            weekday = slot.weekday,
            hour = slot.hour,
            minute = slot.minute,
            "weekly wake added"
        );
        Ok(())
    }

    pub fn delete_weekly(&mut self, index: usize) -> Result<WeeklySlot> {
        self.weekly
            .remove(index)
            .ok_or(DeviceError::IndexOutOfRange {
                table: "weekly",
                index,
            })
    }

    /// Add a one-time wake. Minutes before `now` (device wall clock) would
    /// never fire and are refused.
    pub fn add_onetime(&mut self, slot: OneTimeSlot, now: NaiveDateTime) -> Result<()> {
        let Some(at) = slot.to_datetime() else {
            return Err(DeviceError::Invalid(format!("not a calendar minute: {slot}")));
        };
        if at < floor_to_minute(now) {
            return Err(DeviceError::Invalid(format!("{slot} is in the past")));
        }
        self.onetime.try_push(slot).map_err(|_| DeviceError::Full {
            table: "onetime",
            capacity: DEVICE_SLOT_CAPACITY,
        })?;
        info!(
            date = %format!("{:04}-{:02}-{:02}", slot.year, slot.month, slot.day),
            hour = slot.hour,
            minute = slot.minute,
            source = %slot.source,
            "one-time wake added"
        );
        Ok(())
    }

    pub fn delete_onetime(&mut self, index: usize) -> Result<OneTimeSlot> {
        self.onetime
            .remove(index)
            .ok_or(DeviceError::IndexOutOfRange {
                table: "onetime",
                index,
            })
    }
}
