use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration, NaiveDateTime};
use smartpower_core::types::{
    floor_to_minute, format_slot, parse_slot, validate_time, validate_weekday,
};
use smartpower_core::{Action, OneTimeSource};
use smartpower_protocol::{MacAddress, ScheduleSnapshot};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::backend::StateBackend;
use crate::conflict::{check_conflict, Candidate};
use crate::error::{Result, SchedulerError};
use crate::state::ScheduleState;
use crate::types::{DailySetting, OneTimeEntry, WeeklyEntry};

/// Store shared between the monitor task and command handlers.
pub type SharedStore = Arc<Mutex<ScheduleStore>>;

/// Lock the shared store, recovering the data if a holder panicked.
pub fn lock_store(store: &SharedStore) -> MutexGuard<'_, ScheduleStore> {
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Owns every schedule entry and writes through to its backend after each
/// mutation.
///
/// Several processes may hold a store on the same file (the running daemon
/// and one-shot commands), so every mutation re-reads the backend first and
/// applies itself to what is on disk.
///
/// If the state file could not be loaded, saving stays disabled for the
/// lifetime of the store so the unreadable file is never overwritten.
pub struct ScheduleStore {
    state: ScheduleState,
    backend: Box<dyn StateBackend>,
    load_failed: bool,
}

impl ScheduleStore {
    /// Load from `backend`. Never fails: a broken file yields an empty store
    /// with saving suppressed.
    pub fn open(backend: Box<dyn StateBackend>, now: NaiveDateTime) -> Self {
        let (state, load_failed) = match backend.load() {
            Ok(Some(state)) => (state, false),
            Ok(None) => {
                info!("no saved schedule state, starting empty");
                (ScheduleState::default(), false)
            }
            Err(e) => {
                error!("failed to load schedule state, saving disabled: {e}");
                (ScheduleState::default(), true)
            }
        };
        let mut store = Self {
            state,
            backend,
            load_failed,
        };
        store.prune_skips(now);
        store
    }

    pub fn state(&self) -> &ScheduleState {
        &self.state
    }

    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    /// Re-read the backend to pick up changes written by another process.
    /// The loaded copy is kept when the read fails or the file is gone.
    pub fn refresh(&mut self) {
        if self.load_failed {
            return;
        }
        match self.backend.load() {
            Ok(Some(state)) => self.state = state,
            Ok(None) => {}
            Err(e) => warn!("could not re-read schedule state, keeping loaded copy: {e}"),
        }
    }

    pub fn save(&self) -> Result<()> {
        if self.load_failed {
            return Err(SchedulerError::SaveSuppressed);
        }
        self.backend.save(&self.state)
    }

    /// Write-through after a committed mutation. The in-memory change stands
    /// even when the write fails.
    fn persist(&self) {
        match self.save() {
            Ok(()) => {}
            Err(SchedulerError::SaveSuppressed) => {
                warn!("state file failed to load earlier, change kept in memory only")
            }
            Err(e) => warn!("failed to save schedule state: {e}"),
        }
    }

    // ── Daily ──────────────────────────────────────────────────────────────

    pub fn set_daily(
        &mut self,
        action: Action,
        enabled: bool,
        hour: u8,
        minute: u8,
    ) -> Result<DailySetting> {
        self.refresh();
        reject_wake(action)?;
        validate_time(hour, minute)?;
        if enabled {
            if let Some(conflict) =
                check_conflict(&self.state, &Candidate::Daily { action, hour, minute })
            {
                return Err(SchedulerError::Conflict(conflict));
            }
        }
        let setting = DailySetting {
            enabled,
            hour,
            minute,
        };
        self.state.daily.insert(action, setting);
        info!(%action, enabled, hour, minute, "daily schedule set");
        self.persist();
        Ok(setting)
    }

    // ── Weekly ─────────────────────────────────────────────────────────────

    pub fn add_weekly(
        &mut self,
        action: Action,
        weekday: u8,
        hour: u8,
        minute: u8,
    ) -> Result<WeeklyEntry> {
        self.refresh();
        reject_wake(action)?;
        validate_weekday(weekday)?;
        validate_time(hour, minute)?;
        let candidate = Candidate::Weekly {
            action,
            weekday,
            hour,
            minute,
        };
        if let Some(conflict) = check_conflict(&self.state, &candidate) {
            return Err(SchedulerError::Conflict(conflict));
        }
        let entry = WeeklyEntry {
            id: Uuid::new_v4().to_string(),
            action,
            weekday,
            hour,
            minute,
        };
        self.state.weekly_schedules.push(entry.clone());
        info!(entry_id = %entry.id, schedule = %entry, "weekly entry added");
        self.persist();
        Ok(entry)
    }

    pub fn remove_weekly(&mut self, id: &str) -> Result<WeeklyEntry> {
        self.refresh();
        let pos = self
            .state
            .weekly_schedules
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| SchedulerError::NotFound { id: id.to_string() })?;
        let entry = self.state.weekly_schedules.remove(pos);
        info!(entry_id = %id, "weekly entry removed");
        self.persist();
        Ok(entry)
    }

    // ── One-time ───────────────────────────────────────────────────────────

    /// Add a one-time entry. Seconds are dropped; a minute already behind
    /// `now` is rejected since it could never match.
    pub fn add_onetime(
        &mut self,
        action: Action,
        at: NaiveDateTime,
        source: OneTimeSource,
        now: NaiveDateTime,
    ) -> Result<OneTimeEntry> {
        reject_wake(action)?;
        let at = floor_to_minute(at);
        if at < floor_to_minute(now) {
            return Err(SchedulerError::Validation(format!(
                "{} is in the past",
                format_slot(at)
            )));
        }
        self.refresh();
        if let Some(conflict) = check_conflict(&self.state, &Candidate::OneTime { action, at }) {
            return Err(SchedulerError::Conflict(conflict));
        }
        let entry = OneTimeEntry {
            id: Uuid::new_v4().to_string(),
            action,
            datetime: at,
            executed: false,
            source,
        };
        self.state.onetime.push(entry.clone());
        info!(entry_id = %entry.id, schedule = %entry, %source, "one-time entry added");
        self.persist();
        Ok(entry)
    }

    /// Parse `YYYY-MM-DD HH:MM` and add it as a calendar entry.
    pub fn add_onetime_str(
        &mut self,
        action: Action,
        raw: &str,
        now: NaiveDateTime,
    ) -> Result<OneTimeEntry> {
        let at = parse_slot(raw)?;
        self.add_onetime(action, at, OneTimeSource::Calendar, now)
    }

    /// "N hours from now", rounded down to the minute.
    pub fn add_onetime_in_hours(
        &mut self,
        action: Action,
        hours: u32,
        now: NaiveDateTime,
    ) -> Result<OneTimeEntry> {
        if hours == 0 {
            return Err(SchedulerError::Validation(
                "hours must be at least 1".to_string(),
            ));
        }
        let at = now
            .checked_add_signed(Duration::hours(hours as i64))
            .ok_or_else(|| SchedulerError::Validation(format!("{hours} hours is out of range")))?;
        self.add_onetime(action, at, OneTimeSource::Quick, now)
    }

    pub fn remove_onetime(&mut self, id: &str) -> Result<OneTimeEntry> {
        self.refresh();
        let pos = self
            .state
            .onetime
            .iter()
            .position(|o| o.id == id)
            .ok_or_else(|| SchedulerError::NotFound { id: id.to_string() })?;
        let entry = self.state.onetime.remove(pos);
        info!(entry_id = %id, "one-time entry removed");
        self.persist();
        Ok(entry)
    }

    /// Flip `executed` on a pending entry. `false` if unknown or already executed.
    pub fn mark_executed(&mut self, id: &str) -> bool {
        self.refresh();
        let Some(entry) = self
            .state
            .onetime
            .iter_mut()
            .find(|o| o.id == id && !o.executed)
        else {
            return false;
        };
        entry.executed = true;
        self.persist();
        true
    }

    /// Drop every executed one-time entry. Returns how many were removed.
    pub fn clear_executed(&mut self) -> usize {
        self.refresh();
        let before = self.state.onetime.len();
        self.state.onetime.retain(|o| !o.executed);
        let removed = before - self.state.onetime.len();
        if removed > 0 {
            info!(count = removed, "executed one-time entries cleared");
            self.persist();
        }
        removed
    }

    // ── Skip list ──────────────────────────────────────────────────────────

    /// Suppress the single occurrence at `at`. Returns `false` if already skipped.
    pub fn add_skip(&mut self, at: NaiveDateTime) -> bool {
        self.refresh();
        let key = format_slot(at);
        if !self.state.skipped_dates.insert(key.clone()) {
            return false;
        }
        info!(slot = %key, "occurrence skipped");
        self.persist();
        true
    }

    pub fn remove_skip(&mut self, at: NaiveDateTime) -> bool {
        self.refresh();
        let key = format_slot(at);
        if !self.state.skipped_dates.remove(&key) {
            return false;
        }
        info!(slot = %key, "skip marker removed");
        self.persist();
        true
    }

    pub fn is_skipped(&self, at: NaiveDateTime) -> bool {
        self.state.is_skipped(at)
    }

    /// Drop markers that are unparseable or already behind `now`.
    fn prune_skips(&mut self, now: NaiveDateTime) {
        let cutoff = floor_to_minute(now);
        let before = self.state.skipped_dates.len();
        self.state
            .skipped_dates
            .retain(|key| parse_slot(key).map(|at| at >= cutoff).unwrap_or(false));
        let dropped = before - self.state.skipped_dates.len();
        if dropped > 0 {
            info!(count = dropped, "stale skip markers dropped");
            self.persist();
        }
    }

    // ── Settings ───────────────────────────────────────────────────────────

    pub fn set_debug_mode(&mut self, enabled: bool) {
        self.refresh();
        self.state.debug_mode = enabled;
        info!(enabled, "debug mode set");
        self.persist();
    }

    pub fn accept_disclaimer(&mut self) {
        self.refresh();
        self.state.disclaimer_accepted = true;
        info!("disclaimer accepted");
        self.persist();
    }

    /// Set the device address and the MAC it wakes. Either may be left as is.
    pub fn set_device(&mut self, ip: Option<&str>, mac: Option<MacAddress>) {
        self.refresh();
        if let Some(ip) = ip {
            self.state.ip = ip.trim().to_string();
        }
        if let Some(mac) = mac {
            self.state.target_mac = mac.to_string();
        }
        info!(ip = %self.state.ip, mac = %self.state.target_mac, "device settings updated");
        self.persist();
    }

    /// Replace the cached wake schedule with what the device reported.
    pub fn replace_wake_schedule(&mut self, snapshot: &ScheduleSnapshot) {
        self.refresh();
        self.state.wake_daily = snapshot.daily;
        self.state.wake_weekly = snapshot.weekly.clone();
        self.state.wake_onetime = snapshot.onetime.clone();
        info!(
            weekly = snapshot.weekly.len(),
            onetime = snapshot.onetime.len(),
            "wake schedule cache replaced"
        );
        self.persist();
    }
}

fn reject_wake(action: Action) -> Result<()> {
    if action.is_local() {
        Ok(())
    } else {
        Err(SchedulerError::Validation(format!(
            "{action} schedules live on the device"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{JsonFileBackend, MemoryBackend};
    use chrono::NaiveDate;
    use smartpower_core::Kind;
    use smartpower_protocol::{DailyWake, WeeklySlot};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    fn now() -> NaiveDateTime {
        at(2024, 1, 1, 12, 0)
    }

    fn memory_store() -> (ScheduleStore, MemoryBackend) {
        let backend = MemoryBackend::new();
        let store = ScheduleStore::open(Box::new(backend.clone()), now());
        (store, backend)
    }

    #[test]
    fn conflicting_add_leaves_store_unchanged() {
        let (mut store, backend) = memory_store();
        store.set_daily(Action::Shutdown, true, 23, 0).unwrap();
        let before = store.state().clone();
        let saved_before = backend.raw();

        let err = store.add_weekly(Action::Restart, 2, 23, 0).unwrap_err();
        match err {
            SchedulerError::Conflict(c) => {
                assert_eq!(c.kind, Kind::Daily);
                assert_eq!(c.action, Action::Shutdown);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert!(store
            .add_onetime(
                Action::Restart,
                at(2024, 2, 1, 23, 0),
                OneTimeSource::Calendar,
                now(),
            )
            .is_err());
        assert!(store.set_daily(Action::Restart, true, 23, 0).is_err());

        assert_eq!(store.state(), &before);
        assert_eq!(backend.raw(), saved_before);
    }

    #[test]
    fn disabled_daily_skips_conflict_check() {
        let (mut store, _) = memory_store();
        store.set_daily(Action::Shutdown, true, 23, 0).unwrap();
        assert!(store.set_daily(Action::Restart, false, 23, 0).is_ok());
    }

    #[test]
    fn validation_rejects_out_of_range() {
        let (mut store, _) = memory_store();
        assert!(matches!(
            store.add_weekly(Action::Shutdown, 7, 8, 0),
            Err(SchedulerError::Validation(_))
        ));
        assert!(matches!(
            store.set_daily(Action::Shutdown, true, 24, 0),
            Err(SchedulerError::Validation(_))
        ));
        assert!(matches!(
            store.add_onetime_str(Action::Shutdown, "2024-13-01 10:00", now()),
            Err(SchedulerError::Validation(_))
        ));
        assert!(matches!(
            store.add_weekly(Action::Wake, 0, 8, 0),
            Err(SchedulerError::Validation(_))
        ));
        assert!(store.state().weekly_schedules.is_empty());
    }

    #[test]
    fn quick_onetime_is_floored_and_tagged() {
        let (mut store, _) = memory_store();
        let now = at(2024, 1, 1, 12, 0) + Duration::seconds(42);
        let entry = store
            .add_onetime_in_hours(Action::Restart, 2, now)
            .unwrap();
        assert_eq!(entry.datetime, at(2024, 1, 1, 14, 0));
        assert_eq!(entry.source, OneTimeSource::Quick);
        assert!(store.add_onetime_in_hours(Action::Restart, 0, now).is_err());
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = ScheduleStore::open(Box::new(JsonFileBackend::new(&path)), now());
        store.set_daily(Action::Restart, true, 4, 30).unwrap();
        store.add_weekly(Action::Shutdown, 4, 22, 0).unwrap();
        let once = store
            .add_onetime_str(Action::Shutdown, "2024-02-01 18:15", now())
            .unwrap();
        store.mark_executed(&once.id);
        store.add_skip(at(2024, 1, 5, 22, 0));
        store.set_device(Some("192.168.1.50"), "AA:BB:CC:DD:EE:FF".parse().ok());
        store.replace_wake_schedule(&ScheduleSnapshot {
            daily: DailyWake {
                enabled: true,
                hour: 7,
                minute: 0,
            },
            weekly: vec![WeeklySlot {
                weekday: 0,
                hour: 6,
                minute: 45,
            }],
            onetime: vec![],
        });
        store.set_debug_mode(true);

        let reopened = ScheduleStore::open(Box::new(JsonFileBackend::new(&path)), now());
        assert!(!reopened.load_failed());
        assert_eq!(reopened.state(), store.state());
    }

    #[test]
    fn legacy_file_migrates_on_open() {
        let backend =
            MemoryBackend::with_raw(r#"{"daily":{"enabled":true,"hour":22,"minute":0}}"#);
        let store = ScheduleStore::open(Box::new(backend), now());
        assert!(store.state().daily(Action::Shutdown).enabled);
        assert_eq!(store.state().daily(Action::Shutdown).hour, 22);
    }

    #[test]
    fn corrupt_file_suppresses_saves() {
        let backend = MemoryBackend::with_raw("{ definitely not json");
        let mut store = ScheduleStore::open(Box::new(backend.clone()), now());
        assert!(store.load_failed());

        store.add_weekly(Action::Shutdown, 0, 8, 0).unwrap();
        assert_eq!(store.state().weekly_schedules.len(), 1);
        assert!(matches!(store.save(), Err(SchedulerError::SaveSuppressed)));
        assert_eq!(backend.raw().as_deref(), Some("{ definitely not json"));
    }

    #[test]
    fn stale_skips_pruned_on_open() {
        let backend = MemoryBackend::with_raw(
            r#"{"skipped_dates":["2023-12-31 08:00","2024-01-08 08:00","garbage"]}"#,
        );
        let store = ScheduleStore::open(Box::new(backend), now());
        let skips: Vec<_> = store.state().skipped_dates.iter().cloned().collect();
        assert_eq!(skips, vec!["2024-01-08 08:00".to_string()]);
    }

    #[test]
    fn remove_and_clear() {
        let (mut store, _) = memory_store();
        let w = store.add_weekly(Action::Shutdown, 1, 9, 0).unwrap();
        let a = store
            .add_onetime_str(Action::Restart, "2024-03-01 10:00", now())
            .unwrap();
        let b = store
            .add_onetime_str(Action::Restart, "2024-03-02 10:00", now())
            .unwrap();

        assert!(matches!(
            store.remove_weekly("nope"),
            Err(SchedulerError::NotFound { .. })
        ));
        assert_eq!(store.remove_weekly(&w.id).unwrap().id, w.id);

        assert!(store.mark_executed(&a.id));
        assert!(!store.mark_executed(&a.id));
        assert_eq!(store.clear_executed(), 1);
        assert_eq!(store.state().onetime.len(), 1);
        assert_eq!(store.state().onetime[0].id, b.id);
        assert!(store.remove_onetime(&b.id).is_ok());
        assert!(store.state().onetime.is_empty());
    }

    #[test]
    fn skip_add_remove() {
        let (mut store, _) = memory_store();
        let slot = at(2024, 1, 8, 8, 0);
        assert!(store.add_skip(slot));
        assert!(!store.add_skip(slot));
        assert!(store.is_skipped(slot));
        assert!(store.remove_skip(slot));
        assert!(!store.is_skipped(slot));
    }

    #[test]
    fn past_onetime_rejected() {
        let (mut store, backend) = memory_store();
        let err = store
            .add_onetime_str(Action::Shutdown, "2024-01-01 11:59", now())
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Validation(_)));
        assert!(store.state().onetime.is_empty());
        assert!(backend.raw().is_none());

        // The current minute can still match.
        let current = now() + Duration::seconds(30);
        assert!(store
            .add_onetime(Action::Shutdown, now(), OneTimeSource::Calendar, current)
            .is_ok());
    }

    #[test]
    fn writes_from_another_store_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let open = || ScheduleStore::open(Box::new(JsonFileBackend::new(&path)), now());

        let mut daemon = open();
        daemon.set_daily(Action::Shutdown, true, 23, 0).unwrap();

        let mut cli = open();
        let weekly = cli.add_weekly(Action::Restart, 0, 8, 0).unwrap();

        daemon.refresh();
        assert_eq!(daemon.state().weekly_schedules, vec![weekly.clone()]);

        // A later daemon write must not drop what the other store added.
        cli.add_skip(at(2024, 1, 8, 8, 0));
        daemon.set_debug_mode(true);

        let on_disk = open();
        assert_eq!(on_disk.state().weekly_schedules, vec![weekly]);
        assert!(on_disk.state().is_skipped(at(2024, 1, 8, 8, 0)));
        assert!(on_disk.state().debug_mode);
        assert!(on_disk.state().daily(Action::Shutdown).enabled);
    }
}
