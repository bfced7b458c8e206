use chrono::{Duration, NaiveDateTime, NaiveTime};
use smartpower_core::config::SKIP_PROBE_LIMIT;
use smartpower_core::types::weekday_index;
use smartpower_core::{Action, Kind};

use crate::state::ScheduleState;
use crate::types::NextEvent;

/// Next HH:MM at or after `from` (today if not yet passed, else tomorrow).
pub fn next_daily(hour: u8, minute: u8, from: NaiveDateTime) -> Option<NaiveDateTime> {
    let time = NaiveTime::from_hms_opt(hour as u32, minute as u32, 0)?;
    let candidate = from.date().and_time(time);
    if candidate >= from {
        Some(candidate)
    } else {
        // Today's slot has passed, advance to tomorrow.
        Some(candidate + Duration::days(1))
    }
}

/// Next weekday + HH:MM at or after `from`. `weekday` uses 0 = Monday.
pub fn next_weekly(weekday: u8, hour: u8, minute: u8, from: NaiveDateTime) -> Option<NaiveDateTime> {
    if weekday > 6 {
        return None;
    }
    let time = NaiveTime::from_hms_opt(hour as u32, minute as u32, 0)?;
    let today = weekday_index(&from) as i64;
    let days_ahead = (weekday as i64 - today).rem_euclid(7);
    let candidate = (from.date() + Duration::days(days_ahead)).and_time(time);
    if candidate >= from {
        Some(candidate)
    } else {
        // Already passed this week.
        Some(candidate + Duration::days(7))
    }
}

/// Step past skipped occurrences, giving up after [`SKIP_PROBE_LIMIT`] probes.
fn first_unskipped(
    state: &ScheduleState,
    first: NaiveDateTime,
    step: Duration,
) -> Option<NaiveDateTime> {
    let mut candidate = first;
    for _ in 0..SKIP_PROBE_LIMIT {
        if !state.is_skipped(candidate) {
            return Some(candidate);
        }
        candidate += step;
    }
    None
}

/// Every upcoming candidate for `actions`, soonest first.
///
/// One candidate per entry: the next one-time instant still pending, the next
/// unskipped weekly occurrence and the next unskipped daily occurrence. Ties
/// keep trigger priority (one-time, then weekly, then daily).
pub fn upcoming(state: &ScheduleState, actions: &[Action], now: NaiveDateTime) -> Vec<NextEvent> {
    let mut events = Vec::new();

    for entry in state.onetime.iter().filter(|o| actions.contains(&o.action)) {
        if !entry.executed && entry.datetime > now && !state.is_skipped(entry.datetime) {
            events.push(NextEvent {
                at: entry.datetime,
                kind: Kind::OneTime,
                action: entry.action,
                entry_id: Some(entry.id.clone()),
            });
        }
    }

    for entry in state
        .weekly_schedules
        .iter()
        .filter(|w| actions.contains(&w.action))
    {
        let next = next_weekly(entry.weekday, entry.hour, entry.minute, now)
            .and_then(|first| first_unskipped(state, first, Duration::days(7)));
        if let Some(at) = next {
            events.push(NextEvent {
                at,
                kind: Kind::Weekly,
                action: entry.action,
                entry_id: Some(entry.id.clone()),
            });
        }
    }

    for &action in actions {
        let setting = state.daily(action);
        if !setting.enabled {
            continue;
        }
        let next = next_daily(setting.hour, setting.minute, now)
            .and_then(|first| first_unskipped(state, first, Duration::days(1)));
        if let Some(at) = next {
            events.push(NextEvent {
                at,
                kind: Kind::Daily,
                action,
                entry_id: None,
            });
        }
    }

    // Stable sort: equal instants stay in priority order.
    events.sort_by_key(|e| e.at);
    events
}

/// The single nearest event for `actions`, or `None` when nothing is due.
pub fn next_event(state: &ScheduleState, actions: &[Action], now: NaiveDateTime) -> Option<NextEvent> {
    upcoming(state, actions, now).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DailySetting, OneTimeEntry, WeeklyEntry};
    use chrono::NaiveDate;
    use smartpower_core::types::format_slot;
    use smartpower_core::OneTimeSource;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    fn daily_state(action: Action, hour: u8, minute: u8) -> ScheduleState {
        let mut state = ScheduleState::default();
        state.daily.insert(
            action,
            DailySetting {
                enabled: true,
                hour,
                minute,
            },
        );
        state
    }

    #[test]
    fn daily_later_today() {
        let state = daily_state(Action::Shutdown, 23, 0);
        let now = at(2024, 5, 10, 22, 0);
        let ev = next_event(&state, &Action::LOCAL, now).unwrap();
        assert_eq!(ev.at, at(2024, 5, 10, 23, 0));
        assert_eq!(ev.kind, Kind::Daily);
        assert_eq!(ev.action, Action::Shutdown);
        assert!(ev.entry_id.is_none());
    }

    #[test]
    fn daily_rolls_to_tomorrow() {
        let now = at(2024, 5, 10, 23, 30);
        assert_eq!(next_daily(23, 0, now), Some(at(2024, 5, 11, 23, 0)));
    }

    #[test]
    fn weekly_rolls_to_next_week_when_passed() {
        // 2024-01-01 is a Monday.
        let now = at(2024, 1, 1, 9, 0);
        assert_eq!(next_weekly(0, 8, 0, now), Some(at(2024, 1, 8, 8, 0)));
        assert_eq!(next_weekly(0, 10, 0, now), Some(at(2024, 1, 1, 10, 0)));
        assert_eq!(next_weekly(6, 8, 0, now), Some(at(2024, 1, 7, 8, 0)));
    }

    #[test]
    fn weekly_skip_advances_one_week() {
        let mut state = ScheduleState::default();
        state.weekly_schedules.push(WeeklyEntry {
            id: "w1".into(),
            action: Action::Restart,
            weekday: 0,
            hour: 8,
            minute: 0,
        });
        state
            .skipped_dates
            .insert(format_slot(at(2024, 1, 1, 8, 0)));
        let ev = next_event(&state, &Action::LOCAL, at(2023, 12, 31, 12, 0)).unwrap();
        assert_eq!(ev.at, at(2024, 1, 8, 8, 0));
        assert_eq!(ev.entry_id.as_deref(), Some("w1"));
    }

    #[test]
    fn skip_probing_is_bounded() {
        let mut state = daily_state(Action::Shutdown, 6, 0);
        let now = at(2024, 3, 1, 0, 0);
        for day in 1..=5 {
            state.skipped_dates.insert(format_slot(at(2024, 3, day, 6, 0)));
        }
        assert!(next_event(&state, &Action::LOCAL, now).is_none());

        state.skipped_dates.remove(&format_slot(at(2024, 3, 5, 6, 0)));
        assert_eq!(
            next_event(&state, &Action::LOCAL, now).unwrap().at,
            at(2024, 3, 5, 6, 0)
        );
    }

    #[test]
    fn earliest_across_kinds_wins() {
        let mut state = daily_state(Action::Shutdown, 23, 0);
        state.onetime.push(OneTimeEntry {
            id: "o1".into(),
            action: Action::Restart,
            datetime: at(2024, 5, 10, 22, 30),
            executed: false,
            source: OneTimeSource::Quick,
        });
        let ev = next_event(&state, &Action::LOCAL, at(2024, 5, 10, 22, 0)).unwrap();
        assert_eq!(ev.kind, Kind::OneTime);
        assert_eq!(ev.action, Action::Restart);
    }

    #[test]
    fn executed_past_and_skipped_onetime_excluded() {
        let mut state = ScheduleState::default();
        let now = at(2024, 5, 10, 12, 0);
        for (id, datetime, executed) in [
            ("done", at(2024, 5, 10, 13, 0), true),
            ("past", at(2024, 5, 10, 11, 0), false),
            ("skipped", at(2024, 5, 10, 14, 0), false),
            ("live", at(2024, 5, 10, 15, 0), false),
        ] {
            state.onetime.push(OneTimeEntry {
                id: id.into(),
                action: Action::Shutdown,
                datetime,
                executed,
                source: OneTimeSource::Calendar,
            });
        }
        state.skipped_dates.insert("2024-05-10 14:00".into());
        let all = upcoming(&state, &Action::LOCAL, now);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].entry_id.as_deref(), Some("live"));
    }

    #[test]
    fn action_filter_applies() {
        let state = daily_state(Action::Restart, 5, 0);
        assert!(next_event(&state, &[Action::Shutdown], at(2024, 1, 1, 0, 0)).is_none());
    }

    #[test]
    fn equal_instants_keep_priority_order() {
        let mut state = daily_state(Action::Shutdown, 8, 0);
        state.weekly_schedules.push(WeeklyEntry {
            id: "w".into(),
            action: Action::Shutdown,
            weekday: 0,
            hour: 8,
            minute: 0,
        });
        let all = upcoming(&state, &Action::LOCAL, at(2024, 1, 1, 7, 0));
        assert_eq!(all[0].kind, Kind::Weekly);
        assert_eq!(all[1].kind, Kind::Daily);
    }
}
