//! Mutual exclusion between opposing actions.
//!
//! Shutdown and restart may never be due at the same minute. A daily slot
//! covers every day, so checks cross recurrence kinds: a weekly entry collides
//! with a daily setting at the same time of day, and a one-time entry collides
//! with the weekly entry for its weekday as well as with the daily setting.

use std::fmt;

use chrono::{NaiveDateTime, Timelike};
use smartpower_core::types::{format_slot, weekday_index, weekday_name};
use smartpower_core::{Action, Kind};

use crate::state::ScheduleState;

/// A schedule about to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Daily {
        action: Action,
        hour: u8,
        minute: u8,
    },
    Weekly {
        action: Action,
        weekday: u8,
        hour: u8,
        minute: u8,
    },
    OneTime {
        action: Action,
        at: NaiveDateTime,
    },
}

impl Candidate {
    pub fn action(&self) -> Action {
        match self {
            Candidate::Daily { action, .. }
            | Candidate::Weekly { action, .. }
            | Candidate::OneTime { action, .. } => *action,
        }
    }
}

/// The existing entry a candidate collides with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub kind: Kind,
    pub action: Action,
    /// Human-readable slot, e.g. `every day at 08:00`.
    pub slot: String,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} is already scheduled {}",
            self.kind, self.action, self.slot
        )
    }
}

fn daily_conflict(action: Action, hour: u8, minute: u8) -> Conflict {
    Conflict {
        kind: Kind::Daily,
        action,
        slot: format!("every day at {hour:02}:{minute:02}"),
    }
}

fn weekly_conflict(action: Action, weekday: u8, hour: u8, minute: u8) -> Conflict {
    Conflict {
        kind: Kind::Weekly,
        action,
        slot: format!("every {} at {hour:02}:{minute:02}", weekday_name(weekday)),
    }
}

fn onetime_conflict(action: Action, at: NaiveDateTime) -> Conflict {
    Conflict {
        kind: Kind::OneTime,
        action,
        slot: format!("at {}", format_slot(at)),
    }
}

/// First collision between `candidate` and the opposing action, if any.
///
/// Pure; never mutates `state`. Actions without an opposite never conflict.
pub fn check_conflict(state: &ScheduleState, candidate: &Candidate) -> Option<Conflict> {
    let opposing = candidate.action().opposing()?;
    let daily = state.daily(opposing);
    let daily_at = |hour: u8, minute: u8| daily.enabled && daily.hour == hour && daily.minute == minute;

    match *candidate {
        Candidate::Daily { hour, minute, .. } => {
            if daily_at(hour, minute) {
                return Some(daily_conflict(opposing, hour, minute));
            }
            if let Some(w) = state
                .weekly_schedules
                .iter()
                .find(|w| w.action == opposing && w.hour == hour && w.minute == minute)
            {
                return Some(weekly_conflict(opposing, w.weekday, hour, minute));
            }
            state
                .onetime
                .iter()
                .find(|o| {
                    o.action == opposing
                        && !o.executed
                        && o.datetime.hour() == hour as u32
                        && o.datetime.minute() == minute as u32
                })
                .map(|o| onetime_conflict(opposing, o.datetime))
        }

        Candidate::Weekly {
            weekday,
            hour,
            minute,
            ..
        } => {
            let weekly_hit = state.weekly_schedules.iter().any(|w| {
                w.action == opposing && w.weekday == weekday && w.hour == hour && w.minute == minute
            });
            if weekly_hit {
                return Some(weekly_conflict(opposing, weekday, hour, minute));
            }
            daily_at(hour, minute).then(|| daily_conflict(opposing, hour, minute))
        }

        Candidate::OneTime { at, .. } => {
            let onetime_hit = state
                .onetime
                .iter()
                .any(|o| o.action == opposing && !o.executed && o.datetime == at);
            if onetime_hit {
                return Some(onetime_conflict(opposing, at));
            }
            let (weekday, hour, minute) = (weekday_index(&at), at.hour() as u8, at.minute() as u8);
            let weekly_hit = state.weekly_schedules.iter().any(|w| {
                w.action == opposing && w.weekday == weekday && w.hour == hour && w.minute == minute
            });
            if weekly_hit {
                return Some(weekly_conflict(opposing, weekday, hour, minute));
            }
            daily_at(hour, minute).then(|| daily_conflict(opposing, hour, minute))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DailySetting, OneTimeEntry, WeeklyEntry};
    use chrono::NaiveDate;
    use smartpower_core::OneTimeSource;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    fn weekly(action: Action, weekday: u8, hour: u8, minute: u8) -> WeeklyEntry {
        WeeklyEntry {
            id: format!("w-{weekday}-{hour}-{minute}"),
            action,
            weekday,
            hour,
            minute,
        }
    }

    fn onetime(action: Action, datetime: NaiveDateTime, executed: bool) -> OneTimeEntry {
        OneTimeEntry {
            id: "o-1".into(),
            action,
            datetime,
            executed,
            source: OneTimeSource::Calendar,
        }
    }

    fn with_daily(action: Action, hour: u8, minute: u8) -> ScheduleState {
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
    fn daily_vs_daily() {
        let state = with_daily(Action::Shutdown, 23, 0);
        let hit = check_conflict(
            &state,
            &Candidate::Daily {
                action: Action::Restart,
                hour: 23,
                minute: 0,
            },
        )
        .unwrap();
        assert_eq!(hit.kind, Kind::Daily);
        assert_eq!(hit.action, Action::Shutdown);
    }

    #[test]
    fn same_action_never_conflicts() {
        let state = with_daily(Action::Shutdown, 23, 0);
        assert!(check_conflict(
            &state,
            &Candidate::Weekly {
                action: Action::Shutdown,
                weekday: 2,
                hour: 23,
                minute: 0
            }
        )
        .is_none());
    }

    #[test]
    fn disabled_daily_occupies_nothing() {
        let mut state = with_daily(Action::Shutdown, 23, 0);
        state.daily.get_mut(&Action::Shutdown).unwrap().enabled = false;
        assert!(check_conflict(
            &state,
            &Candidate::Daily {
                action: Action::Restart,
                hour: 23,
                minute: 0
            }
        )
        .is_none());
    }

    #[test]
    fn weekly_checks_opposing_daily() {
        let state = with_daily(Action::Restart, 8, 0);
        let hit = check_conflict(
            &state,
            &Candidate::Weekly {
                action: Action::Shutdown,
                weekday: 3,
                hour: 8,
                minute: 0,
            },
        )
        .unwrap();
        assert_eq!(hit.kind, Kind::Daily);
        assert_eq!(hit.to_string(), "daily restart is already scheduled every day at 08:00");
    }

    #[test]
    fn weekly_vs_weekly_needs_same_weekday() {
        let mut state = ScheduleState::default();
        state.weekly_schedules.push(weekly(Action::Restart, 0, 8, 0));
        let other_day = Candidate::Weekly {
            action: Action::Shutdown,
            weekday: 1,
            hour: 8,
            minute: 0,
        };
        let same_day = Candidate::Weekly {
            action: Action::Shutdown,
            weekday: 0,
            hour: 8,
            minute: 0,
        };
        assert!(check_conflict(&state, &other_day).is_none());
        assert_eq!(check_conflict(&state, &same_day).unwrap().kind, Kind::Weekly);
    }

    #[test]
    fn onetime_checks_weekly_on_its_weekday() {
        let mut state = ScheduleState::default();
        // Monday 08:00 restart; 2024-01-01 is a Monday.
        state.weekly_schedules.push(weekly(Action::Restart, 0, 8, 0));
        let monday = Candidate::OneTime {
            action: Action::Shutdown,
            at: at(2024, 1, 1, 8, 0),
        };
        let tuesday = Candidate::OneTime {
            action: Action::Shutdown,
            at: at(2024, 1, 2, 8, 0),
        };
        assert_eq!(check_conflict(&state, &monday).unwrap().kind, Kind::Weekly);
        assert!(check_conflict(&state, &tuesday).is_none());
    }

    #[test]
    fn onetime_checks_daily() {
        let state = with_daily(Action::Shutdown, 22, 15);
        let hit = check_conflict(
            &state,
            &Candidate::OneTime {
                action: Action::Restart,
                at: at(2024, 6, 1, 22, 15),
            },
        )
        .unwrap();
        assert_eq!(hit.kind, Kind::Daily);
    }

    #[test]
    fn executed_onetime_is_ignored() {
        let mut state = ScheduleState::default();
        let slot = at(2024, 6, 1, 22, 15);
        state.onetime.push(onetime(Action::Shutdown, slot, true));
        let candidate = Candidate::OneTime {
            action: Action::Restart,
            at: slot,
        };
        assert!(check_conflict(&state, &candidate).is_none());

        state.onetime[0].executed = false;
        assert_eq!(check_conflict(&state, &candidate).unwrap().kind, Kind::OneTime);
    }

    #[test]
    fn daily_checks_weekly_and_pending_onetime() {
        let mut state = ScheduleState::default();
        state.weekly_schedules.push(weekly(Action::Shutdown, 5, 7, 45));
        let candidate = Candidate::Daily {
            action: Action::Restart,
            hour: 7,
            minute: 45,
        };
        assert_eq!(check_conflict(&state, &candidate).unwrap().kind, Kind::Weekly);

        state.weekly_schedules.clear();
        state
            .onetime
            .push(onetime(Action::Shutdown, at(2030, 1, 1, 7, 45), false));
        assert_eq!(check_conflict(&state, &candidate).unwrap().kind, Kind::OneTime);
    }

    #[test]
    fn wake_has_no_opponent() {
        let state = with_daily(Action::Shutdown, 7, 0);
        assert!(check_conflict(
            &state,
            &Candidate::Daily {
                action: Action::Wake,
                hour: 7,
                minute: 0
            }
        )
        .is_none());
    }
}
