use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SmartPowerError};

/// Wall-clock format shared by one-time entries and skip markers: `YYYY-MM-DD HH:MM`.
pub const SLOT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A power transition the system can schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Power off the local machine.
    Shutdown,
    /// Reboot the local machine.
    Restart,
    /// Wake the remote machine through the companion device.
    Wake,
}

impl Action {
    /// Actions executed on this machine, in matching order.
    pub const LOCAL: [Action; 2] = [Action::Shutdown, Action::Restart];

    /// The action that may never share a slot with `self`.
    pub fn opposing(self) -> Option<Action> {
        match self {
            Action::Shutdown => Some(Action::Restart),
            Action::Restart => Some(Action::Shutdown),
            Action::Wake => None,
        }
    }

    pub fn is_local(self) -> bool {
        !matches!(self, Action::Wake)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Shutdown => "shutdown",
            Action::Restart => "restart",
            Action::Wake => "wake",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = SmartPowerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shutdown" => Ok(Action::Shutdown),
            "restart" | "reboot" => Ok(Action::Restart),
            "wake" => Ok(Action::Wake),
            other => Err(SmartPowerError::Validation(format!("unknown action: {other}"))),
        }
    }
}

/// Recurrence kind, listed in trigger priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    OneTime,
    Weekly,
    Daily,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::OneTime => "one-time",
            Kind::Weekly => "weekly",
            Kind::Daily => "daily",
        };
        f.write_str(s)
    }
}

/// How a one-time entry was created; only used for grouping in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OneTimeSource {
    /// "N hours from now".
    Quick,
    /// Picked from a calendar.
    #[default]
    Calendar,
}

impl OneTimeSource {
    pub fn as_str(self) -> &'static str {
        match self {
            OneTimeSource::Quick => "quick",
            OneTimeSource::Calendar => "calendar",
        }
    }
}

impl fmt::Display for OneTimeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OneTimeSource {
    type Err = SmartPowerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "quick" => Ok(OneTimeSource::Quick),
            "calendar" => Ok(OneTimeSource::Calendar),
            other => Err(SmartPowerError::Validation(format!(
                "unknown one-time source: {other}"
            ))),
        }
    }
}

/// Format a wall-clock instant as a slot key (`YYYY-MM-DD HH:MM`).
pub fn format_slot(at: NaiveDateTime) -> String {
    at.format(SLOT_FORMAT).to_string()
}

/// Parse a slot key; the only accepted shape is `YYYY-MM-DD HH:MM`.
pub fn parse_slot(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), SLOT_FORMAT)
        .map_err(|e| SmartPowerError::Validation(format!("invalid date '{s}': {e}")))
}

/// Drop seconds and sub-seconds.
pub fn floor_to_minute(at: NaiveDateTime) -> NaiveDateTime {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// Weekday index with 0 = Monday … 6 = Sunday.
pub fn weekday_index(date: &impl Datelike) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

pub fn weekday_name(index: u8) -> &'static str {
    match index {
        0 => "Monday",
        1 => "Tuesday",
        2 => "Wednesday",
        3 => "Thursday",
        4 => "Friday",
        5 => "Saturday",
        6 => "Sunday",
        _ => "?",
    }
}

/// Parse a weekday given either as an index (0 = Monday) or as an English name.
pub fn parse_weekday(s: &str) -> Result<u8> {
    if let Ok(n) = s.trim().parse::<u8>() {
        validate_weekday(n)?;
        return Ok(n);
    }
    s.trim()
        .parse::<chrono::Weekday>()
        .map(|w| w.num_days_from_monday() as u8)
        .map_err(|_| SmartPowerError::Validation(format!("invalid weekday: {s}")))
}

pub fn validate_time(hour: u8, minute: u8) -> Result<()> {
    if hour > 23 {
        return Err(SmartPowerError::Validation(format!(
            "hour must be 0-23, got {hour}"
        )));
    }
    if minute > 59 {
        return Err(SmartPowerError::Validation(format!(
            "minute must be 0-59, got {minute}"
        )));
    }
    Ok(())
}

pub fn validate_weekday(weekday: u8) -> Result<()> {
    if weekday > 6 {
        return Err(SmartPowerError::Validation(format!(
            "weekday must be 0-6 (0 = Monday), got {weekday}"
        )));
    }
    Ok(())
}

/// Parse `HH:MM` into a validated (hour, minute) pair.
pub fn parse_hhmm(s: &str) -> Result<(u8, u8)> {
    let (h, m) = s
        .trim()
        .split_once(':')
        .ok_or_else(|| SmartPowerError::Validation(format!("expected HH:MM, got '{s}'")))?;
    let hour: u8 = h
        .parse()
        .map_err(|_| SmartPowerError::Validation(format!("invalid hour in '{s}'")))?;
    let minute: u8 = m
        .parse()
        .map_err(|_| SmartPowerError::Validation(format!("invalid minute in '{s}'")))?;
    validate_time(hour, minute)?;
    Ok((hour, minute))
}

/// Serde adapter storing a [`NaiveDateTime`] as a slot key string.
pub mod slot_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_slot(*at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_slot(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn opposing_pairs() {
        assert_eq!(Action::Shutdown.opposing(), Some(Action::Restart));
        assert_eq!(Action::Restart.opposing(), Some(Action::Shutdown));
        assert_eq!(Action::Wake.opposing(), None);
    }

    #[test]
    fn slot_format_is_minute_precision() {
        let at = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 42)
            .unwrap();
        assert_eq!(format_slot(at), "2024-01-01 08:00");
        assert_eq!(parse_slot("2024-01-01 08:00").unwrap(), floor_to_minute(at));
    }

    #[test]
    fn parse_slot_rejects_garbage() {
        assert!(parse_slot("2024-13-01 08:00").is_err());
        assert!(parse_slot("tomorrow").is_err());
    }

    #[test]
    fn weekday_index_starts_monday() {
        // 2024-01-01 was a Monday, 2024-01-07 a Sunday.
        let mon = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let sun = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        assert_eq!(weekday_index(&mon), 0);
        assert_eq!(weekday_index(&sun), 6);
    }

    #[test]
    fn parse_weekday_accepts_names_and_numbers() {
        assert_eq!(parse_weekday("0").unwrap(), 0);
        assert_eq!(parse_weekday("fri").unwrap(), 4);
        assert_eq!(parse_weekday("Sunday").unwrap(), 6);
        assert!(parse_weekday("7").is_err());
    }

    #[test]
    fn hhmm_ranges() {
        assert_eq!(parse_hhmm("23:59").unwrap(), (23, 59));
        assert!(parse_hhmm("24:00").is_err());
        assert!(parse_hhmm("12:60").is_err());
        assert!(parse_hhmm("1200").is_err());
    }

    #[test]
    fn action_from_str_is_case_insensitive() {
        assert_eq!("Shutdown".parse::<Action>().unwrap(), Action::Shutdown);
        assert_eq!("reboot".parse::<Action>().unwrap(), Action::Restart);
        assert!("hibernate".parse::<Action>().is_err());
    }
}
