use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use smartpower_core::types::{format_slot, slot_format, weekday_name};
use smartpower_core::{Action, Kind, OneTimeSource};

/// Daily slot for one action. Disabled settings keep their time for later.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySetting {
    pub enabled: bool,
    pub hour: u8,
    pub minute: u8,
}

/// Recurs every week on `weekday` (0 = Monday … 6 = Sunday).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyEntry {
    /// UUID v4 string.
    pub id: String,
    pub action: Action,
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
}

impl fmt::Display for WeeklyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} every {} at {:02}:{:02}",
            self.action,
            weekday_name(self.weekday),
            self.hour,
            self.minute
        )
    }
}

/// Fires once at `datetime`; `executed` only ever goes false → true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneTimeEntry {
    /// UUID v4 string.
    pub id: String,
    pub action: Action,
    /// Stored as `YYYY-MM-DD HH:MM`.
    #[serde(with = "slot_format")]
    pub datetime: NaiveDateTime,
    #[serde(default)]
    pub executed: bool,
    #[serde(default)]
    pub source: OneTimeSource,
}

impl fmt::Display for OneTimeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.action, format_slot(self.datetime))?;
        if self.executed {
            f.write_str(" (executed)")?;
        }
        Ok(())
    }
}

/// A match produced by the monitor and held by the confirmation gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub action: Action,
    pub kind: Kind,
    /// `None` for daily settings, which are identified by action alone.
    pub entry_id: Option<String>,
    /// The scheduled minute that matched.
    pub slot: NaiveDateTime,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} at {}", self.kind, self.action, format_slot(self.slot))
    }
}

/// Nearest upcoming occurrence, as reported by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextEvent {
    pub at: NaiveDateTime,
    pub kind: Kind,
    pub action: Action,
    pub entry_id: Option<String>,
}

impl fmt::Display for NextEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", format_slot(self.at), self.kind, self.action)
    }
}
