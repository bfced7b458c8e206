use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use smartpower_core::types::{validate_time, validate_weekday};
use smartpower_core::OneTimeSource;

use crate::error::ProtocolError;
use crate::mac::MacAddress;

/// Daily wake setting as stored on the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyWake {
    pub enabled: bool,
    pub hour: u8,
    pub minute: u8,
}

/// Weekly wake slot. `weekday` uses 0 = Monday … 6 = Sunday on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySlot {
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
}

/// One-time wake slot, broken into calendar fields the way the device stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneTimeSlot {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    #[serde(default)]
    pub source: OneTimeSource,
}

impl OneTimeSlot {
    pub fn from_datetime(at: NaiveDateTime, source: OneTimeSource) -> Self {
        Self {
            year: at.year().clamp(0, u16::MAX as i32) as u16,
            month: at.month() as u8,
            day: at.day() as u8,
            hour: at.hour() as u8,
            minute: at.minute() as u8,
            source,
        }
    }

    /// `None` when the fields do not form a real calendar minute.
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)?
            .and_hms_opt(self.hour as u32, self.minute as u32, 0)
    }
}

/// Device response to every schedule endpoint. Authoritative after a sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub daily: DailyWake,
    #[serde(default)]
    pub weekly: Vec<WeeklySlot>,
    #[serde(default)]
    pub onetime: Vec<OneTimeSlot>,
}

// ── Item codecs ─────────────────────────────────────────────────────────────

fn malformed(field: &'static str, raw: &str, reason: impl Into<String>) -> ProtocolError {
    ProtocolError::MalformedItem {
        field,
        raw: raw.to_string(),
        reason: reason.into(),
    }
}

fn parse_fields<'a, const N: usize>(
    field: &'static str,
    raw: &'a str,
) -> Result<[&'a str; N], ProtocolError> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    parts
        .try_into()
        .map_err(|p: Vec<&str>| malformed(field, raw, format!("expected {N} fields, got {}", p.len())))
}

fn parse_num<T: FromStr>(field: &'static str, raw: &str, value: &str) -> Result<T, ProtocolError> {
    value
        .parse()
        .map_err(|_| malformed(field, raw, format!("'{value}' is not a number")))
}

impl fmt::Display for WeeklySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.weekday, self.hour, self.minute)
    }
}

impl FromStr for WeeklySlot {
    type Err = ProtocolError;

    /// `weekday,hour,minute`
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        const FIELD: &str = "weekly";
        let [w, h, m] = parse_fields::<3>(FIELD, raw)?;
        let slot = Self {
            weekday: parse_num(FIELD, raw, w)?,
            hour: parse_num(FIELD, raw, h)?,
            minute: parse_num(FIELD, raw, m)?,
        };
        validate_weekday(slot.weekday).map_err(|e| malformed(FIELD, raw, e.to_string()))?;
        validate_time(slot.hour, slot.minute).map_err(|e| malformed(FIELD, raw, e.to_string()))?;
        Ok(slot)
    }
}

impl fmt::Display for OneTimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{}",
            self.year, self.month, self.day, self.hour, self.minute, self.source
        )
    }
}

impl FromStr for OneTimeSlot {
    type Err = ProtocolError;

    /// `year,month,day,hour,minute,source`
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        const FIELD: &str = "onetime";
        let [y, mo, d, h, mi, src] = parse_fields::<6>(FIELD, raw)?;
        let slot = Self {
            year: parse_num(FIELD, raw, y)?,
            month: parse_num(FIELD, raw, mo)?,
            day: parse_num(FIELD, raw, d)?,
            hour: parse_num(FIELD, raw, h)?,
            minute: parse_num(FIELD, raw, mi)?,
            source: src.parse().map_err(|e: smartpower_core::SmartPowerError| {
                malformed(FIELD, raw, e.to_string())
            })?,
        };
        if slot.to_datetime().is_none() {
            return Err(malformed(FIELD, raw, "not a valid calendar date/time"));
        }
        Ok(slot)
    }
}

/// Parse a `;`-separated batch, keeping every item that parses.
fn parse_batch<T>(raw: &str) -> (Vec<T>, Vec<ProtocolError>)
where
    T: FromStr<Err = ProtocolError>,
{
    let mut items = Vec::new();
    let mut rejected = Vec::new();
    for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        match part.parse() {
            Ok(item) => items.push(item),
            Err(e) => rejected.push(e),
        }
    }
    (items, rejected)
}

fn join_batch<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

// ── Bulk sync request ───────────────────────────────────────────────────────

/// Desktop → device bulk replacement of the wake schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub mac: MacAddress,
    pub daily: DailyWake,
    pub weekly: Vec<WeeklySlot>,
    pub onetime: Vec<OneTimeSlot>,
}

impl SyncRequest {
    pub fn from_snapshot(mac: MacAddress, snapshot: &ScheduleSnapshot) -> Self {
        Self {
            mac,
            daily: snapshot.daily,
            weekly: snapshot.weekly.clone(),
            onetime: snapshot.onetime.clone(),
        }
    }

    pub fn to_form(&self) -> SyncForm {
        SyncForm {
            mac: self.mac.to_string(),
            d_en: if self.daily.enabled { "1" } else { "0" }.to_string(),
            d_h: self.daily.hour.to_string(),
            d_m: self.daily.minute.to_string(),
            weekly: join_batch(&self.weekly),
            onetime: join_batch(&self.onetime),
        }
    }
}

/// Raw form fields of `/update_schedule` exactly as they travel on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncForm {
    #[serde(default)]
    pub mac: String,
    #[serde(default)]
    pub d_en: String,
    #[serde(default)]
    pub d_h: String,
    #[serde(default)]
    pub d_m: String,
    #[serde(default)]
    pub weekly: String,
    #[serde(default)]
    pub onetime: String,
}

/// Result of decoding a [`SyncForm`] on the receiving side.
#[derive(Debug, Clone, Default)]
pub struct DecodedSync {
    /// `None` when the field was absent or malformed.
    pub mac: Option<MacAddress>,
    /// `None` when the daily fields were absent or malformed.
    pub daily: Option<DailyWake>,
    pub weekly: Vec<WeeklySlot>,
    pub onetime: Vec<OneTimeSlot>,
    /// Items dropped during decoding.
    pub rejected: Vec<ProtocolError>,
}

impl SyncForm {
    pub fn decode(&self) -> DecodedSync {
        let mut out = DecodedSync::default();

        if !self.mac.trim().is_empty() {
            match self.mac.parse() {
                Ok(mac) => out.mac = Some(mac),
                Err(e) => out.rejected.push(e),
            }
        }

        match decode_daily(&self.d_en, &self.d_h, &self.d_m) {
            Ok(daily) => out.daily = daily,
            Err(e) => out.rejected.push(e),
        }

        let (weekly, bad_weekly) = parse_batch(&self.weekly);
        let (onetime, bad_onetime) = parse_batch(&self.onetime);
        out.weekly = weekly;
        out.onetime = onetime;
        out.rejected.extend(bad_weekly);
        out.rejected.extend(bad_onetime);
        out
    }
}

/// Decode the three daily fields. All empty means "not sent".
pub fn decode_daily(d_en: &str, d_h: &str, d_m: &str) -> Result<Option<DailyWake>, ProtocolError> {
    const FIELD: &str = "daily";
    if d_en.trim().is_empty() && d_h.trim().is_empty() && d_m.trim().is_empty() {
        return Ok(None);
    }
    let raw = format!("{d_en},{d_h},{d_m}");
    let enabled = match d_en.trim() {
        "1" | "true" => true,
        "0" | "false" => false,
        other => return Err(malformed(FIELD, &raw, format!("d_en '{other}' is not 0/1"))),
    };
    let hour: u8 = parse_num(FIELD, &raw, d_h.trim())?;
    let minute: u8 = parse_num(FIELD, &raw, d_m.trim())?;
    validate_time(hour, minute).map_err(|e| malformed(FIELD, &raw, e.to_string()))?;
    Ok(Some(DailyWake {
        enabled,
        hour,
        minute,
    }))
}

// ── Single-entry forms ──────────────────────────────────────────────────────

/// `/update_daily`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyForm {
    #[serde(default)]
    pub d_en: String,
    #[serde(default)]
    pub d_h: String,
    #[serde(default)]
    pub d_m: String,
}

impl From<DailyWake> for DailyForm {
    fn from(d: DailyWake) -> Self {
        Self {
            d_en: if d.enabled { "1" } else { "0" }.to_string(),
            d_h: d.hour.to_string(),
            d_m: d.minute.to_string(),
        }
    }
}

/// `/delete_weekly`, `/delete_onetime`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndexForm {
    pub index: usize,
}

/// `/wol`. Falls back to the stored MAC when `mac` is absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WakeForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
}

/// `/wol_by_name`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeByNameForm {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekly_item_rejects_out_of_range() {
        assert!("7,8,0".parse::<WeeklySlot>().is_err());
        assert!("1,24,0".parse::<WeeklySlot>().is_err());
        assert!("1,8".parse::<WeeklySlot>().is_err());
        assert_eq!(
            " 1, 8 ,30".parse::<WeeklySlot>().unwrap(),
            WeeklySlot {
                weekday: 1,
                hour: 8,
                minute: 30
            }
        );
    }

    #[test]
    fn onetime_item_rejects_impossible_date() {
        assert!("2024,2,30,8,0,calendar".parse::<OneTimeSlot>().is_err());
        assert!("2024,2,28,8,0,someday".parse::<OneTimeSlot>().is_err());
        let ok: OneTimeSlot = "2024,2,29,8,0,quick".parse().unwrap();
        assert_eq!(ok.source, OneTimeSource::Quick);
    }

    #[test]
    fn empty_batch_fields_decode_to_nothing() {
        let decoded = SyncForm::default().decode();
        assert!(decoded.mac.is_none());
        assert!(decoded.daily.is_none());
        assert!(decoded.weekly.is_empty());
        assert!(decoded.onetime.is_empty());
        assert!(decoded.rejected.is_empty());
    }

    #[test]
    fn malformed_daily_is_reported_not_applied() {
        let form = SyncForm {
            d_en: "yes".into(),
            d_h: "7".into(),
            d_m: "0".into(),
            ..Default::default()
        };
        let decoded = form.decode();
        assert!(decoded.daily.is_none());
        assert_eq!(decoded.rejected.len(), 1);
    }

    #[test]
    fn trailing_separator_is_ignored() {
        let (items, rejected) = parse_batch::<WeeklySlot>("0,8,0;1,9,0;");
        assert_eq!(items.len(), 2);
        assert!(rejected.is_empty());
    }
}
