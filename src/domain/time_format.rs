use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use chrono_tz::Tz;

/// Millisecond-precision timestamp layout used on the wire, always in UTC.
pub const API_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

pub fn format_api_timestamp(instant: DateTime<Utc>) -> String {
    instant.format(API_TIMESTAMP_FORMAT).to_string()
}

/// Accepts RFC 3339 as well as the zone-less wire layout (read as UTC).
pub fn parse_api_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// "Hh Mm" once an hour is reached, "Mm" below that.
pub fn format_tracked_duration(total_seconds: i64) -> String {
    let total_minutes = total_seconds.max(0) / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Running-timer display, "HH:MM:SS".
pub fn format_elapsed(elapsed_seconds: i64) -> String {
    let elapsed_seconds = elapsed_seconds.max(0);
    let hours = elapsed_seconds / 3600;
    let minutes = (elapsed_seconds % 3600) / 60;
    let seconds = elapsed_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalZone {
    System,
    Named(Tz),
}

impl LocalZone {
    pub fn parse(name: Option<&str>) -> Result<Self, String> {
        match name.map(str::trim).filter(|value| !value.is_empty()) {
            None => Ok(Self::System),
            Some(name) => name
                .parse::<Tz>()
                .map(Self::Named)
                .map_err(|error| format!("unknown timezone '{name}': {error}")),
        }
    }

    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::System => now.with_timezone(&Local).date_naive(),
            Self::Named(tz) => now.with_timezone(tz).date_naive(),
        }
    }
}

/// Bounds of the local calendar day containing `now`.
///
/// The local wall-clock bounds are written in the wire layout as-is, without
/// shifting them to UTC. This decides which remote entries count as "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DayWindow {
    pub fn containing(now: DateTime<Utc>, zone: LocalZone) -> Self {
        let start = zone.local_date(now).and_time(NaiveTime::MIN);
        let end = start + TimeDelta::days(1) - TimeDelta::milliseconds(1);
        Self { start, end }
    }

    pub fn start_param(&self) -> String {
        self.start.format(API_TIMESTAMP_FORMAT).to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format(API_TIMESTAMP_FORMAT).to_string()
    }
}
