use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque bearer token. The empty value means "unauthenticated".
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("Credential(<empty>)")
        } else {
            f.write_str("Credential(<redacted>)")
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Activity {
    pub id: String,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeEntry {
    pub activity_id: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub note: String,
}

impl TimeEntry {
    pub fn new(
        activity_id: impl Into<String>,
        started_at: DateTime<Utc>,
        stopped_at: DateTime<Utc>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            activity_id: activity_id.into(),
            started_at,
            stopped_at,
            note: note.into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.activity_id, "time_entry.activity_id")?;
        if self.stopped_at < self.started_at {
            return Err("time_entry.stopped_at must be >= time_entry.started_at".to_string());
        }
        Ok(())
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.stopped_at - self.started_at).num_seconds().max(0)
    }
}

/// A time entry that could not be delivered and waits in the backlog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FailedTimeEntry {
    pub activity_id: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    #[serde(default)]
    pub note: String,
}

impl FailedTimeEntry {
    /// Backlog identity. Two distinct entries sharing all three fields are
    /// indistinguishable, which holds for a single device and user.
    pub fn same_submission(&self, other: &FailedTimeEntry) -> bool {
        self.activity_id == other.activity_id
            && self.started_at == other.started_at
            && self.stopped_at == other.stopped_at
    }

    pub fn to_time_entry(&self) -> TimeEntry {
        TimeEntry::new(
            self.activity_id.clone(),
            self.started_at,
            self.stopped_at,
            self.note.clone(),
        )
    }
}

impl From<TimeEntry> for FailedTimeEntry {
    fn from(entry: TimeEntry) -> Self {
        Self {
            activity_id: entry.activity_id,
            started_at: entry.started_at,
            stopped_at: entry.stopped_at,
            note: entry.note,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTimeAggregate {
    pub total_seconds: i64,
    pub color: String,
}

/// Per-activity totals for the current local day, keyed by activity name.
pub type TodayAggregate = BTreeMap<String, ActivityTimeAggregate>;

pub fn total_seconds(aggregate: &TodayAggregate) -> i64 {
    aggregate.values().map(|bucket| bucket.total_seconds).sum()
}

/// A completed entry as reported by the list endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedEntry {
    pub activity_name: String,
    pub color: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
}

impl TrackedEntry {
    pub fn duration_seconds(&self) -> i64 {
        (self.stopped_at - self.started_at).num_seconds().max(0)
    }
}

pub fn aggregate_entries(entries: &[TrackedEntry]) -> TodayAggregate {
    let mut aggregate = TodayAggregate::new();
    for entry in entries {
        aggregate
            .entry(entry.activity_name.clone())
            .or_insert_with(|| ActivityTimeAggregate {
                total_seconds: 0,
                color: entry.color.clone(),
            })
            .total_seconds += entry.duration_seconds();
    }
    aggregate
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}
