//! Session timing state as stored on a table record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TimerError;

/// Timing fields from which a table's remaining time is derived
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionTiming {
    /// Full allotted session length
    pub duration_seconds: f64,
    /// Start of the current active segment, `None` until the session starts
    pub start_time: Option<DateTime<Utc>>,
    pub is_paused: bool,
    /// Only meaningful while `is_paused` is set
    pub pause_time: Option<DateTime<Utc>>,
    /// Elapsed time banked from earlier pause/resume cycles
    pub accumulated_seconds: f64,
}

impl SessionTiming {
    /// A session that has not started yet
    pub fn idle(duration_seconds: f64) -> Self {
        Self {
            duration_seconds,
            ..Self::default()
        }
    }

    pub fn is_started(&self) -> bool {
        self.start_time.is_some()
    }

    pub fn initial_time_ms(&self) -> f64 {
        self.duration_seconds * 1000.0
    }
}

/// Session timing as persisted by the database, timestamps still as strings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSessionTiming {
    pub duration_seconds: f64,
    pub start_time: Option<String>,
    #[serde(default)]
    pub is_paused: bool,
    pub pause_time: Option<String>,
    #[serde(default)]
    pub accumulated_seconds: f64,
}

impl TryFrom<&RawSessionTiming> for SessionTiming {
    type Error = TimerError;

    fn try_from(raw: &RawSessionTiming) -> Result<Self, Self::Error> {
        Ok(Self {
            duration_seconds: raw.duration_seconds,
            start_time: parse_timestamp("start_time", raw.start_time.as_deref())?,
            is_paused: raw.is_paused,
            pause_time: parse_timestamp("pause_time", raw.pause_time.as_deref())?,
            accumulated_seconds: raw.accumulated_seconds,
        })
    }
}

/// Parse an RFC 3339 timestamp, treating an empty string like a missing one
fn parse_timestamp(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, TimerError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => DateTime::parse_from_rfc3339(text)
            .map(|parsed| Some(parsed.with_timezone(&Utc)))
            .map_err(|_| TimerError::InvalidTimestamp {
                field,
                value: text.to_string(),
            }),
    }
}
