//! Time handling for milestone windows
//!
//! Funding deadlines are legally binding, so every window check is done on
//! UTC instants. Schedules are published as calendar dates in the funding
//! jurisdiction; [`Timezone`] turns those dates into instants.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Timezone wrapper for schedule calendars
///
/// Wraps chrono_tz::Tz with custom serialization support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Timezone::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Parses an IANA timezone name such as `Europe/London`
    pub fn parse(name: &str) -> Result<Self, TemporalError> {
        Tz::from_str(name)
            .map(Timezone)
            .map_err(|_| TemporalError::UnknownTimezone(name.to_string()))
    }

    /// First instant of `date` in this timezone, as UTC
    pub fn start_of_day(&self, date: NaiveDate) -> Result<DateTime<Utc>, TemporalError> {
        date.and_hms_opt(0, 0, 0)
            .and_then(|local| local.and_local_timezone(self.0).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or(TemporalError::AmbiguousLocalTime(date))
    }

    /// Last instant of `date` in this timezone, as UTC
    pub fn end_of_day(&self, date: NaiveDate) -> Result<DateTime<Utc>, TemporalError> {
        date.and_hms_nano_opt(23, 59, 59, 999_999_999)
            .and_then(|local| local.and_local_timezone(self.0).latest())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or(TemporalError::AmbiguousLocalTime(date))
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::Europe::London)
    }
}

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid window: start {start} must be before end {end}")]
    InvalidWindow {
        start: String,
        end: String,
    },

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Local time does not exist on {0}")]
    AmbiguousLocalTime(NaiveDate),
}

/// Where an instant falls relative to a [`MilestoneWindow`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPosition {
    /// At or before the exclusive lower bound
    TooEarly,
    Within,
    /// Strictly after the inclusive upper bound
    TooLate,
}

/// The period in which a milestone may be claimed
///
/// The lower bound is exclusive and the upper bound inclusive:
/// `start < instant <= end`. A missing bound is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl MilestoneWindow {
    pub fn new(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Self, TemporalError> {
        if let (Some(start), Some(end)) = (start, end) {
            if start >= end {
                return Err(TemporalError::InvalidWindow {
                    start: start.to_rfc3339(),
                    end: end.to_rfc3339(),
                });
            }
        }
        Ok(Self { start, end })
    }

    pub fn bounded(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TemporalError> {
        Self::new(Some(start), Some(end))
    }

    /// Window with a lower bound only
    pub fn open_ended(start: DateTime<Utc>) -> Self {
        Self { start: Some(start), end: None }
    }

    pub fn position(&self, instant: DateTime<Utc>) -> WindowPosition {
        if self.start.is_some_and(|start| instant <= start) {
            WindowPosition::TooEarly
        } else if self.end.is_some_and(|end| instant > end) {
            WindowPosition::TooLate
        } else {
            WindowPosition::Within
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.position(instant) == WindowPosition::Within
    }
}

/// Source of "current processing time"
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to an instant, shared between clones; used by tests and
/// back-office replays
#[derive(Debug, Clone)]
pub struct FixedClock {
    instant: Arc<RwLock<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self { instant: Arc::new(RwLock::new(instant)) }
    }

    /// Moves every clone of this clock to `instant`
    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut guard) = self.instant.write() {
            *guard = instant;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.instant.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
