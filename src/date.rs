//! Pure timestamp helpers: inclusive epoch-second windows, calendar months for
//! activity bucketing, and RFC 3339 conversions. Nothing here reads the wall clock.

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Inclusive `[start, end]` window in integer seconds since the Unix epoch (UTC).
/// `start > end` is a valid, empty window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Build a range from configuration values; both bounds must be JSON integers.
    pub fn from_json(start: &Value, end: &Value) -> Result<Self> {
        let bound = |v: &Value, which: &str| {
            v.as_i64()
                .ok_or_else(|| Error::config(format!("time range {which} must be an integer, got {v}")))
        };
        Ok(Self::new(bound(start, "start")?, bound(end, "end")?))
    }

    /// Build a range from two RFC 3339 timestamps, e.g. `2021-01-01T00:00:00Z`.
    pub fn from_rfc3339(start: &str, end: &str) -> Result<Self> {
        Ok(Self::new(parse_rfc3339(start)?, parse_rfc3339(end)?))
    }

    #[inline]
    pub fn contains(&self, ts: i64) -> bool {
        self.start <= ts && ts <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn intersect(&self, other: &TimeRange) -> TimeRange {
        TimeRange::new(self.start.max(other.start), self.end.min(other.end))
    }

    /// Intersection of two optional windows; `None` means unbounded.
    pub fn intersect_opt(a: Option<TimeRange>, b: Option<TimeRange>) -> Option<TimeRange> {
        match (a, b) {
            (Some(x), Some(y)) => Some(x.intersect(&y)),
            (Some(x), None) | (None, Some(x)) => Some(x),
            (None, None) => None,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// `true` when `ts` lies inside `window`, or when there is no window at all.
#[inline]
pub fn within(window: Option<TimeRange>, ts: i64) -> bool {
    window.map_or(true, |w| w.contains(ts))
}

/// Simple "YYYY-MM" key with ordering, used for monthly activity buckets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u8, // 1..=12
}

impl YearMonth {
    pub fn new(year: i32, month: u8) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::invalid(format!("month must be 1..=12, got {month}")));
        }
        Ok(Self { year, month })
    }

    /// Calendar month (UTC) of an epoch-second timestamp.
    pub fn from_epoch(ts: i64) -> Result<Self> {
        let dt = datetime_from_epoch(ts)?;
        Ok(Self { year: dt.year(), month: dt.month() as u8 })
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let (y, m) = s
            .split_once('-')
            .ok_or_else(|| Error::config(format!("expected YYYY-MM, got {s:?}")))?;
        let year: i32 = y.parse().map_err(|_| Error::config(format!("invalid year in {s:?}")))?;
        let month: u8 = m.parse().map_err(|_| Error::config(format!("invalid month in {s:?}")))?;
        YearMonth::new(year, month).map_err(|_| Error::config(format!("month out of range in {s:?}")))
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub fn datetime_from_epoch(ts: i64) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(ts)
        .map_err(|e| Error::invalid(format!("timestamp {ts} out of range: {e}")))
}

pub fn epoch_from_datetime(dt: OffsetDateTime) -> i64 {
    dt.unix_timestamp()
}

pub fn parse_rfc3339(s: &str) -> Result<i64> {
    OffsetDateTime::parse(s.trim(), &Rfc3339)
        .map(epoch_from_datetime)
        .map_err(|e| Error::config(format!("invalid RFC 3339 timestamp {s:?}: {e}")))
}

pub fn format_rfc3339(ts: i64) -> Option<String> {
    OffsetDateTime::from_unix_timestamp(ts).ok()?.format(&Rfc3339).ok()
}
