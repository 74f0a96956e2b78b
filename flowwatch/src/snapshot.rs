use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Pixel offset from the chart element's pointer origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChartPoint {
    pub x: i32,
    pub y: i32,
}

impl ChartPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Canonical `"x,y"` key used in the persisted record.
    pub fn key(&self) -> String {
        format!("{},{}", self.x, self.y)
    }
}

impl fmt::Display for ChartPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// One timestamped collection result covering every configured point.
///
/// An empty tooltip string means the chart showed nothing at that point;
/// it is recorded as-is rather than treated as missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: String,
    pub data: BTreeMap<String, String>,
}

impl Snapshot {
    pub fn new(taken_at: NaiveDateTime, data: BTreeMap<String, String>) -> Self {
        Self {
            timestamp: format_timestamp(taken_at),
            data,
        }
    }

    /// Parses the stored timestamp back into a local naive time.
    pub fn taken_at(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.timestamp)
    }
}

/// ISO-8601 local time: seconds precision, plus microseconds only when
/// the sub-second part is non-zero.
pub fn format_timestamp(at: NaiveDateTime) -> String {
    let micros = at.nanosecond() / 1_000;
    if micros == 0 {
        at.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        format!("{}.{:06}", at.format("%Y-%m-%dT%H:%M:%S"), micros)
    }
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()
}
