use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{PingdomError, Result};
use status::ReportResolution;

pub mod client;
pub mod session;
pub mod status;

/// A plain key-value record, as returned by the Pingdom API.
pub type Record = Map<String, Value>;

/// A monitored check. Returned from `client.checks()`.
///
/// The record is kept as the service sent it. Only the name is interpreted,
/// for matching against downtime requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Check(Record);

impl Check {
    /// Name of the check. Reads `name`, falling back to `checkName`.
    pub fn name(&self) -> Option<&str> {
        self.0
            .get("name")
            .or_else(|| self.0.get("checkName"))
            .and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Record {
        &self.0
    }

    pub fn into_record(self) -> Record {
        self.0
    }
}

impl From<Record> for Check {
    fn from(record: Record) -> Self {
        Self(record)
    }
}

/// A monitoring location (probe). Returned from `client.locations()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(Record);

impl Location {
    pub fn fields(&self) -> &Record {
        &self.0
    }

    pub fn into_record(self) -> Record {
        self.0
    }
}

impl From<Record> for Location {
    fn from(record: Record) -> Self {
        Self(record)
    }
}

/// Calendar instant as `(year, month, day, hour, minute, second)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeTuple {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl TimeTuple {
    pub fn new(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Converts to the date-time the transport sends as `xsd:dateTime`.
    pub fn to_datetime(&self) -> Result<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|date| date.and_hms_opt(self.hour, self.minute, self.second))
            .ok_or_else(|| PingdomError::InvalidArgument(format!("{:?} is not a valid time", self)))
    }
}

impl From<NaiveDateTime> for TimeTuple {
    // Sub-second precision is dropped.
    fn from(value: NaiveDateTime) -> Self {
        Self::new(
            value.year(),
            value.month(),
            value.day(),
            value.hour(),
            value.minute(),
            value.second(),
        )
    }
}

impl From<(i32, u32, u32, u32, u32, u32)> for TimeTuple {
    fn from((year, month, day, hour, minute, second): (i32, u32, u32, u32, u32, u32)) -> Self {
        Self::new(year, month, day, hour, minute, second)
    }
}

/// Parameters of a downtime report. Pass into `client.downtimes()`.
///
/// Absent check or times are rejected by validation. The resolution starts out
/// as `DAILY`, and anything other than a known wire name is rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct DowntimeQuery {
    /// Name of the check to report on.
    pub check: Option<String>,
    pub from: Option<TimeTuple>,
    pub to: Option<TimeTuple>,
    /// Wire name of the resolution: `DAILY`, `WEEKLY` or `MONTHLY`.
    pub resolution: String,
}

impl Default for DowntimeQuery {
    fn default() -> Self {
        Self {
            check: None,
            from: None,
            to: None,
            resolution: ReportResolution::default().as_wire().to_string(),
        }
    }
}

impl DowntimeQuery {
    pub fn new(check: impl Into<String>, from: impl Into<TimeTuple>, to: impl Into<TimeTuple>) -> Self {
        Self {
            check: Some(check.into()),
            from: Some(from.into()),
            to: Some(to.into()),
            ..Self::default()
        }
    }

    pub fn resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = resolution.into();
        self
    }
}
