use std::fmt;

use serde::{Deserialize, Serialize};

/// Status code returned alongside every Pingdom API response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    /// Codes 1 and 2 are reserved by the service and carry no meaning.
    Reserved(i32),
    InvalidArgument,
    InternalError,
    WrongIdentification,
    WrongAuthorization,
    WrongAuthentication,
    /// Any code outside the documented range.
    Unknown(i32),
}

impl StatusCode {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            1 | 2 => Self::Reserved(code),
            3 => Self::InvalidArgument,
            4 => Self::InternalError,
            5 => Self::WrongIdentification,
            6 => Self::WrongAuthorization,
            7 => Self::WrongAuthentication,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Reserved(code) | Self::Unknown(code) => *code,
            Self::InvalidArgument => 3,
            Self::InternalError => 4,
            Self::WrongIdentification => 5,
            Self::WrongAuthorization => 6,
            Self::WrongAuthentication => 7,
        }
    }

    /// Human-readable meaning, as documented by the service.
    pub fn meaning(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Reserved(_) => "Reserved",
            Self::InvalidArgument => "Invalid Argument",
            Self::InternalError => "Internal Error",
            Self::WrongIdentification => "Wrong Identification",
            Self::WrongAuthorization => "Wrong Authorization",
            Self::WrongAuthentication => "Wrong Authentication",
            Self::Unknown(_) => "Unknown",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl From<i32> for StatusCode {
    fn from(code: i32) -> Self {
        Self::from_code(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error {}: {}", self.code(), self.meaning())
    }
}

/// Result of the most recent test of a check, as reported in current states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckResult {
    #[serde(rename = "CHECK_UP")]
    Up,
    #[serde(rename = "CHECK_DOWN")]
    Down,
    #[serde(rename = "CHECK_UNKNOWN")]
    Unknown,
}

impl CheckResult {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "CHECK_UP" => Some(Self::Up),
            "CHECK_DOWN" => Some(Self::Down),
            "CHECK_UNKNOWN" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Up => "CHECK_UP",
            Self::Down => "CHECK_DOWN",
            Self::Unknown => "CHECK_UNKNOWN",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Up => "Up",
            Self::Down => "Down",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Granularity of a downtime report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportResolution {
    #[default]
    #[serde(rename = "DAILY")]
    Daily,
    #[serde(rename = "WEEKLY")]
    Weekly,
    #[serde(rename = "MONTHLY")]
    Monthly,
}

impl ReportResolution {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "DAILY" => Some(Self::Daily),
            "WEEKLY" => Some(Self::Weekly),
            "MONTHLY" => Some(Self::Monthly),
            _ => None,
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
        }
    }
}

impl fmt::Display for ReportResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
