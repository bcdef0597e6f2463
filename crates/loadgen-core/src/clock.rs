//! Wall-clock timestamps rendered in a fixed civil timezone.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use chrono_tz::Tz;

use crate::error::ConfigError;

/// Zone the `time` column is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CivilZone {
    /// IANA zone, e.g. `Asia/Tokyo`. Follows daylight-saving rules.
    Named(Tz),
    /// Constant offset from UTC, e.g. `+09:00`.
    Fixed(FixedOffset),
}

impl CivilZone {
    pub fn localize(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            CivilZone::Named(tz) => instant.with_timezone(tz).fixed_offset(),
            CivilZone::Fixed(offset) => instant.with_timezone(offset),
        }
    }
}

impl Default for CivilZone {
    fn default() -> Self {
        CivilZone::Named(chrono_tz::Asia::Tokyo)
    }
}

impl FromStr for CivilZone {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with('+') || s.starts_with('-') {
            return parse_offset(s)
                .map(CivilZone::Fixed)
                .ok_or_else(|| ConfigError::InvalidTimezone(s.to_string()));
        }
        s.parse::<Tz>()
            .map(CivilZone::Named)
            .map_err(|_| ConfigError::InvalidTimezone(s.to_string()))
    }
}

impl fmt::Display for CivilZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CivilZone::Named(tz) => write!(f, "{}", tz.name()),
            CivilZone::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

/// Parse `+HH:MM`, `+HHMM` or `+HH`.
fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.split_at(1) {
        ("+", rest) => (1, rest),
        ("-", rest) => (-1, rest),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that reports time in a [`CivilZone`].
#[derive(Clone)]
pub struct LocalClock {
    zone: CivilZone,
    clock: Arc<dyn Clock>,
}

impl LocalClock {
    pub fn new(zone: CivilZone) -> Self {
        Self::with_clock(zone, Arc::new(SystemClock))
    }

    pub fn with_clock(zone: CivilZone, clock: Arc<dyn Clock>) -> Self {
        Self { zone, clock }
    }

    pub fn zone(&self) -> CivilZone {
        self.zone
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.zone.localize(self.clock.now())
    }

    /// Current time as RFC 3339 with whole seconds, e.g. `2024-01-01T09:00:00+09:00`.
    pub fn timestamp(&self) -> String {
        self.now().to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

impl fmt::Debug for LocalClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalClock")
            .field("zone", &self.zone)
            .finish_non_exhaustive()
    }
}
