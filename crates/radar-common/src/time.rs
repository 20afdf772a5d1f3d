//! Calendar date handling for batch runs.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Date format accepted on the command line and used for day directories.
pub const DAY_FORMAT: &str = "%Y%m%d";

/// Inclusive range of calendar days.
///
/// Construction guarantees `start <= end`, so iteration always yields at
/// least one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ConfigResult<Self> {
        if start > end {
            return Err(ConfigError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse a range from two `YYYYMMDD` strings.
    pub fn parse(start: &str, end: &str) -> ConfigResult<Self> {
        Self::new(parse_day(start)?, parse_day(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days in the range, both ends included.
    pub fn len(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Every day of the range in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.len() as i64).map(move |offset| start + Duration::days(offset))
    }
}

/// Parse a single `YYYYMMDD` day.
pub fn parse_day(s: &str) -> ConfigResult<NaiveDate> {
    let trimmed = s.trim();
    // chrono accepts shorter digit runs for %Y; insist on the exact width.
    if trimmed.len() != 8 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigError::InvalidDate(s.to_string()));
    }
    NaiveDate::parse_from_str(trimmed, DAY_FORMAT).map_err(|_| ConfigError::InvalidDate(s.to_string()))
}
