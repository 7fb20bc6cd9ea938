//! Query parameters for shaping a voucher's transaction history.

use core::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use voucherbook_core::{DomainError, DomainResult, ValueObject};

const SECONDS_PER_HOUR: i32 = 60 * 60;
const DEFAULT_OFFSET_HOURS: i32 = 7;
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Ordering of retained transactions by date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    /// Newest first.
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(DomainError::validation(format!(
                "sort order must be \"asc\" or \"desc\", got {other:?}"
            ))),
        }
    }
}

impl core::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ValueObject for SortOrder {}

/// Optional calendar year/month restriction, evaluated in UTC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct PeriodFilter {
    year: Option<i32>,
    month: Option<u32>,
}

impl PeriodFilter {
    /// No restriction: every dated transaction matches.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(year: Option<i32>, month: Option<u32>) -> DomainResult<Self> {
        if let Some(y) = year {
            if !(1..=9999).contains(&y) {
                return Err(DomainError::validation(format!(
                    "year must be within 1..=9999, got {y}"
                )));
            }
        }
        if let Some(m) = month {
            if !(1..=12).contains(&m) {
                return Err(DomainError::validation(format!(
                    "month must be within 1..=12, got {m}"
                )));
            }
        }
        Ok(Self { year, month })
    }

    /// Build from raw request strings. Absent or blank values mean "no filter".
    pub fn parse(year: Option<&str>, month: Option<&str>) -> DomainResult<Self> {
        let year = parse_component::<i32>("year", year)?;
        let month = parse_component::<u32>("month", month)?;
        Self::new(year, month)
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn month(&self) -> Option<u32> {
        self.month
    }

    pub fn matches(&self, instant: &DateTime<Utc>) -> bool {
        self.year.is_none_or(|y| instant.year() == y)
            && self.month.is_none_or(|m| instant.month() == m)
    }
}

fn parse_component<T: FromStr>(name: &str, raw: Option<&str>) -> DomainResult<Option<T>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|_| DomainError::validation(format!("{name} is not a number: {s:?}"))),
    }
}

impl ValueObject for PeriodFilter {}

/// Fixed offset used only to render transaction dates for display.
///
/// No DST or locale rules apply; the instant is shifted and printed as
/// `YYYY-MM-DD HH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayOffset(FixedOffset);

impl DisplayOffset {
    pub fn from_hours(hours: i32) -> DomainResult<Self> {
        if !(-23..=23).contains(&hours) {
            return Err(DomainError::validation(format!(
                "display offset must be within -23..=23 hours, got {hours}"
            )));
        }
        FixedOffset::east_opt(hours * SECONDS_PER_HOUR)
            .map(Self)
            .ok_or_else(|| DomainError::validation(format!("invalid display offset: {hours}h")))
    }

    pub fn utc() -> Self {
        Self(Utc.fix())
    }

    pub fn local_minus_utc_seconds(&self) -> i32 {
        self.0.local_minus_utc()
    }

    pub fn format(&self, instant: &DateTime<Utc>) -> String {
        instant.with_timezone(&self.0).format(DISPLAY_FORMAT).to_string()
    }
}

impl Default for DisplayOffset {
    fn default() -> Self {
        Self::from_hours(DEFAULT_OFFSET_HOURS).unwrap_or_else(|_| Self::utc())
    }
}

impl ValueObject for DisplayOffset {}
