//! `YYYYMMDD` day literals and inclusive date ranges used by selection queries.

use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

const DAY_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("date `{0}` must be exactly 8 digits (YYYYMMDD)")]
    Format(String),
    #[error("date `{0}` is not a valid calendar day")]
    OutOfRange(String),
    #[error("date range is reversed: {start} is after {end}")]
    Reversed { start: String, end: String },
}

/// Parse one `YYYYMMDD` day.
pub fn parse_day(s: &str) -> Result<NaiveDate, DateError> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DateError::Format(s.to_string()));
    }
    NaiveDate::parse_from_str(s, DAY_FORMAT).map_err(|_| DateError::OutOfRange(s.to_string()))
}

/// Inclusive `[start, end]` range of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateError> {
        if start > end {
            return Err(DateError::Reversed {
                start: start.format(DAY_FORMAT).to_string(),
                end: end.format(DAY_FORMAT).to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse both bounds from `YYYYMMDD` literals.
    pub fn parse(start: &str, end: &str) -> Result<Self, DateError> {
        Self::new(parse_day(start)?, parse_day(end)?)
    }
}

impl fmt::Display for DateRange {
    /// Renders as `YYYYMMDD,YYYYMMDD`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{}",
            self.start.format(DAY_FORMAT),
            self.end.format(DAY_FORMAT)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_day() {
        let d = parse_day("20131001").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2013, 10, 1).unwrap());
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(matches!(parse_day("2013-10-01"), Err(DateError::Format(_))));
        assert!(matches!(parse_day("2013101"), Err(DateError::Format(_))));
        assert!(matches!(parse_day("+2013101"), Err(DateError::Format(_))));
        assert!(matches!(parse_day("20131301"), Err(DateError::OutOfRange(_))));
        assert!(matches!(parse_day("20140230"), Err(DateError::OutOfRange(_))));
    }

    #[test]
    fn leap_days() {
        assert!(parse_day("20120229").is_ok());
        assert!(parse_day("20000229").is_ok());
        assert!(parse_day("19000229").is_err());
    }

    #[test]
    fn range_keeps_literal_form_and_order() {
        let r = DateRange::parse("20131001", "20141123").unwrap();
        assert_eq!(r.to_string(), "20131001,20141123");
        assert_eq!(
            DateRange::parse("20141123", "20131001"),
            Err(DateError::Reversed {
                start: "20141123".to_string(),
                end: "20131001".to_string(),
            })
        );
    }
}
