//! Parsing of the fixed-width timestamps used throughout the provider's text files.
//!
//! Three encodings exist and are told apart purely by string length:
//! `YYYYMMDDHHMM` (12), `YYYYMMDDHH` (10) and `YYYYMMDD` (8).

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use thiserror::Error;

/// Years before this are stored in legacy local civil time.
const LEGACY_CUTOFF_YEAR: i32 = 2000;
/// The fixed UTC+1 zone legacy timestamps are interpreted in. No daylight saving.
const LEGACY_OFFSET_SECONDS: i32 = 3600;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("Unsupported timestamp '{0}': length matches no known date format")]
    UnsupportedLength(String),

    #[error("Invalid timestamp '{value}' for format {format:?}")]
    Invalid {
        value: String,
        format: LegacyDateFormat,
    },

    #[error("Timestamp '{0}' cannot be represented in its time zone")]
    OutOfRange(String),
}

/// The date encodings found in station lists, metadata and data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyDateFormat {
    /// `YYYYMMDDHHMM`
    Full,
    /// `YYYYMMDDHH`
    HourOnly,
    /// `YYYYMMDD`
    DayOnly,
}

impl LegacyDateFormat {
    pub fn width(&self) -> usize {
        match self {
            LegacyDateFormat::Full => 12,
            LegacyDateFormat::HourOnly => 10,
            LegacyDateFormat::DayOnly => 8,
        }
    }

    /// Selects the format whose width equals the length of `value`.
    pub fn for_value(value: &str) -> Result<Self, TimestampError> {
        [
            LegacyDateFormat::Full,
            LegacyDateFormat::HourOnly,
            LegacyDateFormat::DayOnly,
        ]
        .into_iter()
        .find(|format| format.width() == value.len())
        .ok_or_else(|| TimestampError::UnsupportedLength(value.to_string()))
    }

    fn parse_naive(&self, value: &str) -> Option<NaiveDateTime> {
        if value.len() != self.width() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let date = NaiveDate::from_ymd_opt(
            value[0..4].parse().ok()?,
            value[4..6].parse().ok()?,
            value[6..8].parse().ok()?,
        )?;
        let hour = match self {
            LegacyDateFormat::DayOnly => 0,
            _ => value[8..10].parse().ok()?,
        };
        let minute = match self {
            LegacyDateFormat::Full => value[10..12].parse().ok()?,
            _ => 0,
        };
        date.and_hms_opt(hour, minute, 0)
    }
}

/// Parses a fixed-width timestamp, selecting the encoding by length.
///
/// # Examples
///
/// ```
/// use dwd_climate::parse_timestamp;
///
/// let ts = parse_timestamp("2023010112").unwrap();
/// assert_eq!(ts.to_rfc3339(), "2023-01-01T12:00:00+00:00");
///
/// // Timestamps before 2000 are wall-clock times in UTC+1.
/// let legacy = parse_timestamp("19500101").unwrap();
/// assert_eq!(legacy.to_rfc3339(), "1950-01-01T00:00:00+01:00");
///
/// assert!(parse_timestamp("2023-01-01").is_err());
/// ```
pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>, TimestampError> {
    let value = value.trim();
    let format = LegacyDateFormat::for_value(value)?;
    let naive = format
        .parse_naive(value)
        .ok_or_else(|| TimestampError::Invalid {
            value: value.to_string(),
            format,
        })?;
    localize(naive).ok_or_else(|| TimestampError::OutOfRange(value.to_string()))
}

/// Attaches the zone a provider timestamp is expressed in.
///
/// Years from 2000 onwards are UTC, older ones are legacy UTC+1 civil time.
pub fn localize(naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    let offset = if naive.year() < LEGACY_CUTOFF_YEAR {
        FixedOffset::east_opt(LEGACY_OFFSET_SECONDS)?
    } else {
        FixedOffset::east_opt(0)?
    };
    offset.from_local_datetime(&naive).single()
}
