//! Partial timestamp normalisation and validity-window rounding
//!
//! Bulletin timestamps arrive in several partial forms (day-hour-minute
//! with or without year or month). This module canonicalises them into
//! comparable absolute times, borrowing missing context from a reference
//! date, and hosts the half-hour rounding rules applied to warning
//! validity windows.
//!
//! Reconstruction of short forms is best-effort, not authoritative: an
//! 8-digit string is disambiguated by whether its leading four digits form
//! a plausible year, and two-digit years split at a fixed pivot.

use crate::constants::{
    FALLBACK_MONTH, FALLBACK_YEAR, TWO_DIGIT_YEAR_PIVOT, WARNING_MONTH_DAYS,
};
use crate::{Error, Result};
use chrono::{DateTime, Datelike, TimeZone, Utc};

/// Year and month context used to complete partial timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceDate {
    pub year: i32,
    pub month: u32,
}

impl ReferenceDate {
    /// Context taken from an already-known absolute time
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
        }
    }

    /// Fixed fallback used when no context exists at all
    pub fn fallback() -> Self {
        Self {
            year: FALLBACK_YEAR,
            month: FALLBACK_MONTH,
        }
    }
}

/// Resolve a two-digit year against the fixed pivot
fn expand_two_digit_year(yy: i32) -> i32 {
    if yy < TWO_DIGIT_YEAR_PIVOT {
        2000 + yy
    } else {
        1900 + yy
    }
}

/// Strip an optional trailing timezone marker and verify the rest is digits
fn digits_of(timestr: &str) -> Result<&str> {
    let digits = timestr.trim().trim_end_matches('Z');
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::time_parsing(format!(
            "Timestamp '{}' is not a digit string",
            timestr
        )));
    }
    Ok(digits)
}

/// Canonicalise a partial timestamp into an absolute UTC time.
///
/// Accepted digit lengths (optional trailing `Z` in all cases):
/// - 12: `YYYYMMDDHHMM`
/// - 10: `YYMMDDHHMM`, two-digit year expanded at the fixed pivot
/// -  8: `YYYYMMDD` when the leading four digits form a plausible year,
///       otherwise `DDMMYYYY`; time of day is midnight
/// -  6: `DDHHMM`, year and month borrowed from the reference date
/// -  4: `HHMM`, day 1 of the reference month
pub fn parse_partial(timestr: &str, reference: ReferenceDate) -> Result<DateTime<Utc>> {
    let digits = digits_of(timestr)?;

    let (year, month, day, hour, minute) = match digits.len() {
        12 => (
            digits[0..4].parse::<i32>().unwrap(),
            digits[4..6].parse::<u32>().unwrap(),
            digits[6..8].parse::<u32>().unwrap(),
            digits[8..10].parse::<u32>().unwrap(),
            digits[10..12].parse::<u32>().unwrap(),
        ),
        10 => (
            expand_two_digit_year(digits[0..2].parse::<i32>().unwrap()),
            digits[2..4].parse::<u32>().unwrap(),
            digits[4..6].parse::<u32>().unwrap(),
            digits[6..8].parse::<u32>().unwrap(),
            digits[8..10].parse::<u32>().unwrap(),
        ),
        8 => {
            let leading = digits[0..4].parse::<i32>().unwrap();
            if (1900..=2099).contains(&leading) {
                // YYYYMMDD
                (
                    leading,
                    digits[4..6].parse::<u32>().unwrap(),
                    digits[6..8].parse::<u32>().unwrap(),
                    0,
                    0,
                )
            } else {
                // DDMMYYYY
                (
                    digits[4..8].parse::<i32>().unwrap(),
                    digits[2..4].parse::<u32>().unwrap(),
                    digits[0..2].parse::<u32>().unwrap(),
                    0,
                    0,
                )
            }
        }
        6 => (
            reference.year,
            reference.month,
            digits[0..2].parse::<u32>().unwrap(),
            digits[2..4].parse::<u32>().unwrap(),
            digits[4..6].parse::<u32>().unwrap(),
        ),
        4 => (
            reference.year,
            reference.month,
            1,
            digits[0..2].parse::<u32>().unwrap(),
            digits[2..4].parse::<u32>().unwrap(),
        ),
        len => {
            return Err(Error::time_parsing(format!(
                "Timestamp '{}' has unsupported length {}",
                timestr, len
            )));
        }
    };

    // Days rolled past the assumed 30-day month can land on a date the real
    // month does not have; carry into the next month rather than fail.
    resolve_date(year, month, day, hour, minute).ok_or_else(|| {
        Error::time_parsing(format!("Timestamp '{}' is not a valid date/time", timestr))
    })
}

fn resolve_date(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    if let chrono::LocalResult::Single(dt) = Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
    {
        return Some(dt);
    }
    // Carry an overflowing day into the following month
    if day > 28 {
        let (year, month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        if let chrono::LocalResult::Single(dt) =
            Utc.with_ymd_and_hms(year, month, 1, hour, minute, 0)
        {
            return Some(dt);
        }
    }
    None
}

// =============================================================================
// Half-hour Rounding
// =============================================================================
//
// The rounding rules operate on the raw digit strings, before absolute-time
// resolution, because a bulletin hour of 24 is legal input that no calendar
// type will represent.

/// Round a `[DD]HHMM[Z]` string down to the nearest preceding half hour
pub fn round_down_to_half_hour(timestr: &str) -> String {
    let z = if timestr.ends_with('Z') { "Z" } else { "" };
    let digits = timestr.trim_end_matches('Z');
    if digits.len() < 4 {
        return format!("{}{}", digits, z);
    }
    let (prefix, hhmm) = digits.split_at(digits.len() - 4);
    let hour: u32 = hhmm[0..2].parse().unwrap_or(0);
    let minute: u32 = hhmm[2..4].parse().unwrap_or(0);
    let minute = if minute < 30 { 0 } else { 30 };
    format!("{}{:02}{:02}{}", prefix, hour, minute, z)
}

/// Round a `[DD]HHMM[Z]` string up to the next half hour.
///
/// An hour rolling past 23 wraps to 00 and increments the day, assuming a
/// 30-day month.
pub fn round_up_to_half_hour(timestr: &str) -> String {
    let z = if timestr.ends_with('Z') { "Z" } else { "" };
    let digits = timestr.trim_end_matches('Z');
    if digits.len() < 4 {
        return format!("{}{}", digits, z);
    }

    let (mut day, mut hour, minute): (u32, u32, u32) = if digits.len() >= 6 {
        (
            digits[0..2].parse().unwrap_or(1),
            digits[2..4].parse().unwrap_or(0),
            digits[4..6].parse().unwrap_or(0),
        )
    } else {
        (
            1,
            digits[digits.len() - 4..digits.len() - 2].parse().unwrap_or(0),
            digits[digits.len() - 2..].parse().unwrap_or(0),
        )
    };

    let minute = if minute == 0 || minute == 30 {
        return format!("{}{}", digits, z);
    } else if minute < 30 {
        30
    } else {
        hour = (hour + 1) % 24;
        if hour == 0 {
            day = (day % WARNING_MONTH_DAYS) + 1;
        }
        0
    };

    if digits.len() >= 6 {
        format!("{:02}{:02}{:02}{}", day, hour, minute, z)
    } else {
        format!("{:02}{:02}{}", hour, minute, z)
    }
}

/// Normalise a `2400` time to `0000` of the following day.
///
/// Day-of-month wraps at day 30, matching the issuing office convention.
pub fn fix_midnight_2400(timestr: &str) -> String {
    let z = if timestr.ends_with('Z') { "Z" } else { "" };
    let digits = timestr.trim_end_matches('Z');

    if !digits.ends_with("2400") {
        return format!("{}{}", digits, z);
    }

    if digits.len() >= 6 {
        let prefix = &digits[..digits.len() - 6];
        let day: u32 = digits[digits.len() - 6..digits.len() - 4]
            .parse()
            .unwrap_or(1);
        let next_day = (day % WARNING_MONTH_DAYS) + 1;
        format!("{}{:02}0000{}", prefix, next_day, z)
    } else {
        format!("0000{}", z)
    }
}

// =============================================================================
// Cross-file Month Agreement
// =============================================================================

/// Check that two absolute times reference the same month and year.
///
/// Forecast and observation inputs are supplied independently; a month
/// mismatch is a reported validation failure, never silently corrected.
pub fn months_match(a: DateTime<Utc>, b: DateTime<Utc>) -> Result<()> {
    if a.year() != b.year() || a.month() != b.month() {
        return Err(Error::cross_file_mismatch(format!(
            "Inputs reference different months: {}-{:02} vs {}-{:02}",
            a.year(),
            a.month(),
            b.year(),
            b.month()
        )));
    }
    Ok(())
}
