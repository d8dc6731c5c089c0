//! Cross-file input validation
//!
//! The observation and warning/forecast inputs arrive as independently
//! supplied files. Before any matching begins, the station codes and the
//! month they reference must agree, and the observations must fall within
//! range of the warning issue date. Disagreement is reported as a
//! [`Error::CrossFileMismatch`], never silently corrected.

use crate::app::services::time_normalizer::{months_match, parse_partial, ReferenceDate};
use crate::constants::OBSERVATION_RANGE_DAYS;
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::sync::LazyLock;
use tracing::info;

/// ICAO code at the start of a report line
static ICAO_LEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([A-Z]{4})\s+").unwrap());

/// ICAO code followed by a report time group
static ICAO_BEFORE_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{4})\s+\d{6}Z?\b").unwrap());

/// Any standalone four-letter uppercase token
static ICAO_ANY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b([A-Z]{4})\b").unwrap());

/// Full 12-digit timestamp
static TWELVE_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{12})\b").unwrap());

/// 8-digit issue date
static EIGHT_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{8})\b").unwrap());

/// Extract the ICAO station code from observation text
pub fn extract_station_from_observations(text: &str) -> Option<String> {
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(c) = ICAO_BEFORE_TIME.captures(line) {
            return Some(c[1].to_string());
        }
        if let Some(c) = ICAO_LEADING.captures(line) {
            return Some(c[1].to_string());
        }
    }
    None
}

/// Extract the ICAO station code from warning bulletin text
pub fn extract_station_from_warnings(text: &str) -> Option<String> {
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(c) = ICAO_BEFORE_TIME.captures(line) {
            return Some(c[1].to_string());
        }
        if let Some(c) = ICAO_ANY.captures(line) {
            return Some(c[1].to_string());
        }
    }
    None
}

/// Extract the warning issue date from the first few bulletin lines
pub fn extract_issue_date(text: &str, reference: ReferenceDate) -> Option<DateTime<Utc>> {
    for line in text.lines().take(5) {
        if let Some(c) = EIGHT_DIGITS.captures(line) {
            if let Ok(dt) = parse_partial(&c[1], reference) {
                return Some(dt);
            }
        }
    }
    None
}

/// Extract absolute observation timestamps from observation text
pub fn extract_observation_timestamps(
    text: &str,
    reference: ReferenceDate,
) -> Vec<DateTime<Utc>> {
    text.lines()
        .filter(|l| !l.trim_start().starts_with('#'))
        .filter_map(|line| TWELVE_DIGITS.captures(line))
        .filter_map(|c| parse_partial(&c[1], reference).ok())
        .collect()
}

/// Validate that both inputs reference the same station.
///
/// Returns the agreed station code for use as the run's station context.
pub fn validate_station_match(obs_text: &str, warning_text: &str) -> Result<String> {
    let obs_station = extract_station_from_observations(obs_text).ok_or_else(|| {
        Error::cross_file_mismatch("Could not extract station code from observation text")
    })?;
    let warning_station = extract_station_from_warnings(warning_text).ok_or_else(|| {
        Error::cross_file_mismatch("Could not extract station code from warning text")
    })?;

    if obs_station != warning_station {
        return Err(Error::cross_file_mismatch(format!(
            "Station code mismatch: observations = {}, warnings = {}",
            obs_station, warning_station
        )));
    }

    info!("Station codes agree: {}", obs_station);
    Ok(obs_station)
}

/// Validate that observations fall within range of the warning issue date
/// and reference the same month.
pub fn validate_date_range(
    obs_text: &str,
    warning_text: &str,
    reference: ReferenceDate,
) -> Result<()> {
    let issue_date = extract_issue_date(warning_text, reference).ok_or_else(|| {
        Error::cross_file_mismatch("Could not extract issue date from warning text")
    })?;

    let timestamps = extract_observation_timestamps(obs_text, reference);
    if timestamps.is_empty() {
        return Err(Error::cross_file_mismatch(
            "Could not extract timestamps from observation text",
        ));
    }

    let range_end = issue_date + Duration::days(OBSERVATION_RANGE_DAYS);
    let in_range = timestamps
        .iter()
        .any(|ts| *ts >= issue_date && *ts <= range_end);
    if !in_range {
        return Err(Error::cross_file_mismatch(format!(
            "No observation falls within {} days of the warning issue date {}",
            OBSERVATION_RANGE_DAYS, issue_date
        )));
    }

    // The verified month itself must agree as well
    months_match(issue_date, timestamps[0])
}
