//! Local/area forecast document decoder
//!
//! Decodes forecast documents carrying a labeled upper-winds table and a
//! weather narrative, and plain-text listings of day + element tokens.
//! Unlike the observation and warning decoders, a document without its
//! required section markers cannot be verified at all, so a missing
//! marker is a hard [`Error::SectionMissing`] rather than a skip.

use crate::app::models::ForecastLevelRecord;
use crate::app::services::time_normalizer::{parse_partial, ReferenceDate};
use crate::constants::{LOCAL_FORECAST_LABEL, UPPER_WINDS_MARKER, WEATHER_SECTION_MARKER};
use crate::{Error, Result};
use chrono::{Duration, TimeZone, Utc};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Level triple: altitude in metres, 3-digit direction / 2-digit speed, signed temperature
static LEVEL_TRIPLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{3,4})M\s+(\d{3})/(\d{2})KT\s+([+-]\d{2})\b").unwrap());

/// Validity span: `FROM <timestamp> TO <timestamp> UTC`
static VALIDITY_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"FROM\s+(\d{4,12})Z?\s+TO\s+(\d{4,12})Z?\s+UTC").unwrap());

/// Station span: `LOCAL FORECAST FOR <STATION> AND`
static STATION_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"LOCAL FORECAST FOR\s+([A-Z]{4})\s+AND").unwrap());

/// Leading day-of-month token on a listing line
static LISTING_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{1,2})\s+(.*)$").unwrap());

/// Decoder for forecast documents and listings
#[derive(Debug, Clone)]
pub struct ForecastDecoder {
    /// Year/month context for completing partial validity timestamps
    reference: ReferenceDate,
}

impl ForecastDecoder {
    /// Create a decoder with the given time context
    pub fn new(reference: ReferenceDate) -> Self {
        Self { reference }
    }

    /// Decode a forecast document with upper-winds and weather sections.
    ///
    /// Returns one record per altitude found in the upper-winds table,
    /// sorted by altitude descending, each carrying the document's station,
    /// validity window, and weather narrative.
    pub fn decode_document(&self, text: &str) -> Result<Vec<ForecastLevelRecord>> {
        let station = STATION_SPAN
            .captures(text)
            .map(|c| c[1].to_string())
            .ok_or_else(|| Error::section_missing("forecast document", LOCAL_FORECAST_LABEL))?;

        let validity = VALIDITY_SPAN
            .captures(text)
            .ok_or_else(|| Error::section_missing("forecast document", "FROM ... TO ... UTC"))?;
        let valid_from = parse_partial(&validity[1], self.reference)?;
        let valid_to = parse_partial(&validity[2], self.reference)?;

        let upper_winds = section_after(text, UPPER_WINDS_MARKER)
            .map(|s| match s.find(WEATHER_SECTION_MARKER) {
                Some(end) => &s[..end],
                None => s,
            })
            .ok_or_else(|| Error::section_missing("forecast document", UPPER_WINDS_MARKER))?;

        // The weather narrative follows its own marker; a document issued
        // without one scores no weather category rather than failing.
        let sig_wx_text = section_after(text, WEATHER_SECTION_MARKER)
            .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();

        let mut levels: Vec<ForecastLevelRecord> = LEVEL_TRIPLE
            .captures_iter(upper_winds)
            .filter_map(|c| {
                let altitude_m = c[1].parse::<u32>().ok()?;
                let wind_dir_deg = c[2].parse::<u16>().ok().filter(|d| *d < 360)?;
                let wind_speed_kt = c[3].parse::<u32>().ok()?;
                let temp_c = c[4].parse::<f64>().ok()?;
                Some(ForecastLevelRecord {
                    station: station.clone(),
                    altitude_m,
                    wind_dir_deg,
                    wind_speed_kt,
                    temp_c,
                    sig_wx_text: sig_wx_text.clone(),
                    valid_from,
                    valid_to,
                })
            })
            .collect();

        if levels.is_empty() {
            return Err(Error::section_missing(
                "forecast document",
                "upper winds level table",
            ));
        }

        levels.sort_by(|a, b| b.altitude_m.cmp(&a.altitude_m));
        debug!(
            "Decoded {} forecast levels for {} ({} to {})",
            levels.len(),
            station,
            valid_from,
            valid_to
        );
        Ok(levels)
    }

    /// Decode a plain-text listing of day + element tokens.
    ///
    /// Each line starts with a day of month followed by level triples; the
    /// validity window for a line spans that whole day. Lines without
    /// element tokens are skipped.
    pub fn decode_listing(&self, text: &str, station: &str) -> Result<Vec<ForecastLevelRecord>> {
        let mut levels = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            let Some(caps) = LISTING_LINE.captures(line) else {
                continue;
            };
            let Ok(day) = caps[1].parse::<u32>() else {
                continue;
            };

            let valid_from = match Utc.with_ymd_and_hms(
                self.reference.year,
                self.reference.month,
                day,
                0,
                0,
                0,
            ) {
                chrono::LocalResult::Single(dt) => dt,
                _ => continue,
            };
            let valid_to = valid_from + Duration::days(1);

            for c in LEVEL_TRIPLE.captures_iter(&caps[2]) {
                let (Ok(altitude_m), Ok(wind_dir_deg), Ok(wind_speed_kt), Ok(temp_c)) = (
                    c[1].parse::<u32>(),
                    c[2].parse::<u16>(),
                    c[3].parse::<u32>(),
                    c[4].parse::<f64>(),
                ) else {
                    continue;
                };
                levels.push(ForecastLevelRecord {
                    station: station.to_string(),
                    altitude_m,
                    wind_dir_deg,
                    wind_speed_kt,
                    temp_c,
                    sig_wx_text: String::new(),
                    valid_from,
                    valid_to,
                });
            }
        }

        if levels.is_empty() {
            return Err(Error::section_missing("forecast listing", "day/element lines"));
        }

        levels.sort_by(|a, b| b.altitude_m.cmp(&a.altitude_m));
        Ok(levels)
    }
}

/// Content following a section marker, to the end of the document
fn section_after<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let start = text.find(marker)? + marker.len();
    let rest = &text[start..];
    Some(rest)
}
