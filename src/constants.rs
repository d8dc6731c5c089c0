//! Application constants for the forecast verification engine
//!
//! This module contains the fixed tolerances, lookup tables, and text
//! markers used throughout the verification engine. Tables that drive
//! parsing decisions (compass points, weather-code precedence) are kept
//! here as explicit constant slices so they can be tested independently.

// =============================================================================
// Matching Tolerances
// =============================================================================

/// Maximum angular difference (degrees) for a wind direction to count as a match
pub const WIND_DIR_TOLERANCE_DEG: f64 = 30.0;

/// Maximum absolute temperature difference (deg C) for a temperature match
pub const TEMP_TOLERANCE_C: f64 = 2.0;

/// Maximum absolute wind speed difference (knots) for a wind speed match
pub const WIND_SPEED_TOLERANCE_KT: f64 = 10.0;

/// Conversion factor from metres per second to knots
pub const MPS_TO_KNOTS: f64 = 1.94384;

/// Granularity (minutes) that warning validity windows are rounded to
pub const HALF_HOUR_MINUTES: u32 = 30;

// =============================================================================
// Time Reconstruction
// =============================================================================

/// Two-digit years below this pivot are interpreted as 20xx, at or above as 19xx.
///
/// Best-effort heuristic with no authoritative source; see
/// `PartialTimestamp` for the disambiguation rules it feeds.
pub const TWO_DIGIT_YEAR_PIVOT: i32 = 50;

/// Day-of-month wraparound used when a validity time rolls past midnight.
///
/// Warning bulletins carry no month context, so rollover assumes a 30-day
/// month exactly as issued products do.
pub const WARNING_MONTH_DAYS: u32 = 30;

/// Fallback year used when a partial timestamp has no context date
pub const FALLBACK_YEAR: i32 = 2000;

/// Fallback month used when a partial timestamp has no context date
pub const FALLBACK_MONTH: u32 = 1;

/// Observations are accepted within this many days of the warning issue date
pub const OBSERVATION_RANGE_DAYS: i64 = 30;

// =============================================================================
// Compass Point Lookup
// =============================================================================

/// 16-point compass labels (plus cardinal long forms) mapped to degrees.
///
/// The degree values are the conventional sector centres used by the issuing
/// office, not exact 22.5-degree multiples.
pub const COMPASS_POINTS: &[(&str, u16)] = &[
    ("N", 0),
    ("NNE", 20),
    ("NE", 50),
    ("ENE", 70),
    ("E", 90),
    ("ESE", 110),
    ("SE", 140),
    ("SSE", 160),
    ("S", 180),
    ("SSW", 200),
    ("SW", 230),
    ("WSW", 250),
    ("W", 270),
    ("WNW", 290),
    ("NW", 320),
    ("NNW", 340),
    ("NORTH", 0),
    ("EAST", 90),
    ("SOUTH", 180),
    ("WEST", 270),
];

/// Resolve a compass label to degrees
pub fn compass_to_degrees(label: &str) -> Option<u16> {
    COMPASS_POINTS
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, deg)| *deg)
}

// =============================================================================
// Significant Weather Vocabulary
// =============================================================================

/// Intensity-qualified significant weather phrases mapped to their METAR codes.
///
/// Ordered longest-match-first so a heavy-qualified phrase is never
/// mis-classified as its unqualified form. Matching must walk this slice
/// in order and stop at the first hit.
pub const SIG_WX_PATTERNS: &[(&str, &str)] = &[
    ("HVY TSRA", "+TSRA"),
    ("FBL TSRA", "-TSRA"),
    ("MOD TSRA", "TSRA"),
    ("TSRA", "TSRA"),
    ("HVY TS", "+TS"),
    ("FBL TS", "-TS"),
    ("MOD TS", "TS"),
    ("TS", "TS"),
];

/// Classify the significant weather content of a bulletin line.
///
/// Returns the first (longest) matching code, or `None` when the line
/// carries no recognised phenomenon.
pub fn classify_sig_wx(line: &str) -> Option<&'static str> {
    SIG_WX_PATTERNS
        .iter()
        .find(|(phrase, _)| line.contains(phrase))
        .map(|(_, code)| *code)
}

/// Cloud group substring that marks convective (cumulonimbus) cloud
pub const CONVECTIVE_MARKER: &str = "CB";

// =============================================================================
// Bulletin and Document Markers
// =============================================================================

/// Tokens that identify the start of an aerodrome warning bulletin header
pub const WARNING_HEADER_TOKENS: &[&str] = &["WRNG", "WARNING"];

/// Token that identifies the warning data line following the header
pub const WARNING_DATA_MARKER: &str = "AD WRNG";

/// Section marker opening the upper winds table in a forecast document
pub const UPPER_WINDS_MARKER: &str = "UPPER WINDS";

/// Section marker opening the weather narrative in a forecast document
pub const WEATHER_SECTION_MARKER: &str = "WEATHER";

/// Label preceding the station identifier in a forecast document
pub const LOCAL_FORECAST_LABEL: &str = "LOCAL FORECAST FOR";

// =============================================================================
// Flight Level Reporting
// =============================================================================

/// Forecast altitudes (metres) reported as flight levels, with their labels.
///
/// The upper-air summary restricted to flight levels only counts these.
pub const FLIGHT_LEVELS: &[(u32, &str)] = &[
    (3000, "FL 100 (3000 M)"),
    (2100, "FL 070 (2100 M)"),
    (1500, "FL 050 (1500 M)"),
    (900, "FL 030 (900 M)"),
    (600, "FL 020 (600 M)"),
    (300, "FL 010 (300 M)"),
];

/// Label for a flight-level altitude, if it is one of the reported levels
pub fn flight_level_label(altitude_m: u32) -> Option<&'static str> {
    FLIGHT_LEVELS
        .iter()
        .find(|(alt, _)| *alt == altitude_m)
        .map(|(_, label)| *label)
}
