//! Data models for forecast verification
//!
//! This module contains the core data structures for decoded observations,
//! warnings, forecasts and upper-air profiles, and the result types handed
//! to external report renderers. Every record is owned by a single
//! verification run and never mutated after decoding; result rows are
//! never mutated after creation.

use crate::constants::CONVECTIVE_MARKER;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// =============================================================================
// Surface Observation Records
// =============================================================================

/// One cloud layer reported in a surface observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudLayer {
    /// Raw cloud group code (e.g. "FEW030CB", "SCT018")
    pub code: String,

    /// Cloud base in hundreds of feet, when the group carries one
    pub base_hundreds_ft: Option<u32>,
}

impl CloudLayer {
    /// Whether this layer carries the convective (cumulonimbus) marker
    pub fn is_convective(&self) -> bool {
        self.code.contains(CONVECTIVE_MARKER)
    }
}

/// One decoded surface observation report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// ICAO station identifier
    pub station: String,

    /// Absolute observation time
    pub timestamp: DateTime<Utc>,

    /// Wind direction in degrees (absent for variable or missing wind)
    pub wind_dir_deg: Option<u16>,

    /// Wind speed in knots
    pub wind_speed_kt: Option<u32>,

    /// Gust speed in knots, when reported
    pub gust_kt: Option<u32>,

    /// Cloud layers in reported order
    pub clouds: Vec<CloudLayer>,

    /// Significant weather codes present in the report
    pub sig_wx: BTreeSet<String>,

    /// The raw source line this record was decoded from
    pub raw: String,
}

impl ObservationRecord {
    /// Whether any reported cloud layer is convective
    pub fn has_convective_cloud(&self) -> bool {
        self.clouds.iter().any(CloudLayer::is_convective)
    }

    /// First convective cloud group, if any
    pub fn convective_cloud_group(&self) -> Option<&str> {
        self.clouds
            .iter()
            .find(|layer| layer.is_convective())
            .map(|layer| layer.code.as_str())
    }
}

// =============================================================================
// Aerodrome Warning Records
// =============================================================================

/// Whether a warning entry predicts conditions or reports already-observed ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFlag {
    /// Forecast entry, verified against observations
    Forecast,
    /// Already-observed entry; bypasses matching and scores correct
    Observed,
}

impl SourceFlag {
    /// Decode the FCST/OBS token from a warning weather line
    pub fn from_line(line: &str) -> Option<Self> {
        if line.contains("FCST") {
            Some(SourceFlag::Forecast)
        } else if line.contains("OBSD") || line.contains("OBS") {
            Some(SourceFlag::Observed)
        } else {
            None
        }
    }
}

impl fmt::Display for SourceFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFlag::Forecast => write!(f, "FCST"),
            SourceFlag::Observed => write!(f, "OBS"),
        }
    }
}

/// One decoded aerodrome warning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningRecord {
    /// ICAO station identifier
    pub station: String,

    /// Issue time in the bulletin's display form, "DD/HHMM"
    pub issue_time: String,

    /// Start of the validity window, rounded down to the half hour
    pub validity_from: DateTime<Utc>,

    /// End of the validity window, rounded up to the next half hour
    pub validity_to: DateTime<Utc>,

    /// Forecast wind direction in degrees, resolved from a compass label
    /// or numeric token
    pub wind_dir_deg: Option<u16>,

    /// Forecast sustained wind speed token (e.g. "20KT")
    pub wind_speed: Option<String>,

    /// Forecast gust token (e.g. "35KT")
    pub gust: Option<String>,

    /// Significant weather code (e.g. "+TSRA")
    pub sig_wx: Option<String>,

    /// Forecast/observed source flag, when the bulletin carries one
    pub source_flag: Option<SourceFlag>,
}

impl WarningRecord {
    /// Validate the validity-window invariant
    pub fn validate(&self) -> Result<()> {
        if self.validity_to < self.validity_from {
            return Err(Error::data_validation(format!(
                "Warning validity end {} precedes start {}",
                self.validity_to, self.validity_from
            )));
        }
        Ok(())
    }

    /// Forecast gust speed in knots, when the gust token is well-formed
    pub fn gust_kt(&self) -> Option<u32> {
        let token = self.gust.as_deref()?;
        token.strip_suffix("KT")?.parse().ok()
    }

    /// Whether the entry reports already-observed conditions
    pub fn is_observed(&self) -> bool {
        self.source_flag == Some(SourceFlag::Observed)
    }
}

// =============================================================================
// Forecast and Profile Records
// =============================================================================

/// One altitude level from a local/area or upper-wind forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastLevelRecord {
    /// ICAO station identifier the forecast is for
    pub station: String,

    /// Forecast altitude in metres
    pub altitude_m: u32,

    /// Forecast wind direction in degrees
    pub wind_dir_deg: u16,

    /// Forecast wind speed in knots
    pub wind_speed_kt: u32,

    /// Forecast temperature in degrees Celsius
    pub temp_c: f64,

    /// Free-text significant weather narrative for the forecast period
    pub sig_wx_text: String,

    /// Start of the forecast validity window
    pub valid_from: DateTime<Utc>,

    /// End of the forecast validity window
    pub valid_to: DateTime<Utc>,
}

/// One level of an observed upper-air sounding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedProfileRecord {
    /// Geopotential height in metres
    pub height_m: f64,

    /// Temperature in degrees Celsius
    pub temp_c: f64,

    /// Wind speed in metres per second
    pub wind_speed_mps: f64,

    /// Wind direction in degrees
    pub wind_dir_deg: f64,
}

/// A forecast level paired with the observed values derived for its altitude
///
/// Temperature is height-weighted linear interpolation between the bounding
/// sounding levels; wind comes from the nearer bound only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedLevel {
    /// The forecast values being verified
    pub forecast: ForecastLevelRecord,

    /// Observed temperature interpolated to the forecast altitude
    pub actual_temp_c: f64,

    /// Observed wind speed (m/s) at the nearer bounding level
    pub actual_wind_speed_mps: f64,

    /// Observed wind direction at the nearer bounding level
    pub actual_wind_dir_deg: f64,
}

impl VerifiedLevel {
    /// Observed wind speed converted to knots
    pub fn actual_wind_speed_kt(&self, mps_to_knots: f64) -> f64 {
        self.actual_wind_speed_mps * mps_to_knots
    }
}

// =============================================================================
// Verification Results
// =============================================================================

/// Verification category a result row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Surface wind gust warnings
    Gust,
    /// Thunderstorm/convection warnings
    Thunderstorm,
    /// Upper-air wind direction
    WindDirection,
    /// Upper-air wind speed
    WindSpeed,
    /// Upper-air temperature
    Temperature,
    /// Significant weather narrative
    Weather,
}

impl Category {
    /// Human-readable label used in report rows and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Category::Gust => "Gust warning",
            Category::Thunderstorm => "Thunderstorm warning",
            Category::WindDirection => "Wind Direction",
            Category::WindSpeed => "Wind Speed",
            Category::Temperature => "Temperature",
            Category::Weather => "Significant Weather",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One scored comparison between a forecast element and observations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Identifier of the source element (serial number or flight level label)
    pub element: String,

    /// Category this verdict counts towards
    pub category: Category,

    /// Whether the forecast element verified correct
    pub correct: bool,

    /// Diagnostic remark recording which sub-checks passed or failed
    pub remark: String,

    /// Station the element applies to
    pub station: String,

    /// Issue time or validity label for the element
    pub time: String,
}

/// Accuracy aggregate for one category (or the overall total)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccuracyMetric {
    /// Category label, e.g. "Gust warning" or "Overall"
    pub label: String,

    /// Number of elements evaluated
    pub total: usize,

    /// Number of elements that verified correct
    pub correct: usize,

    /// Rounded integer percentage, 100 * correct / total
    pub percent: u32,
}

impl AccuracyMetric {
    /// Build a metric from counters, rounding to the nearest whole percent
    pub fn from_counts(label: impl Into<String>, total: usize, correct: usize) -> Self {
        let percent = if total == 0 {
            0
        } else {
            ((correct as f64 / total as f64) * 100.0).round() as u32
        };
        Self {
            label: label.into(),
            total,
            correct,
            percent,
        }
    }
}

/// Complete result of one verification run
///
/// Run-scoped and returned to the caller; nothing here survives the run or
/// is shared across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Station the run verified
    pub station: String,

    /// Per-element comparison rows in source order
    pub rows: Vec<MatchResult>,

    /// Per-category accuracy aggregates plus the overall figure
    pub metrics: Vec<AccuracyMetric>,

    /// Count of input records skipped during decoding, for auditability
    pub skipped_records: usize,
}

// =============================================================================
// Decoding Statistics
// =============================================================================

/// Line-level decoding statistics shared by the text decoders
///
/// Malformed lines are data loss, not errors; they are counted here so a
/// run can report how much input it discarded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecodeStats {
    /// Total number of candidate lines examined
    pub total_lines: usize,

    /// Number of records successfully decoded
    pub records_decoded: usize,

    /// Number of lines skipped as malformed or irrelevant
    pub lines_skipped: usize,

    /// Number of well-formed records dropped by a station filter
    pub records_filtered: usize,

    /// Reasons for skipped lines, for debugging
    pub errors: Vec<String>,
}

impl DecodeStats {
    /// Create new empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Success rate as a percentage of examined lines
    pub fn success_rate(&self) -> f64 {
        if self.total_lines == 0 {
            0.0
        } else {
            (self.records_decoded as f64 / self.total_lines as f64) * 100.0
        }
    }
}
