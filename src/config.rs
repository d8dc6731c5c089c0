//! Configuration management and validation.
//!
//! The tolerances in the current design are fixed operational values, but
//! they are carried here as named parameters so a deployment can adjust
//! them in one place. Defaults come from [`crate::constants`].

use crate::constants;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Verification tolerances and matching parameters for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Wind direction tolerance in degrees (applies to both the matcher's
    /// absolute check and the scorer's circular check)
    pub wind_dir_tolerance_deg: f64,

    /// Temperature tolerance in degrees Celsius
    pub temp_tolerance_c: f64,

    /// Wind speed tolerance in knots
    pub wind_speed_tolerance_kt: f64,

    /// Conversion factor from metres per second to knots
    pub mps_to_knots: f64,

    /// Validity window rounding granularity in minutes
    pub rounding_minutes: u32,

    /// Restrict warning verification to this station (None keeps all stations)
    pub station_filter: Option<String>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            wind_dir_tolerance_deg: constants::WIND_DIR_TOLERANCE_DEG,
            temp_tolerance_c: constants::TEMP_TOLERANCE_C,
            wind_speed_tolerance_kt: constants::WIND_SPEED_TOLERANCE_KT,
            mps_to_knots: constants::MPS_TO_KNOTS,
            rounding_minutes: constants::HALF_HOUR_MINUTES,
            station_filter: None,
        }
    }
}

impl VerifyConfig {
    /// Create a configuration with a station filter applied
    pub fn for_station(station: impl Into<String>) -> Self {
        Self {
            station_filter: Some(station.into()),
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// Fields absent from the file keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents).map_err(|e| {
            Error::configuration(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;
        debug!("Loaded configuration from {}", path.display());
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values for consistency
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=180.0).contains(&self.wind_dir_tolerance_deg) {
            return Err(Error::configuration(format!(
                "Wind direction tolerance {} must be between 0 and 180 degrees",
                self.wind_dir_tolerance_deg
            )));
        }

        if self.temp_tolerance_c < 0.0 {
            return Err(Error::configuration(format!(
                "Temperature tolerance {} cannot be negative",
                self.temp_tolerance_c
            )));
        }

        if self.wind_speed_tolerance_kt < 0.0 {
            return Err(Error::configuration(format!(
                "Wind speed tolerance {} cannot be negative",
                self.wind_speed_tolerance_kt
            )));
        }

        if self.mps_to_knots <= 0.0 {
            return Err(Error::configuration(
                "Unit conversion factor must be positive".to_string(),
            ));
        }

        if self.rounding_minutes == 0 || 60 % self.rounding_minutes != 0 {
            return Err(Error::configuration(format!(
                "Rounding granularity {} must divide an hour evenly",
                self.rounding_minutes
            )));
        }

        if let Some(station) = &self.station_filter {
            if station.trim().is_empty() {
                return Err(Error::configuration(
                    "Station filter cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}
