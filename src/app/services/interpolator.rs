//! Vertical interpolation of observed profiles
//!
//! A sounding samples the atmosphere at whatever heights the balloon
//! reported, which rarely line up with the altitudes a forecast names. For
//! each forecast altitude this module derives the observed values at exactly
//! that height from the two bounding profile levels.
//!
//! Temperature is interpolated linearly between the bounds. Wind is NOT
//! interpolated; the nearer bound's values are taken wholesale, since wind
//! fields are not assumed linear over these separations. Altitudes outside
//! the profile's span are skipped outright, never extrapolated.

use crate::app::models::{ForecastLevelRecord, ObservedProfileRecord, VerifiedLevel};
use tracing::debug;

pub struct Interpolator;

impl Interpolator {
    /// Derive observed values at each forecast altitude.
    ///
    /// `profile` must be sorted by height ascending, as the sounding decoder
    /// produces it. Forecast levels the profile does not bracket are dropped
    /// from the output.
    pub fn interpolate(
        forecast_levels: &[ForecastLevelRecord],
        profile: &[ObservedProfileRecord],
    ) -> Vec<VerifiedLevel> {
        forecast_levels
            .iter()
            .filter_map(|level| Self::at_altitude(level, profile))
            .collect()
    }

    fn at_altitude(
        forecast: &ForecastLevelRecord,
        profile: &[ObservedProfileRecord],
    ) -> Option<VerifiedLevel> {
        let target = f64::from(forecast.altitude_m);

        let below = profile.iter().rev().find(|p| p.height_m <= target);
        let above = profile.iter().find(|p| p.height_m >= target);

        let (lower, upper) = match (below, above) {
            (Some(l), Some(u)) => (l, u),
            _ => {
                debug!(altitude_m = forecast.altitude_m, "altitude outside profile span, skipping");
                return None;
            }
        };

        // Exact hit, or duplicate heights at the target
        if (upper.height_m - lower.height_m).abs() < f64::EPSILON {
            return Some(VerifiedLevel {
                forecast: forecast.clone(),
                actual_temp_c: lower.temp_c,
                actual_wind_speed_mps: lower.wind_speed_mps,
                actual_wind_dir_deg: lower.wind_dir_deg,
            });
        }

        let temp = ((upper.height_m - target) * lower.temp_c
            + (target - lower.height_m) * upper.temp_c)
            / (upper.height_m - lower.height_m);

        // Tie between bounds goes to the lower level
        let nearer = if (target - lower.height_m) <= (upper.height_m - target) {
            lower
        } else {
            upper
        };

        Some(VerifiedLevel {
            forecast: forecast.clone(),
            actual_temp_c: temp,
            actual_wind_speed_mps: nearer.wind_speed_mps,
            actual_wind_dir_deg: nearer.wind_dir_deg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn create_test_level(altitude_m: u32) -> ForecastLevelRecord {
        ForecastLevelRecord {
            station: "VABB".to_string(),
            altitude_m,
            wind_dir_deg: 250,
            wind_speed_kt: 15,
            temp_c: 18.0,
            sig_wx_text: String::new(),
            valid_from: Utc.with_ymd_and_hms(2025, 7, 13, 0, 0, 0).unwrap(),
            valid_to: Utc.with_ymd_and_hms(2025, 7, 13, 12, 0, 0).unwrap(),
        }
    }

    fn level(height_m: f64, temp_c: f64, wind_speed_mps: f64, wind_dir_deg: f64) -> ObservedProfileRecord {
        ObservedProfileRecord {
            height_m,
            temp_c,
            wind_speed_mps,
            wind_dir_deg,
        }
    }

    #[test]
    fn test_linear_midpoint_temperature() {
        let profile = vec![level(600.0, 20.0, 5.0, 180.0), level(1200.0, 14.0, 8.0, 200.0)];
        let out = Interpolator::interpolate(&[create_test_level(900)], &profile);
        assert_eq!(out.len(), 1);
        assert!((out[0].actual_temp_c - 17.0).abs() < 1e-9);
    }

    #[test]
    fn test_wind_taken_from_nearer_bound() {
        let profile = vec![level(600.0, 20.0, 5.0, 180.0), level(1200.0, 14.0, 8.0, 200.0)];
        let out = Interpolator::interpolate(&[create_test_level(700)], &profile);
        assert_eq!(out[0].actual_wind_speed_mps, 5.0);
        assert_eq!(out[0].actual_wind_dir_deg, 180.0);

        let out = Interpolator::interpolate(&[create_test_level(1100)], &profile);
        assert_eq!(out[0].actual_wind_speed_mps, 8.0);
    }

    #[test]
    fn test_equidistant_tie_uses_lower_bound() {
        let profile = vec![level(600.0, 20.0, 5.0, 180.0), level(1200.0, 14.0, 8.0, 200.0)];
        let out = Interpolator::interpolate(&[create_test_level(900)], &profile);
        assert_eq!(out[0].actual_wind_speed_mps, 5.0);
    }

    #[test]
    fn test_no_extrapolation_below_or_above_profile() {
        let profile = vec![level(600.0, 20.0, 5.0, 180.0), level(1200.0, 14.0, 8.0, 200.0)];
        let out = Interpolator::interpolate(
            &[create_test_level(300), create_test_level(3000)],
            &profile,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_exact_profile_level_passes_through() {
        let profile = vec![level(600.0, 20.0, 5.0, 180.0), level(1200.0, 14.0, 8.0, 200.0)];
        let out = Interpolator::interpolate(&[create_test_level(1200)], &profile);
        assert_eq!(out[0].actual_temp_c, 14.0);
        assert_eq!(out[0].actual_wind_dir_deg, 200.0);
    }

    #[test]
    fn test_unbracketed_levels_are_dropped_but_others_kept() {
        let profile = vec![level(600.0, 20.0, 5.0, 180.0), level(1200.0, 14.0, 8.0, 200.0)];
        let out = Interpolator::interpolate(
            &[create_test_level(300), create_test_level(900)],
            &profile,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].forecast.altitude_m, 900);
    }
}
