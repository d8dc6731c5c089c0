//! Tolerance scoring and accuracy aggregation
//!
//! Takes the combined forecast/observed records produced by the matcher and
//! interpolator and turns them into per-element pass/fail rows plus category
//! accuracy percentages. All state is local to one invocation; scoring the
//! same input twice yields identical metrics.

use crate::app::models::{AccuracyMetric, Category, MatchResult, VerifiedLevel};
use crate::config::VerifyConfig;
use itertools::Itertools;
use tracing::debug;

/// Shorter-arc angular separation between two directions, range [0, 180]
pub fn circular_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs() % 360.0;
    diff.min(360.0 - diff)
}

pub struct Scorer {
    config: VerifyConfig,
}

impl Scorer {
    pub fn new(config: VerifyConfig) -> Self {
        Self { config }
    }

    /// Score every interpolated level for temperature, wind speed, and wind
    /// direction. Each level yields three rows.
    pub fn score_levels(&self, levels: &[VerifiedLevel]) -> Vec<MatchResult> {
        levels
            .iter()
            .flat_map(|level| self.score_level(level))
            .collect()
    }

    /// Three tolerance checks for one level.
    ///
    /// Wind direction uses the circular (shorter-arc) difference here, unlike
    /// the matcher's plain absolute check for gust directions. A difference of
    /// exactly the tolerance is still correct.
    pub fn score_level(&self, level: &VerifiedLevel) -> Vec<MatchResult> {
        let element = element_label(level.forecast.altitude_m);
        let station = level.forecast.station.clone();
        let time = level.forecast.valid_from.format("%d/%H%M").to_string();

        let temp_diff = (level.forecast.temp_c - level.actual_temp_c).abs();
        let temp_ok = temp_diff <= self.config.temp_tolerance_c;

        let actual_speed_kt = level.actual_wind_speed_kt(self.config.mps_to_knots);
        let speed_diff = (f64::from(level.forecast.wind_speed_kt) - actual_speed_kt).abs();
        let speed_ok = speed_diff <= self.config.wind_speed_tolerance_kt;

        let dir_diff = circular_difference(
            f64::from(level.forecast.wind_dir_deg),
            level.actual_wind_dir_deg,
        );
        let dir_ok = dir_diff <= self.config.wind_dir_tolerance_deg;

        debug!(
            altitude_m = level.forecast.altitude_m,
            temp_diff, speed_diff, dir_diff, "scored level"
        );

        vec![
            MatchResult {
                element: element.clone(),
                category: Category::Temperature,
                correct: temp_ok,
                remark: format!(
                    "Forecast {:.1} C, observed {:.1} C",
                    level.forecast.temp_c, level.actual_temp_c
                ),
                station: station.clone(),
                time: time.clone(),
            },
            MatchResult {
                element: element.clone(),
                category: Category::WindSpeed,
                correct: speed_ok,
                remark: format!(
                    "Forecast {}KT, observed {:.1}KT",
                    level.forecast.wind_speed_kt, actual_speed_kt
                ),
                station: station.clone(),
                time: time.clone(),
            },
            MatchResult {
                element,
                category: Category::WindDirection,
                correct: dir_ok,
                remark: format!(
                    "Forecast {} deg, observed {:.0} deg",
                    level.forecast.wind_dir_deg, level.actual_wind_dir_deg
                ),
                station,
                time,
            },
        ]
    }

    /// Binary keyword-overlap check between a forecast weather narrative and
    /// observation text. Any shared uppercase token is a full match.
    pub fn score_weather(
        &self,
        narrative: &str,
        observation_text: &str,
        station: &str,
        time: &str,
    ) -> MatchResult {
        let obs_tokens: Vec<&str> = weather_tokens(observation_text).collect();
        let shared = weather_tokens(narrative).find(|t| obs_tokens.contains(t));

        MatchResult {
            element: Category::Weather.label().to_string(),
            category: Category::Weather,
            correct: shared.is_some(),
            remark: match shared {
                Some(token) => format!("{} reported", token),
                None => "No forecast weather reported".to_string(),
            },
            station: station.to_string(),
            time: time.to_string(),
        }
    }

    /// Per-category accuracy metrics plus an overall row.
    ///
    /// Categories absent from the input produce no metric. Percentages come
    /// from [`AccuracyMetric::from_counts`].
    pub fn aggregate(&self, rows: &[MatchResult]) -> Vec<AccuracyMetric> {
        let by_category = rows.iter().into_group_map_by(|r| r.category);

        let mut metrics: Vec<AccuracyMetric> = [
            Category::Gust,
            Category::Thunderstorm,
            Category::WindDirection,
            Category::WindSpeed,
            Category::Temperature,
            Category::Weather,
        ]
        .into_iter()
        .filter_map(|category| {
            let group = by_category.get(&category)?;
            let correct = group.iter().filter(|r| r.correct).count();
            Some(AccuracyMetric::from_counts(
                category.label(),
                group.len(),
                correct,
            ))
        })
        .collect();

        if !rows.is_empty() {
            let correct = rows.iter().filter(|r| r.correct).count();
            metrics.push(AccuracyMetric::from_counts("Overall", rows.len(), correct));
        }
        metrics
    }

    /// Accuracy over the standard flight levels only, ignoring levels at
    /// other altitudes.
    pub fn aggregate_flight_levels(&self, levels: &[VerifiedLevel]) -> Vec<AccuracyMetric> {
        let restricted: Vec<VerifiedLevel> = levels
            .iter()
            .filter(|l| crate::constants::flight_level_label(l.forecast.altitude_m).is_some())
            .cloned()
            .collect();
        self.aggregate(&self.score_levels(&restricted))
    }
}

fn element_label(altitude_m: u32) -> String {
    match crate::constants::flight_level_label(altitude_m) {
        Some(label) => label.to_string(),
        None => format!("{} M", altitude_m),
    }
}

/// Uppercase tokens of at least two letters
fn weather_tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_ascii_uppercase())
        .filter(|t| t.len() >= 2)
}
