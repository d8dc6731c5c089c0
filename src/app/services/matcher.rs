//! Warning-to-observation matching
//!
//! Each decoded [`WarningRecord`] is compared against the observations whose
//! timestamps fall inside its validity window. A warning forecasting both a
//! gust and a thunderstorm produces two independent [`MatchResult`] rows so
//! that the per-category accuracy counters stay separate.
//!
//! The gust direction check uses a plain absolute degree difference, not the
//! circular difference the scorer applies to upper-wind directions. The two
//! policies are intentionally distinct; see the scorer for the circular form.

use crate::app::models::{Category, MatchResult, ObservationRecord, WarningRecord};
use crate::config::VerifyConfig;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Thunderstorm-family codes, matched case-insensitively as substrings
static TS_FAMILY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(TSRA|FBL TSRA|MOD TSRA|HVY TSRA|FBL TS|MOD TS|HVY TS|TS)").unwrap()
});

/// Well-formed gust token, e.g. "35KT"
static GUST_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{2,3}KT$").unwrap());

/// Observation evidence collected from a warning's validity window
struct WindowEvidence {
    /// First observation reporting a gust with a direction inside tolerance
    gust_match: Option<(u32, u16)>,
    /// First convective cloud group reported in the window
    cb_group: Option<String>,
}

pub struct Matcher {
    config: VerifyConfig,
}

impl Matcher {
    pub fn new(config: VerifyConfig) -> Self {
        Self { config }
    }

    /// Score one warning against the full observation set.
    ///
    /// Observations outside the warning's validity window are ignored. An
    /// empty window never panics or skips the warning; every applicable
    /// category is scored incorrect with a diagnostic remark so the record
    /// counts against accuracy rather than disappearing from the totals.
    pub fn match_warning(
        &self,
        warning: &WarningRecord,
        observations: &[ObservationRecord],
    ) -> Vec<MatchResult> {
        let has_gust = warning
            .gust
            .as_deref()
            .is_some_and(|g| GUST_TOKEN.is_match(g));
        let has_tsra = warning
            .sig_wx
            .as_deref()
            .is_some_and(|wx| TS_FAMILY.is_match(wx));

        let mut categories = Vec::new();
        if has_gust {
            categories.push(Category::Gust);
        }
        if has_tsra {
            categories.push(Category::Thunderstorm);
        }
        if categories.is_empty() {
            categories.push(Category::Weather);
        }

        // Already-observed entries report a fact, not a prediction
        if warning.is_observed() {
            debug!(station = %warning.station, issue = %warning.issue_time, "observed entry, skipping matching");
            return categories
                .into_iter()
                .map(|category| self.result(warning, category, true, "OBS".to_string()))
                .collect();
        }

        let window: Vec<&ObservationRecord> = observations
            .iter()
            .filter(|obs| obs.timestamp >= warning.validity_from && obs.timestamp < warning.validity_to)
            .collect();
        debug!(
            station = %warning.station,
            issue = %warning.issue_time,
            observations = window.len(),
            "matching warning against validity window"
        );
        let evidence = self.gather_evidence(warning, &window);

        categories
            .into_iter()
            .map(|category| match category {
                Category::Gust => self.score_gust(warning, &evidence),
                Category::Thunderstorm => self.score_thunderstorm(warning, &evidence),
                _ => self.result(
                    warning,
                    Category::Weather,
                    false,
                    "No significant weather matched".to_string(),
                ),
            })
            .collect()
    }

    fn gather_evidence(
        &self,
        warning: &WarningRecord,
        window: &[&ObservationRecord],
    ) -> WindowEvidence {
        let mut gust_match = None;
        let mut cb_group = None;

        for obs in window {
            if gust_match.is_none() {
                if let (Some(obs_gust), Some(obs_dir), Some(fcst_dir)) =
                    (obs.gust_kt, obs.wind_dir_deg, warning.wind_dir_deg)
                {
                    // Absolute difference, no wrap at the 0/360 boundary
                    let diff = (f64::from(obs_dir) - f64::from(fcst_dir)).abs();
                    if diff <= self.config.wind_dir_tolerance_deg {
                        gust_match = Some((obs_gust, obs_dir));
                    }
                }
            }
            if cb_group.is_none() {
                if let Some(group) = obs.convective_cloud_group() {
                    cb_group = Some(group.to_string());
                }
            }
        }

        WindowEvidence {
            gust_match,
            cb_group,
        }
    }

    fn score_gust(&self, warning: &WarningRecord, evidence: &WindowEvidence) -> MatchResult {
        match evidence.gust_match {
            Some((gust, dir)) => {
                let mut remark = format!("Gust {}KT Dir {} matched", gust, dir);
                if let Some(group) = &evidence.cb_group {
                    remark.push_str(&format!(" {} found", group));
                }
                self.result(warning, Category::Gust, true, remark)
            }
            None => self.result(
                warning,
                Category::Gust,
                false,
                "No gust/direction match".to_string(),
            ),
        }
    }

    fn score_thunderstorm(
        &self,
        warning: &WarningRecord,
        evidence: &WindowEvidence,
    ) -> MatchResult {
        match &evidence.cb_group {
            Some(group) => self.result(
                warning,
                Category::Thunderstorm,
                true,
                format!("{} found", group),
            ),
            None => self.result(
                warning,
                Category::Thunderstorm,
                false,
                "Missing CB or direction mismatch".to_string(),
            ),
        }
    }

    fn result(
        &self,
        warning: &WarningRecord,
        category: Category,
        correct: bool,
        remark: String,
    ) -> MatchResult {
        MatchResult {
            element: category.label().to_string(),
            category,
            correct,
            remark,
            station: warning.station.clone(),
            time: warning.issue_time.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{CloudLayer, SourceFlag};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    fn create_test_warning(gust: Option<&str>, sig_wx: Option<&str>) -> WarningRecord {
        WarningRecord {
            station: "VABB".to_string(),
            issue_time: "13/0912".to_string(),
            validity_from: Utc.with_ymd_and_hms(2025, 7, 13, 9, 0, 0).unwrap(),
            validity_to: Utc.with_ymd_and_hms(2025, 7, 13, 18, 0, 0).unwrap(),
            wind_dir_deg: Some(180),
            wind_speed: Some("20KT".to_string()),
            gust: gust.map(String::from),
            sig_wx: sig_wx.map(String::from),
            source_flag: Some(SourceFlag::Forecast),
        }
    }

    fn create_test_observation(
        wind_dir: Option<u16>,
        gust: Option<u32>,
        clouds: Vec<CloudLayer>,
    ) -> ObservationRecord {
        ObservationRecord {
            station: "VABB".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 7, 13, 12, 0, 0).unwrap(),
            wind_dir_deg: wind_dir,
            wind_speed_kt: Some(20),
            gust_kt: gust,
            clouds,
            sig_wx: BTreeSet::new(),
            raw: String::new(),
        }
    }

    fn cb_layer() -> CloudLayer {
        CloudLayer {
            code: "FEW030CB".to_string(),
            base_hundreds_ft: Some(30),
        }
    }

    fn matcher() -> Matcher {
        Matcher::new(VerifyConfig::default())
    }

    mod gust {
        use super::*;

        #[test]
        fn test_gust_within_tolerance_is_correct() {
            let warning = create_test_warning(Some("35KT"), None);
            let obs = vec![create_test_observation(Some(190), Some(36), vec![])];
            let results = matcher().match_warning(&warning, &obs);
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].category, Category::Gust);
            assert!(results[0].correct);
            assert_eq!(results[0].remark, "Gust 36KT Dir 190 matched");
        }

        #[test]
        fn test_direction_outside_tolerance_is_incorrect() {
            let warning = create_test_warning(Some("35KT"), None);
            let obs = vec![create_test_observation(Some(140), Some(36), vec![])];
            let results = matcher().match_warning(&warning, &obs);
            assert!(!results[0].correct);
            assert_eq!(results[0].remark, "No gust/direction match");
        }

        #[test]
        fn test_gust_without_observed_gust_is_incorrect() {
            let warning = create_test_warning(Some("35KT"), None);
            let obs = vec![create_test_observation(Some(180), None, vec![])];
            let results = matcher().match_warning(&warning, &obs);
            assert!(!results[0].correct);
        }

        #[test]
        fn test_empty_window_is_incorrect() {
            let warning = create_test_warning(Some("35KT"), None);
            let results = matcher().match_warning(&warning, &[]);
            assert_eq!(results.len(), 1);
            assert!(!results[0].correct);
        }

        #[test]
        fn test_observation_outside_window_is_ignored() {
            let warning = create_test_warning(Some("35KT"), None);
            let mut obs = create_test_observation(Some(190), Some(36), vec![]);
            obs.timestamp = Utc.with_ymd_and_hms(2025, 7, 14, 12, 0, 0).unwrap();
            let results = matcher().match_warning(&warning, &[obs]);
            assert!(!results[0].correct);
        }
    }

    mod thunderstorm {
        use super::*;

        #[test]
        fn test_cb_layer_marks_thunderstorm_correct() {
            let warning = create_test_warning(None, Some("HVY TSRA"));
            let obs = vec![create_test_observation(Some(180), None, vec![cb_layer()])];
            let results = matcher().match_warning(&warning, &obs);
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].category, Category::Thunderstorm);
            assert!(results[0].correct);
            assert_eq!(results[0].remark, "FEW030CB found");
        }

        #[test]
        fn test_missing_cb_is_incorrect() {
            let warning = create_test_warning(None, Some("TSRA"));
            let obs = vec![create_test_observation(Some(180), None, vec![])];
            let results = matcher().match_warning(&warning, &obs);
            assert!(!results[0].correct);
            assert_eq!(results[0].remark, "Missing CB or direction mismatch");
        }

        #[test]
        fn test_family_match_is_case_insensitive() {
            let warning = create_test_warning(None, Some("mod tsra"));
            let results = matcher().match_warning(&warning, &[]);
            assert_eq!(results[0].category, Category::Thunderstorm);
        }
    }

    mod combined {
        use super::*;

        #[test]
        fn test_combined_warning_scores_two_categories() {
            let warning = create_test_warning(Some("35KT"), Some("TSRA"));
            let obs = vec![create_test_observation(
                Some(190),
                Some(36),
                vec![cb_layer()],
            )];
            let results = matcher().match_warning(&warning, &obs);
            assert_eq!(results.len(), 2);
            assert_eq!(results[0].category, Category::Gust);
            assert_eq!(results[1].category, Category::Thunderstorm);
            assert!(results[0].correct);
            assert!(results[1].correct);
            assert_eq!(results[0].remark, "Gust 36KT Dir 190 matched FEW030CB found");
        }

        #[test]
        fn test_cb_rescues_thunderstorm_but_not_gust() {
            let warning = create_test_warning(Some("35KT"), Some("TSRA"));
            let obs = vec![create_test_observation(Some(140), None, vec![cb_layer()])];
            let results = matcher().match_warning(&warning, &obs);
            assert!(!results[0].correct);
            assert!(results[1].correct);
        }
    }

    mod observed {
        use super::*;

        #[test]
        fn test_observed_entry_is_always_correct() {
            let mut warning = create_test_warning(Some("35KT"), Some("TSRA"));
            warning.source_flag = Some(SourceFlag::Observed);
            let results = matcher().match_warning(&warning, &[]);
            assert_eq!(results.len(), 2);
            assert!(results.iter().all(|r| r.correct));
            assert!(results.iter().all(|r| r.remark == "OBS"));
        }
    }

    #[test]
    fn test_no_applicable_category_is_weather_incorrect() {
        let warning = create_test_warning(None, Some("HVY RA"));
        let results = matcher().match_warning(&warning, &[]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].category, Category::Weather);
        assert!(!results[0].correct);
        assert_eq!(results[0].remark, "No significant weather matched");
    }
}
