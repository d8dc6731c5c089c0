//! End-to-end verification runs over embedded sample inputs.
//!
//! These tests exercise the full pipeline the CLI drives: decode both input
//! files, cross-validate them, match or interpolate, then aggregate scores.

use avwx_verify::app::services::forecast_decoder::ForecastDecoder;
use avwx_verify::app::services::interpolator::Interpolator;
use avwx_verify::app::services::matcher::Matcher;
use avwx_verify::app::services::obs_decoder::ObsDecoder;
use avwx_verify::app::services::scorer::Scorer;
use avwx_verify::app::services::sounding_decoder::SoundingDecoder;
use avwx_verify::app::services::time_normalizer::ReferenceDate;
use avwx_verify::app::services::validation;
use avwx_verify::{Category, VerifyConfig};
use chrono::{TimeZone, Utc};

const OBSERVATIONS: &str = "\
# METAR archive VABB 2025-07\n\
202507131000 METAR VABB 131000Z 20010KT 6000 SCT020 Q1006=\n\
202507131200 METAR VABB 131200Z 19012G36KT 3000 TSRA FEW030CB SCT100 Q1004=\n\
202507131400 METAR VABB 131400Z 21008KT 8000 SCT025 Q1005=\n\
202507132000 METAR VABB 132000Z 23006KT 9000 FEW025 Q1007=\n";

const WARNINGS: &str = "\
AERODROME WARNING 20250713\n\
VABB 130912Z AD WRNG 1 VALID 130912/131800\n\
SFC WSPD 20KT MAX35 FROM S HVY TSRA FCST\n\
\n\
AERODROME WARNING 20250713\n\
VABB 131930Z AD WRNG 2 VALID 131930/132400\n\
SFC WSPD 15KT MAX30 FROM SW TSRA OBS\n";

const FORECAST_DOC: &str = "\
LOCAL FORECAST FOR VABB AND NEIGHBOURHOOD\n\
VALID FROM 202507130000Z TO 202507131200Z UTC\n\
UPPER WINDS\n\
900M 250/15KT +18\n\
600M 255/12KT +21\n\
WEATHER\n\
TSRA LIKELY OVER AIRFIELD TOWARDS EVENING\n";

const SOUNDING: &str = "\
pressure_hPa,geopotential height_m,temperature_C,wind direction_degree,wind speed_m/s\n\
1000.0,145.0,26.4,250.0,5.1\n\
960.0,600.0,20.0,252.0,6.0\n\
925.0,1200.0,14.0,258.0,8.0\n";

fn reference() -> ReferenceDate {
    ReferenceDate {
        year: 2025,
        month: 7,
    }
}

#[test]
fn warning_verification_end_to_end() {
    let station = validation::validate_station_match(OBSERVATIONS, WARNINGS).unwrap();
    assert_eq!(station, "VABB");
    validation::validate_date_range(OBSERVATIONS, WARNINGS, reference()).unwrap();

    let (observations, obs_stats) = ObsDecoder::new(reference())
        .with_station("VABB")
        .decode_all(OBSERVATIONS);
    assert_eq!(observations.len(), 4);
    assert_eq!(obs_stats.records_decoded, 4);

    let (warnings, _) = avwx_verify::app::services::warning_decoder::WarningDecoder::new(
        reference(),
    )
    .with_station("VABB")
    .decode(WARNINGS);
    assert_eq!(warnings.len(), 2);

    // Validity rounding: 0912 rounds down to 0900, 2400 becomes next midnight
    assert_eq!(
        warnings[0].validity_from,
        Utc.with_ymd_and_hms(2025, 7, 13, 9, 0, 0).unwrap()
    );
    assert_eq!(
        warnings[0].validity_to,
        Utc.with_ymd_and_hms(2025, 7, 13, 18, 0, 0).unwrap()
    );
    assert_eq!(
        warnings[1].validity_to,
        Utc.with_ymd_and_hms(2025, 7, 14, 0, 0, 0).unwrap()
    );

    let config = VerifyConfig::for_station("VABB");
    let matcher = Matcher::new(config.clone());
    let rows: Vec<_> = warnings
        .iter()
        .flat_map(|w| matcher.match_warning(w, &observations))
        .collect();

    // Each warning forecasts both gust and thunderstorm
    assert_eq!(rows.len(), 4);

    // First warning: observed gust 36KT at 190 deg against forecast 180 deg
    let gust = rows
        .iter()
        .find(|r| r.category == Category::Gust && r.time == "13/0912")
        .unwrap();
    assert!(gust.correct);
    assert_eq!(gust.remark, "Gust 36KT Dir 190 matched FEW030CB found");

    let ts = rows
        .iter()
        .find(|r| r.category == Category::Thunderstorm && r.time == "13/0912")
        .unwrap();
    assert!(ts.correct);
    assert_eq!(ts.remark, "FEW030CB found");

    // Second warning is flagged OBS and is correct by definition
    let obs_rows: Vec<_> = rows.iter().filter(|r| r.time == "13/1930").collect();
    assert_eq!(obs_rows.len(), 2);
    assert!(obs_rows.iter().all(|r| r.correct && r.remark == "OBS"));

    let metrics = Scorer::new(config).aggregate(&rows);
    let overall = metrics.iter().find(|m| m.label == "Overall").unwrap();
    assert_eq!(overall.total, 4);
    assert_eq!(overall.correct, 4);
    assert_eq!(overall.percent, 100);
}

#[test]
fn gust_direction_outside_tolerance_fails() {
    // Same warning, observation wind backed to 140 degrees (diff 40 > 30)
    let observations_text = OBSERVATIONS.replace("19012G36KT", "14012G36KT");
    let (observations, _) = ObsDecoder::new(reference())
        .with_station("VABB")
        .decode_all(&observations_text);

    let (warnings, _) = avwx_verify::app::services::warning_decoder::WarningDecoder::new(
        reference(),
    )
    .decode(WARNINGS);

    let matcher = Matcher::new(VerifyConfig::default());
    let rows = matcher.match_warning(&warnings[0], &observations);
    let gust = rows
        .iter()
        .find(|r| r.category == Category::Gust)
        .unwrap();
    assert!(!gust.correct);
    assert_eq!(gust.remark, "No gust/direction match");
}

#[test]
fn station_mismatch_aborts_before_matching() {
    let foreign = WARNINGS.replace("VABB", "VOMM");
    assert!(validation::validate_station_match(OBSERVATIONS, &foreign).is_err());
}

#[test]
fn upper_air_verification_end_to_end() {
    let levels = ForecastDecoder::new(reference())
        .decode_document(FORECAST_DOC)
        .unwrap();
    assert_eq!(levels.len(), 2);
    // Sorted by altitude descending
    assert_eq!(levels[0].altitude_m, 900);
    assert_eq!(levels[1].altitude_m, 600);

    let (profile, _) = SoundingDecoder::new().decode(SOUNDING).unwrap();
    assert_eq!(profile.len(), 3);

    let verified = Interpolator::interpolate(&levels, &profile);
    assert_eq!(verified.len(), 2);

    // 900 m sits midway between the 600 m / 20 C and 1200 m / 14 C levels
    let at_900 = verified
        .iter()
        .find(|v| v.forecast.altitude_m == 900)
        .unwrap();
    assert!((at_900.actual_temp_c - 17.0).abs() < 1e-9);

    let config = VerifyConfig::default();
    let scorer = Scorer::new(config);
    let mut rows = scorer.score_levels(&verified);

    // Forecast 18 C vs derived 17 C is inside the 2 C tolerance
    let temp_900 = rows
        .iter()
        .find(|r| r.category == Category::Temperature && r.element.contains("900"))
        .unwrap();
    assert!(temp_900.correct);

    // Weather narrative scored against the surface observation text
    rows.push(scorer.score_weather(
        &levels[0].sig_wx_text,
        OBSERVATIONS,
        "VABB",
        "13/0000",
    ));
    let weather = rows
        .iter()
        .find(|r| r.category == Category::Weather)
        .unwrap();
    assert!(weather.correct, "TSRA appears in both texts");

    let metrics = scorer.aggregate(&rows);
    assert!(metrics.iter().any(|m| m.label == "Overall"));

    let fl_metrics = scorer.aggregate_flight_levels(&verified);
    let fl_overall = fl_metrics.iter().find(|m| m.label == "Overall").unwrap();
    // Both 600 m and 900 m are standard flight levels, three checks each
    assert_eq!(fl_overall.total, 6);
}

#[test]
fn sounding_html_payload_is_rejected() {
    let err = SoundingDecoder::new()
        .decode("<html><body>No sounding available</body></html>")
        .unwrap_err();
    assert!(matches!(
        err,
        avwx_verify::Error::SectionMissing { .. }
    ));
}
