//! Command execution for the verification CLI
//!
//! Orchestrates one verification run per invocation: read the input files,
//! decode, cross-validate, match or interpolate, score, then write the
//! report CSV and print a summary. All state is local to the run.

use crate::app::models::{MatchResult, VerificationReport};
use crate::app::services::interpolator::Interpolator;
use crate::app::services::matcher::Matcher;
use crate::app::services::obs_decoder::ObsDecoder;
use crate::app::services::scorer::Scorer;
use crate::app::services::sounding_decoder::SoundingDecoder;
use crate::app::services::time_normalizer::ReferenceDate;
use crate::app::services::validation;
use crate::app::services::warning_decoder::WarningDecoder;
use crate::app::services::forecast_decoder::ForecastDecoder;
use crate::cli::args::{Args, Commands, CommonArgs, UpperAirArgs, WarningsArgs};
use crate::config::VerifyConfig;
use crate::{Error, Result};
use chrono::Utc;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Run statistics for reporting
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Records decoded from the input files
    pub records_decoded: usize,
    /// Input lines skipped as malformed
    pub records_skipped: usize,
    /// Comparison rows written to the report
    pub rows_written: usize,
    /// Total run time
    pub elapsed: std::time::Duration,
}

/// Execute whichever subcommand was given.
pub fn run(args: Args) -> Result<RunStats> {
    let start = Instant::now();

    let common = args
        .common()
        .cloned()
        .ok_or_else(|| Error::configuration("No command given".to_string()))?;

    setup_logging(&common);
    info!("Starting verification run");
    debug!("Command line arguments: {:?}", args);

    args.validate()?;

    let mut stats = match &args.command {
        Some(Commands::Warnings(a)) => run_warnings(a, &common)?,
        Some(Commands::UpperAir(a)) => run_upper_air(a, &common)?,
        None => unreachable!("checked above"),
    };

    stats.elapsed = start.elapsed();
    info!("Run complete in {:.2?}", stats.elapsed);
    Ok(stats)
}

/// Verify aerodrome warnings against surface observations.
fn run_warnings(args: &WarningsArgs, common: &CommonArgs) -> Result<RunStats> {
    let config = load_configuration(common, args.station.as_deref())?;

    let obs_text = fs::read_to_string(&args.observations)?;
    let warning_text = fs::read_to_string(&args.warnings)?;

    // Cross-file checks run before any matching
    let station = validation::validate_station_match(&obs_text, &warning_text)?;
    let fallback = ReferenceDate::from_datetime(Utc::now());
    let reference = validation::extract_issue_date(&warning_text, fallback)
        .map(ReferenceDate::from_datetime)
        .unwrap_or(fallback);
    validation::validate_date_range(&obs_text, &warning_text, reference)?;

    let station = config.station_filter.clone().unwrap_or(station);

    let (observations, obs_stats) = ObsDecoder::new(reference)
        .with_station(&station)
        .decode_all(&obs_text);
    info!(
        "Decoded {} observations ({} lines skipped, {:.1}% of lines usable)",
        observations.len(),
        obs_stats.lines_skipped,
        obs_stats.success_rate()
    );

    let (warnings, warning_stats) = WarningDecoder::new(reference)
        .with_station(&station)
        .decode(&warning_text);
    info!("Decoded {} warnings", warnings.len());
    if warnings.is_empty() {
        warn!("No warnings decoded for {}; report will be empty", station);
    }

    let progress = progress_bar(common, warnings.len() as u64, "Matching warnings");
    let matcher = Matcher::new(config.clone());
    let mut rows: Vec<MatchResult> = Vec::new();
    for warning in &warnings {
        rows.extend(matcher.match_warning(warning, &observations));
        if let Some(pb) = &progress {
            pb.inc(1);
        }
    }
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    let scorer = Scorer::new(config);
    let metrics = scorer.aggregate(&rows);

    let report = VerificationReport {
        station,
        rows,
        metrics,
        skipped_records: obs_stats.lines_skipped + warning_stats.lines_skipped,
    };

    let output_dir = common.output_dir();
    write_report(&output_dir, "warning_report.csv", &report)?;
    if !common.quiet {
        print_summary("Aerodrome Warning Verification", &report, &output_dir);
    }

    Ok(RunStats {
        records_decoded: observations.len() + warnings.len(),
        records_skipped: report.skipped_records,
        rows_written: report.rows.len(),
        ..Default::default()
    })
}

/// Verify an upper-wind forecast against a sounding profile.
fn run_upper_air(args: &UpperAirArgs, common: &CommonArgs) -> Result<RunStats> {
    let config = load_configuration(common, None)?;

    let forecast_text = fs::read_to_string(&args.forecast)?;
    let sounding_text = fs::read_to_string(&args.sounding)?;

    let reference = ReferenceDate::from_datetime(Utc::now());
    let levels = ForecastDecoder::new(reference).decode_document(&forecast_text)?;
    let station = levels[0].station.clone();
    info!("Decoded {} forecast levels for {}", levels.len(), station);

    let (profile, sounding_stats) = SoundingDecoder::new().decode(&sounding_text)?;
    info!(
        "Decoded {} profile levels ({} rows skipped)",
        profile.len(),
        sounding_stats.lines_skipped
    );

    let verified = Interpolator::interpolate(&levels, &profile);
    if verified.len() < levels.len() {
        warn!(
            "{} forecast levels outside the profile span were skipped",
            levels.len() - verified.len()
        );
    }

    let scorer = Scorer::new(config);
    let mut rows = scorer.score_levels(&verified);

    // Weather narrative needs surface observation text to score against
    if let Some(obs_path) = &args.observations {
        let obs_text = fs::read_to_string(obs_path)?;
        let narrative = &levels[0].sig_wx_text;
        if narrative.is_empty() {
            warn!("Forecast document has no weather narrative, skipping weather category");
        } else {
            let time = levels[0].valid_from.format("%d/%H%M").to_string();
            rows.push(scorer.score_weather(narrative, &obs_text, &station, &time));
        }
    }

    let metrics = scorer.aggregate(&rows);
    let fl_metrics = scorer.aggregate_flight_levels(&verified);

    let report = VerificationReport {
        station,
        rows,
        metrics,
        skipped_records: sounding_stats.lines_skipped,
    };

    let output_dir = common.output_dir();
    write_report(&output_dir, "upper_air_report.csv", &report)?;
    if !common.quiet {
        print_summary("Upper-Air Verification", &report, &output_dir);
        if !fl_metrics.is_empty() {
            println!("{}", "Flight levels only:".bold());
            for metric in &fl_metrics {
                println!(
                    "  {:<22} {:>3}/{:<3} {}",
                    metric.label,
                    metric.correct,
                    metric.total,
                    format!("{} %", metric.percent).cyan()
                );
            }
            println!();
        }
    }

    Ok(RunStats {
        records_decoded: levels.len() + profile.len(),
        records_skipped: report.skipped_records,
        rows_written: report.rows.len(),
        ..Default::default()
    })
}

fn setup_logging(common: &CommonArgs) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("avwx_verify={}", common.log_level())));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    debug!("Logging initialized at level: {}", common.log_level());
}

fn load_configuration(common: &CommonArgs, station: Option<&str>) -> Result<VerifyConfig> {
    let mut config = match &common.config_file {
        Some(path) => {
            info!("Using config file: {}", path.display());
            VerifyConfig::from_file(path)?
        }
        None => VerifyConfig::default(),
    };

    if let Some(station) = station {
        config.station_filter = Some(station.to_string());
    }
    config.validate()?;
    Ok(config)
}

fn progress_bar(common: &CommonArgs, len: u64, message: &'static str) -> Option<ProgressBar> {
    if common.quiet || len == 0 {
        return None;
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_message(message);
    Some(pb)
}

/// Write the per-element rows as CSV into the output directory.
fn write_report(output_dir: &Path, filename: &str, report: &VerificationReport) -> Result<()> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(filename);

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record([
        "Sl. No.",
        "Element",
        "Category",
        "Station",
        "Time",
        "Correct",
        "Remarks",
    ])?;
    for (i, row) in report.rows.iter().enumerate() {
        writer.write_record([
            (i + 1).to_string(),
            row.element.clone(),
            row.category.label().to_string(),
            row.station.clone(),
            row.time.clone(),
            if row.correct { "1" } else { "0" }.to_string(),
            row.remark.clone(),
        ])?;
    }
    writer.flush().map_err(|e| Error::io("flushing report", e))?;

    info!("Report written to {}", path.display());
    Ok(())
}

fn print_summary(title: &str, report: &VerificationReport, output_dir: &Path) {
    println!();
    println!("{}", title.bold());
    println!("Station: {}", report.station.bold());
    for metric in &report.metrics {
        let percent = format!("{} %", metric.percent);
        let colored_percent = if metric.percent >= 50 {
            percent.green()
        } else {
            percent.red()
        };
        println!(
            "  {:<22} {:>3}/{:<3} {}",
            metric.label, metric.correct, metric.total, colored_percent
        );
    }
    if report.skipped_records > 0 {
        println!(
            "{}",
            format!("Skipped {} malformed input records", report.skipped_records).yellow()
        );
    }
    println!("Report directory: {}", output_dir.display());
    println!();
}
