//! Command-line argument definitions for the verification engine
//!
//! Defines the complete CLI interface using the clap derive API. Each
//! subcommand verifies one forecast product class against its matching
//! observation source.

use crate::{Error, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the forecast verification engine
///
/// Scores aerodrome warnings against METAR-style surface observations and
/// upper-wind forecasts against radiosonde profiles, producing per-element
/// comparison rows and category accuracy percentages.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "avwx-verify",
    version,
    about = "Verify aviation weather forecasts and warnings against observed data",
    long_about = "Scores aerodrome warning bulletins against surface observation reports and \
                  upper-wind forecast documents against radiosonde soundings. Produces a CSV \
                  verification report of per-element comparisons plus category and overall \
                  accuracy percentages."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available verification subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Verify aerodrome warnings against surface observations
    Warnings(WarningsArgs),
    /// Verify upper-wind forecasts against a sounding profile
    UpperAir(UpperAirArgs),
}

/// Arguments for the warnings command
#[derive(Debug, Clone, Parser)]
pub struct WarningsArgs {
    /// Surface observation report file
    ///
    /// Plain text, one report per line. Lines starting with '#' and lines
    /// that are not reports are skipped.
    #[arg(
        long = "observations",
        value_name = "FILE",
        help = "Surface observation report file"
    )]
    pub observations: PathBuf,

    /// Aerodrome warning bulletin file
    #[arg(
        long = "warnings",
        value_name = "FILE",
        help = "Aerodrome warning bulletin file"
    )]
    pub warnings: PathBuf,

    /// Restrict verification to one station
    ///
    /// Warnings for other stations are discarded before matching.
    #[arg(
        short = 's',
        long = "station",
        value_name = "ICAO",
        help = "Restrict verification to this ICAO station code"
    )]
    pub station: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Arguments for the upper-air command
#[derive(Debug, Clone, Parser)]
pub struct UpperAirArgs {
    /// Forecast document containing the upper winds section
    #[arg(
        long = "forecast",
        value_name = "FILE",
        help = "Forecast document with an UPPER WINDS section"
    )]
    pub forecast: PathBuf,

    /// Sounding profile file (CSV)
    #[arg(
        long = "sounding",
        value_name = "FILE",
        help = "Radiosonde sounding profile in CSV form"
    )]
    pub sounding: PathBuf,

    /// Surface observation file for weather-narrative scoring
    ///
    /// When given, the forecast's weather narrative is scored against this
    /// text by keyword overlap. Without it the weather category is omitted.
    #[arg(
        long = "observations",
        value_name = "FILE",
        help = "Optional surface observations for weather-narrative scoring"
    )]
    pub observations: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Flags shared by every subcommand
#[derive(Debug, Clone, Parser)]
pub struct CommonArgs {
    /// Output directory for the verification report
    ///
    /// Created if it does not exist. If not specified, defaults to ./output
    #[arg(
        short = 'o',
        long = "output",
        value_name = "DIR",
        help = "Output directory for report files"
    )]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// TOML file overriding the built-in tolerances. Fields absent from the
    /// file keep their defaults.
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    pub config_file: Option<PathBuf>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: debug, -vv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl Args {
    /// Shared flags of whichever subcommand was given
    pub fn common(&self) -> Option<&CommonArgs> {
        match &self.command {
            Some(Commands::Warnings(a)) => Some(&a.common),
            Some(Commands::UpperAir(a)) => Some(&a.common),
            None => None,
        }
    }

    /// Validate file arguments before any processing starts
    pub fn validate(&self) -> Result<()> {
        let inputs: Vec<&PathBuf> = match &self.command {
            Some(Commands::Warnings(a)) => vec![&a.observations, &a.warnings],
            Some(Commands::UpperAir(a)) => {
                let mut v = vec![&a.forecast, &a.sounding];
                v.extend(a.observations.as_ref());
                v
            }
            None => vec![],
        };

        for path in inputs {
            if !path.exists() {
                return Err(Error::configuration(format!(
                    "Input file does not exist: {}",
                    path.display()
                )));
            }
        }

        if let Some(Commands::Warnings(a)) = &self.command {
            if let Some(station) = &a.station {
                if station.len() != 4 || !station.chars().all(|c| c.is_ascii_uppercase()) {
                    return Err(Error::configuration(format!(
                        "Station must be a four-letter uppercase ICAO code, got '{}'",
                        station
                    )));
                }
            }
        }

        Ok(())
    }
}

impl CommonArgs {
    /// Map the verbosity flags to a tracing level
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    /// Directory for report output, defaulting to ./output
    pub fn output_dir(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from("output"))
    }
}
