//! Aviation Weather Forecast Verification Library
//!
//! A Rust library for scoring short-range aviation weather forecasts
//! against subsequently observed weather.
//!
//! This library provides tools for:
//! - Decoding METAR-like surface observation reports into structured records
//! - Decoding aerodrome warning bulletins with half-hour validity rounding
//! - Decoding local/area forecast documents including upper-winds tables
//! - Matching forecast elements to the observations valid for their window
//! - Interpolating observed upper-air profiles to forecast altitudes
//! - Aggregating per-element verdicts into category accuracy percentages

pub mod config;
pub mod constants;

// Core application modules
pub mod app {
    pub mod models;
    pub mod services {
        pub mod forecast_decoder;
        pub mod interpolator;
        pub mod matcher;
        pub mod obs_decoder;
        pub mod scorer;
        pub mod sounding_decoder;
        pub mod time_normalizer;
        pub mod validation;
        pub mod warning_decoder;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::models::{
    AccuracyMetric, Category, MatchResult, ObservationRecord, VerificationReport, WarningRecord,
};
pub use config::VerifyConfig;

/// Result type alias for the verification engine
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for forecast verification operations
///
/// Field-level extraction gaps are deliberately not represented here: a
/// malformed observation or warning line is skipped and counted by the
/// decoder, never surfaced as an error. Only structural failures (a
/// missing document section) and cross-file disagreements abort a run.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Required section or marker absent from a forecast document
    #[error("Required section missing from '{document}': {marker}")]
    SectionMissing { document: String, marker: String },

    /// Station or month disagreement between independently supplied inputs
    #[error("Cross-file mismatch: {message}")]
    CrossFileMismatch { message: String },

    /// Date/time reconstruction failed
    #[error("Time parsing error: {message}")]
    TimeParsing { message: String },

    /// Data failed a consistency check
    #[error("Data validation error: {message}")]
    DataValidation { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Report output error
    #[error("Report output error: {message}")]
    ReportOutput {
        message: String,
        #[source]
        source: Option<csv::Error>,
    },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a missing-section error for a forecast document
    pub fn section_missing(document: impl Into<String>, marker: impl Into<String>) -> Self {
        Self::SectionMissing {
            document: document.into(),
            marker: marker.into(),
        }
    }

    /// Create a cross-file mismatch error
    pub fn cross_file_mismatch(message: impl Into<String>) -> Self {
        Self::CrossFileMismatch {
            message: message.into(),
        }
    }

    /// Create a time parsing error
    pub fn time_parsing(message: impl Into<String>) -> Self {
        Self::TimeParsing {
            message: message.into(),
        }
    }

    /// Create a data validation error
    pub fn data_validation(message: impl Into<String>) -> Self {
        Self::DataValidation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a report output error
    pub fn report_output(message: impl Into<String>, source: Option<csv::Error>) -> Self {
        Self::ReportOutput {
            message: message.into(),
            source,
        }
    }
}

// Automatic conversions from common error types
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}

impl From<chrono::ParseError> for Error {
    fn from(error: chrono::ParseError) -> Self {
        Self::TimeParsing {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for Error {
    fn from(error: csv::Error) -> Self {
        Self::ReportOutput {
            message: "CSV output failed".to_string(),
            source: Some(error),
        }
    }
}
