//! Observed upper-air profile decoder
//!
//! Decodes the CSV text form of an upper-air sounding into
//! [`ObservedProfileRecord`]s ordered by geopotential height. The provider
//! answers requests with an HTML page when no sounding exists for the
//! requested time, so an HTML payload is rejected outright. Individual
//! malformed rows are skipped and counted.

use crate::app::models::{DecodeStats, ObservedProfileRecord};
use crate::{Error, Result};
use tracing::debug;

/// Header fragments identifying the columns the verification needs
const HEIGHT_COLUMN: &str = "geopotential height";
const TEMPERATURE_COLUMN: &str = "temperature";
const WIND_SPEED_COLUMN: &str = "wind speed";
const WIND_DIR_COLUMN: &str = "wind direction";

/// Decoder for sounding CSV text
#[derive(Debug, Clone, Default)]
pub struct SoundingDecoder;

impl SoundingDecoder {
    /// Create a new sounding decoder
    pub fn new() -> Self {
        Self
    }

    /// Decode sounding CSV text into height-ordered profile records
    pub fn decode(&self, text: &str) -> Result<(Vec<ObservedProfileRecord>, DecodeStats)> {
        if text.to_lowercase().contains("<html>") {
            return Err(Error::section_missing(
                "sounding text",
                "CSV data (received HTML page, no sounding available)",
            ));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| Error::section_missing("sounding text", format!("CSV header: {}", e)))?
            .clone();

        let column = |fragment: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h.to_lowercase().contains(fragment))
                .ok_or_else(|| Error::section_missing("sounding text", format!("{} column", fragment)))
        };

        let height_idx = column(HEIGHT_COLUMN)?;
        let temp_idx = column(TEMPERATURE_COLUMN)?;
        let speed_idx = column(WIND_SPEED_COLUMN)?;
        let dir_idx = column(WIND_DIR_COLUMN)?;

        let mut stats = DecodeStats::new();
        let mut levels = Vec::new();

        for result in reader.records() {
            stats.total_lines += 1;
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    stats.lines_skipped += 1;
                    stats
                        .errors
                        .push(format!("CSV parse error at row {}: {}", stats.total_lines, e));
                    continue;
                }
            };

            let field = |idx: usize| record.get(idx).and_then(|s| s.parse::<f64>().ok());
            match (
                field(height_idx),
                field(temp_idx),
                field(speed_idx),
                field(dir_idx),
            ) {
                (Some(height_m), Some(temp_c), Some(wind_speed_mps), Some(wind_dir_deg)) => {
                    levels.push(ObservedProfileRecord {
                        height_m,
                        temp_c,
                        wind_speed_mps,
                        wind_dir_deg,
                    });
                    stats.records_decoded += 1;
                }
                _ => {
                    stats.lines_skipped += 1;
                    stats
                        .errors
                        .push(format!("Row {}: missing or non-numeric field", stats.total_lines));
                    debug!("Skipped sounding row {}", stats.total_lines);
                }
            }
        }

        // The interpolator brackets by height, so keep the profile ordered
        levels.sort_by(|a, b| a.height_m.total_cmp(&b.height_m));

        Ok((levels, stats))
    }
}
