//! Aerodrome warning bulletin decoder
//!
//! A warning bulletin is a header line (carrying a WRNG/WARNING token)
//! followed by a data line (`<station> <issue> ... VALID <from>/<to>`) and
//! a weather line (surface wind, gust, significant weather, FCST/OBS
//! flag). The decoder scans forward for each header, decodes the block
//! that follows, and skips malformed blocks without failing the run.
//!
//! Validity handling follows the issuing convention exactly: the start is
//! rounded down to the half hour, the end is rounded up, and `2400`
//! becomes `0000` of the next day with day-of-month wraparound at day 30.

use crate::app::models::{DecodeStats, SourceFlag, WarningRecord};
use crate::app::services::time_normalizer::{
    fix_midnight_2400, parse_partial, round_down_to_half_hour, round_up_to_half_hour,
    ReferenceDate,
};
use crate::constants::{
    classify_sig_wx, compass_to_degrees, WARNING_DATA_MARKER, WARNING_HEADER_TOKENS,
};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

static HEADER_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b(?:{})\b", WARNING_HEADER_TOKENS.join("|"))).unwrap()
});

static VALID_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"VALID\s*(\d{6,8})/(\d{6,8})").unwrap());

static SFC_WIND: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"SFC WSPD (\d+KT)").unwrap());

static GUST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"MAX(\d+)").unwrap());

static WIND_FROM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"FROM\s+([A-Z]+)").unwrap());

/// Numeric wind direction token, e.g. "FROM 250 DEG"
static WIND_FROM_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"FROM\s+(\d{2,3})\b").unwrap());

/// Decoder for aerodrome warning bulletins
#[derive(Debug, Clone)]
pub struct WarningDecoder {
    /// Year/month context for completing day-hour-minute validity times
    reference: ReferenceDate,

    /// Discard records for other stations, when set
    station_filter: Option<String>,
}

impl WarningDecoder {
    /// Create a decoder with the given time context, keeping all stations
    pub fn new(reference: ReferenceDate) -> Self {
        Self {
            reference,
            station_filter: None,
        }
    }

    /// Keep only records for the given station
    pub fn with_station(mut self, station: impl Into<String>) -> Self {
        self.station_filter = Some(station.into());
        self
    }

    /// Decode every warning block in the bulletin text
    pub fn decode(&self, text: &str) -> (Vec<WarningRecord>, DecodeStats) {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let mut records = Vec::new();
        let mut stats = DecodeStats::new();

        let mut i = 0;
        while i < lines.len() {
            if HEADER_TOKEN.is_match(lines[i]) {
                // Scan forward to the canonical data line
                while i + 1 < lines.len() && !lines[i + 1].contains(WARNING_DATA_MARKER) {
                    i += 1;
                }
                i += 1;
                if i >= lines.len() {
                    break;
                }

                stats.total_lines += 1;
                let main_line = lines[i];
                let wx_line = if i + 1 < lines.len() {
                    lines[i + 1]
                } else {
                    ""
                };

                match self.decode_block(main_line, wx_line) {
                    Ok(Some(record)) => {
                        records.push(record);
                        stats.records_decoded += 1;
                        i += 1;
                    }
                    Ok(None) => {
                        // Filtered by station, not a decode failure
                        debug!("Dropped warning for non-matching station");
                        stats.records_filtered += 1;
                        i += 1;
                    }
                    Err(reason) => {
                        stats.lines_skipped += 1;
                        stats
                            .errors
                            .push(format!("Warning block at line {}: {}", i, reason));
                        warn!("Skipped warning block: {}", reason);
                    }
                }
            }
            i += 1;
        }

        (records, stats)
    }

    /// Decode one data line + weather line pair
    fn decode_block(
        &self,
        main_line: &str,
        wx_line: &str,
    ) -> std::result::Result<Option<WarningRecord>, String> {
        let parts: Vec<&str> = main_line.split_whitespace().collect();
        if parts.len() < 2 {
            return Err("data line too short".to_string());
        }
        let station = parts[0].to_string();
        let issue_raw = parts[1];

        if let Some(wanted) = &self.station_filter {
            if &station != wanted {
                return Ok(None);
            }
        }

        let valid = VALID_SPAN
            .captures(main_line)
            .ok_or("no VALID span on data line")?;

        let from_raw = format!("{}Z", &valid[1]);
        let to_raw = format!("{}Z", &valid[2]);

        // Start rounds down, end rounds up; both normalise a 2400 ending
        // to midnight of the following day.
        let from_str = fix_midnight_2400(&round_down_to_half_hour(&from_raw));
        let to_str = fix_midnight_2400(&round_up_to_half_hour(&to_raw));

        let validity_from =
            parse_partial(&from_str, self.reference).map_err(|e| e.to_string())?;
        let validity_to = parse_partial(&to_str, self.reference).map_err(|e| e.to_string())?;

        let wind_speed = SFC_WIND.captures(wx_line).map(|c| c[1].to_string());
        let gust = GUST.captures(wx_line).map(|c| format!("{}KT", &c[1]));

        // Direction arrives as a compass label or a numeric token; an
        // unrecognised label leaves the direction absent.
        let wind_dir_deg = WIND_FROM
            .captures(wx_line)
            .and_then(|c| compass_to_degrees(&c[1]))
            .or_else(|| {
                WIND_FROM_NUMERIC
                    .captures(wx_line)
                    .and_then(|c| c[1].parse::<u16>().ok())
                    .filter(|d| *d < 360)
            });

        let sig_wx = classify_sig_wx(wx_line).map(str::to_string);
        let source_flag = SourceFlag::from_line(wx_line);

        let record = WarningRecord {
            station,
            issue_time: format_issue_time(issue_raw),
            validity_from,
            validity_to,
            wind_dir_deg,
            wind_speed,
            gust,
            sig_wx,
            source_flag,
        };
        record.validate().map_err(|e| e.to_string())?;

        Ok(Some(record))
    }
}

/// Render an issue token (`DDHHMM[Z]`) in the report display form `DD/HHMM`
fn format_issue_time(token: &str) -> String {
    let digits = token.trim_end_matches('Z');
    if digits.len() >= 6 {
        format!("{}/{}", &digits[..2], &digits[2..])
    } else {
        digits.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike, Utc};

    fn july_2025() -> ReferenceDate {
        ReferenceDate {
            year: 2025,
            month: 7,
        }
    }

    const SAMPLE: &str = "\
AERODROME WARNING 20250713\n\
VABB 130912Z AD WRNG 1 VALID 130912/131800\n\
SFC WSPD 20KT MAX35 FROM SW HVY TSRA FCST\n\
AERODROME WARNING 20250713\n\
VABB 131915Z AD WRNG 2 VALID 131920/132400\n\
TSRA OBSD AT 1915Z\n\
AERODROME WARNING 20250714\n\
VAJJ 140605Z AD WRNG 3 VALID 140610/141200\n\
SFC WSPD 25KT MAX40 FROM W FCST\n";

    #[test]
    fn test_decodes_all_blocks() {
        let (records, stats) = WarningDecoder::new(july_2025()).decode(SAMPLE);
        assert_eq!(records.len(), 3);
        assert_eq!(stats.records_decoded, 3);
        assert_eq!(stats.lines_skipped, 0);
    }

    #[test]
    fn test_first_block_fields() {
        let (records, _) = WarningDecoder::new(july_2025()).decode(SAMPLE);
        let w = &records[0];
        assert_eq!(w.station, "VABB");
        assert_eq!(w.issue_time, "13/0912");
        assert_eq!(w.wind_speed.as_deref(), Some("20KT"));
        assert_eq!(w.gust.as_deref(), Some("35KT"));
        assert_eq!(w.wind_dir_deg, Some(230));
        assert_eq!(w.sig_wx.as_deref(), Some("+TSRA"));
        assert_eq!(w.source_flag, Some(SourceFlag::Forecast));
    }

    #[test]
    fn test_validity_rounding() {
        let (records, _) = WarningDecoder::new(july_2025()).decode(SAMPLE);
        let w = &records[0];
        // 0912 rounds down to 0900; 1800 is already on the half hour
        assert_eq!(
            w.validity_from,
            Utc.with_ymd_and_hms(2025, 7, 13, 9, 0, 0).unwrap()
        );
        assert_eq!(
            w.validity_to,
            Utc.with_ymd_and_hms(2025, 7, 13, 18, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_validity_2400_becomes_next_day() {
        let (records, _) = WarningDecoder::new(july_2025()).decode(SAMPLE);
        let w = &records[1];
        assert_eq!((w.validity_to.day(), w.validity_to.hour()), (14, 0));
        assert!(w.validity_to >= w.validity_from);
    }

    #[test]
    fn test_observed_flag_detected() {
        let (records, _) = WarningDecoder::new(july_2025()).decode(SAMPLE);
        assert!(records[1].is_observed());
        assert_eq!(records[1].sig_wx.as_deref(), Some("TSRA"));
    }

    #[test]
    fn test_station_filter_drops_other_stations() {
        let decoder = WarningDecoder::new(july_2025()).with_station("VABB");
        let (records, stats) = decoder.decode(SAMPLE);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|w| w.station == "VABB"));
        // A dropped block is filtered, not decoded and not a skip
        assert_eq!(stats.records_decoded, 2);
        assert_eq!(stats.records_filtered, 1);
        assert_eq!(stats.lines_skipped, 0);
    }

    #[test]
    fn test_malformed_block_is_skipped_not_fatal() {
        let text = "\
AERODROME WARNING\n\
VABB 130912Z AD WRNG 1 NO VALIDITY HERE\n\
SFC WSPD 20KT MAX35 FROM SW FCST\n";
        let (records, stats) = WarningDecoder::new(july_2025()).decode(text);
        assert!(records.is_empty());
        assert_eq!(stats.lines_skipped, 1);
        assert_eq!(stats.errors.len(), 1);
    }
}
