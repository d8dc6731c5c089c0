//! METAR-like surface observation decoder
//!
//! Decodes raw observation text, one report per line, into
//! [`ObservationRecord`]s. Decoding is lazy (one line at a time, finite,
//! non-restartable) and tolerant: a malformed line is skipped and counted,
//! never fatal. Comment lines (`#`) and non-report lines are filtered the
//! same way the raw feed download is.

use crate::app::models::{CloudLayer, DecodeStats, ObservationRecord};
use crate::app::services::time_normalizer::{parse_partial, ReferenceDate};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::debug;

/// Full `YYYYMMDDHHMM` timestamp prefix on an archive line
static FULL_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{12})\b").unwrap());

/// `DDHHMMZ` report time group
static REPORT_TIME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{6})Z\b").unwrap());

/// ICAO station followed by a report time group
static STATION_BEFORE_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{4})\s+\d{6}Z\b").unwrap());

/// Surface wind group: direction (or VRB), speed, optional gust
static WIND_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{3}|VRB)(\d{2,3})(?:G(\d{2,3}))?KT\b").unwrap());

/// Cloud group: amount, base in hundreds of feet, optional convective suffix
static CLOUD_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:FEW|SCT|BKN|OVC)(\d{3})(?:CB|TCU)?\b").unwrap());

/// Significant weather vocabulary, intensity-qualified forms first so a
/// qualified code is never recorded as its bare form
const SIG_WX_CODES: &[&str] = &["+TSRA", "-TSRA", "TSRA", "+TS", "-TS", "TS"];

/// Decoder for METAR-like surface observation text
#[derive(Debug, Clone)]
pub struct ObsDecoder {
    /// Year/month context for completing `DDHHMMZ` report times
    reference: ReferenceDate,

    /// Only keep reports for this station, when set
    station: Option<String>,
}

impl ObsDecoder {
    /// Create a decoder with the given time context
    pub fn new(reference: ReferenceDate) -> Self {
        Self {
            reference,
            station: None,
        }
    }

    /// Restrict decoding to a single station
    pub fn with_station(mut self, station: impl Into<String>) -> Self {
        self.station = Some(station.into());
        self
    }

    /// Decode all lines eagerly, returning records and statistics
    pub fn decode_all(&self, text: &str) -> (Vec<ObservationRecord>, DecodeStats) {
        let mut iter = self.iter_lines(text);
        let records: Vec<ObservationRecord> = iter.by_ref().collect();
        (records, iter.into_stats())
    }

    /// Lazily decode lines, one record per well-formed report line.
    ///
    /// The iterator is finite and non-restartable; statistics accumulate
    /// as it is consumed and are recovered with [`ObsLineIter::into_stats`].
    pub fn iter_lines<'a>(&'a self, text: &'a str) -> ObsLineIter<'a> {
        ObsLineIter {
            lines: text.lines(),
            decoder: self,
            stats: DecodeStats::new(),
        }
    }

    /// Decode a single report line
    fn decode_line(&self, line: &str) -> std::result::Result<ObservationRecord, String> {
        let station = STATION_BEFORE_TIME
            .captures(line)
            .map(|c| c[1].to_string())
            .or_else(|| {
                line.split_whitespace()
                    .find(|tok| tok.len() == 4 && tok.bytes().all(|b| b.is_ascii_uppercase()))
                    .map(|tok| tok.to_string())
            })
            .ok_or("no station identifier")?;

        if let Some(wanted) = &self.station {
            if &station != wanted {
                return Err(format!("station {} filtered out", station));
            }
        }

        // Prefer the full archive timestamp; fall back to the report time
        // group completed from the reference date.
        let timestamp = if let Some(c) = FULL_TIMESTAMP.captures(line) {
            parse_partial(&c[1], self.reference).map_err(|e| e.to_string())?
        } else if let Some(c) = REPORT_TIME.captures(line) {
            parse_partial(&c[1], self.reference).map_err(|e| e.to_string())?
        } else {
            return Err("no timestamp group".to_string());
        };

        let (wind_dir_deg, wind_speed_kt, gust_kt) = match WIND_GROUP.captures(line) {
            Some(c) => {
                let dir = if &c[1] == "VRB" {
                    None
                } else {
                    c[1].parse::<u16>().ok().filter(|d| *d < 360)
                };
                let speed = c[2].parse::<u32>().ok();
                let gust = c.get(3).and_then(|g| g.as_str().parse::<u32>().ok());
                (dir, speed, gust)
            }
            None => (None, None, None),
        };

        let clouds: Vec<CloudLayer> = CLOUD_GROUP
            .find_iter(line)
            .map(|m| {
                let code = m.as_str().to_string();
                let base = CLOUD_GROUP
                    .captures(m.as_str())
                    .and_then(|c| c[1].parse::<u32>().ok());
                CloudLayer {
                    code,
                    base_hundreds_ft: base,
                }
            })
            .collect();

        let sig_wx: BTreeSet<String> = line
            .split_whitespace()
            .filter_map(|tok| {
                SIG_WX_CODES
                    .iter()
                    .find(|code| tok == **code)
                    .map(|code| code.to_string())
            })
            .collect();

        Ok(ObservationRecord {
            station,
            timestamp,
            wind_dir_deg,
            wind_speed_kt,
            gust_kt,
            clouds,
            sig_wx,
            raw: line.to_string(),
        })
    }

    /// Whether a line is a candidate report at all
    fn is_report_line(&self, line: &str) -> bool {
        if line.is_empty() || line.starts_with('#') {
            return false;
        }
        match &self.station {
            Some(station) => line.contains("METAR") || line.starts_with(station.as_str()),
            None => line.contains("METAR") || STATION_BEFORE_TIME.is_match(line),
        }
    }
}

/// Lazy per-line iterator over decoded observation records
pub struct ObsLineIter<'a> {
    lines: std::str::Lines<'a>,
    decoder: &'a ObsDecoder,
    stats: DecodeStats,
}

impl ObsLineIter<'_> {
    /// Consume the iterator and recover the accumulated statistics
    pub fn into_stats(self) -> DecodeStats {
        self.stats
    }
}

impl Iterator for ObsLineIter<'_> {
    type Item = ObservationRecord;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            let line = line.trim();
            if !self.decoder.is_report_line(line) {
                continue;
            }
            self.stats.total_lines += 1;
            match self.decoder.decode_line(line) {
                Ok(record) => {
                    self.stats.records_decoded += 1;
                    return Some(record);
                }
                Err(reason) => {
                    self.stats.lines_skipped += 1;
                    self.stats
                        .errors
                        .push(format!("Line {}: {}", self.stats.total_lines, reason));
                    debug!("Skipped observation line: {}", reason);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn decoder() -> ObsDecoder {
        ObsDecoder::new(ReferenceDate {
            year: 2025,
            month: 7,
        })
    }

    const SAMPLE: &str = "\
# query generated at 2025-08-01\n\
202507131200 METAR VABB 131200Z 25012G22KT 3000 TSRA FEW030CB SCT018 25/24 Q1004=\n\
202507131230 METAR VABB 131230Z VRB04KT 6000 NSC 26/24 Q1004=\n\
garbage line without anything useful\n\
202507131300 METAR VABB 131300Z 26014KT 4000 -TSRA SCT020 OVC080 25/23 Q1003=\n";

    #[test]
    fn test_decodes_well_formed_lines_and_skips_rest() {
        let (records, stats) = decoder().decode_all(SAMPLE);
        assert_eq!(records.len(), 3);
        assert_eq!(stats.records_decoded, 3);
        // The comment and the garbage line never become candidate reports
        assert_eq!(stats.lines_skipped, 0);
    }

    #[test]
    fn test_wind_group_extraction() {
        let (records, _) = decoder().decode_all(SAMPLE);
        let first = &records[0];
        assert_eq!(first.wind_dir_deg, Some(250));
        assert_eq!(first.wind_speed_kt, Some(12));
        assert_eq!(first.gust_kt, Some(22));

        // Variable wind decodes to no direction
        let second = &records[1];
        assert_eq!(second.wind_dir_deg, None);
        assert_eq!(second.wind_speed_kt, Some(4));
        assert_eq!(second.gust_kt, None);
    }

    #[test]
    fn test_cloud_and_convective_extraction() {
        let (records, _) = decoder().decode_all(SAMPLE);
        let first = &records[0];
        assert_eq!(first.clouds.len(), 2);
        assert_eq!(first.clouds[0].code, "FEW030CB");
        assert_eq!(first.clouds[0].base_hundreds_ft, Some(30));
        assert!(first.has_convective_cloud());
        assert_eq!(first.convective_cloud_group(), Some("FEW030CB"));

        assert!(!records[1].has_convective_cloud());
    }

    #[test]
    fn test_sig_wx_intensity_preserved() {
        let (records, _) = decoder().decode_all(SAMPLE);
        assert!(records[0].sig_wx.contains("TSRA"));
        // Light-qualified code is not recorded as its bare form
        assert!(records[2].sig_wx.contains("-TSRA"));
        assert!(!records[2].sig_wx.contains("TSRA"));
    }

    #[test]
    fn test_timestamp_decoding() {
        let (records, _) = decoder().decode_all(SAMPLE);
        let ts = records[0].timestamp;
        assert_eq!((ts.year(), ts.month(), ts.day()), (2025, 7, 13));
        assert_eq!((ts.hour(), ts.minute()), (12, 0));
    }

    #[test]
    fn test_station_filter() {
        let decoder = decoder().with_station("VAJJ");
        let (records, stats) = decoder.decode_all(SAMPLE);
        assert!(records.is_empty());
        assert_eq!(stats.lines_skipped, 3);
    }

    #[test]
    fn test_round_trip_of_synthetic_line() {
        // Decoding a synthetic well-formed line reproduces its raw fields
        let line = "202507150600 METAR VABB 150600Z 18015G35KT 5000 +TSRA FEW025CB 24/23 Q1002=";
        let (records, _) = decoder().decode_all(line);
        let rec = &records[0];
        assert_eq!(rec.wind_dir_deg, Some(180));
        assert_eq!(rec.wind_speed_kt, Some(15));
        assert_eq!(rec.gust_kt, Some(35));
        assert!(rec.sig_wx.contains("+TSRA"));
        assert_eq!(rec.raw, line);
    }

    #[test]
    fn test_iterator_is_lazy_and_finite() {
        let decoder = decoder();
        let mut iter = decoder.iter_lines(SAMPLE);
        assert!(iter.next().is_some());
        // Remaining lines are not yet counted
        assert_eq!(iter.stats.records_decoded, 1);
        assert!(iter.next().is_some());
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());
        let stats = iter.into_stats();
        assert_eq!(stats.records_decoded, 3);
    }
}
