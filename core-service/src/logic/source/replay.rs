//! CSV replay source
//!
//! Replays a `features.csv` produced by the preprocessing pipeline. Columns
//! are picked by name, so extra columns are ignored and the vector is always
//! assembled in layout order. A missing layout column or timestamp column is
//! a fatal header error.

use std::collections::VecDeque;
use std::fs::File;
use std::io;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use csv::{StringRecord, StringRecordsIntoIter};

use crate::logic::features::{FeatureVector, FEATURE_COUNT, FEATURE_LAYOUT};
use super::{OccupancyRule, Reading, SlotId, SourceError};

const TIMESTAMP_COLUMN: &str = "timestamp";

/// Numeric timestamps at or above this are epoch milliseconds (year 5138 in seconds)
const EPOCH_MILLIS_CUTOFF: f64 = 1e11;
const SLOT_COLUMNS: &[&str] = &["slot_id", "slot"];

/// Naive formats accepted besides RFC 3339; interpreted as UTC
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

// ============================================================================
// COLUMN MAP
// ============================================================================

#[derive(Debug, Clone)]
struct ColumnMap {
    timestamp: usize,
    slot: Option<usize>,
    features: [usize; FEATURE_COUNT],
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self, SourceError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        let timestamp = find(TIMESTAMP_COLUMN)
            .ok_or_else(|| SourceError::Header(format!("missing '{}' column", TIMESTAMP_COLUMN)))?;
        let slot = SLOT_COLUMNS.iter().find_map(|name| find(name));

        let mut features = [0usize; FEATURE_COUNT];
        let mut missing = Vec::new();
        for (i, name) in FEATURE_LAYOUT.iter().enumerate() {
            match find(name) {
                Some(col) => features[i] = col,
                None => missing.push(*name),
            }
        }

        if !missing.is_empty() {
            return Err(SourceError::Header(format!(
                "missing feature columns: {}",
                missing.join(", ")
            )));
        }

        Ok(Self { timestamp, slot, features })
    }
}

// ============================================================================
// STREAMING SOURCE
// ============================================================================

/// Lazy CSV source; rows must already be in timestamp order
pub struct CsvFeatureSource<R: io::Read> {
    records: StringRecordsIntoIter<R>,
    columns: ColumnMap,
    rule: OccupancyRule,
    default_slot: SlotId,
    last_timestamp: Option<DateTime<Utc>>,
}

impl CsvFeatureSource<File> {
    /// Open a features CSV from disk
    pub fn open(
        path: impl AsRef<Path>,
        rule: OccupancyRule,
        default_slot: impl Into<SlotId>,
    ) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        log::info!("Loading features from {}", path.display());
        Self::from_reader(file, rule, default_slot)
    }
}

impl<R: io::Read> CsvFeatureSource<R> {
    pub fn from_reader(
        reader: R,
        rule: OccupancyRule,
        default_slot: impl Into<SlotId>,
    ) -> Result<Self, SourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns = ColumnMap::from_headers(reader.headers()?)?;

        Ok(Self {
            records: reader.into_records(),
            columns,
            rule,
            default_slot: default_slot.into(),
            last_timestamp: None,
        })
    }

    /// Buffer the whole file and sort it by timestamp
    ///
    /// Stable sort, so rows sharing a timestamp keep file order. Malformed
    /// rows are kept aside and yielded first by the returned source.
    pub fn into_sorted(mut self) -> Result<ReplaySource, SourceError> {
        let mut readings = Vec::new();
        let mut malformed = Vec::new();

        while let Some((_, item)) = self.next_row() {
            match item {
                Ok(reading) => readings.push(reading),
                Err(e) if e.is_recoverable() => malformed.push(e),
                Err(e) => return Err(e),
            }
        }

        readings.sort_by_key(|r| r.timestamp);
        log::info!(
            "Loaded {} readings ({} malformed rows)",
            readings.len(),
            malformed.len()
        );

        Ok(ReplaySource {
            malformed: malformed.into(),
            readings: readings.into(),
        })
    }

    /// Next row with its CSV line number (0 when unknown)
    fn next_row(&mut self) -> Option<(u64, Result<Reading, SourceError>)> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                return Some((line, Err(e.into())));
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        Some((line, self.parse_record(line, &record)))
    }

    fn parse_record(&self, line: u64, record: &StringRecord) -> Result<Reading, SourceError> {

        let raw_ts = record
            .get(self.columns.timestamp)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SourceError::malformed(line, "missing timestamp"))?;
        let timestamp = parse_timestamp(raw_ts)
            .ok_or_else(|| SourceError::malformed(line, format!("bad timestamp '{}'", raw_ts)))?;

        let slot_id = match self.columns.slot.and_then(|i| record.get(i)) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => self.default_slot.clone(),
        };

        let values = self
            .columns
            .features
            .iter()
            .zip(FEATURE_LAYOUT)
            .map(|(&col, name)| {
                let raw = record
                    .get(col)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| SourceError::malformed(line, format!("missing field '{}'", name)))?;
                raw.parse::<f32>()
                    .map_err(|_| SourceError::malformed(line, format!("bad value '{}' for '{}'", raw, name)))
            })
            .collect::<Result<Vec<f32>, SourceError>>()?;

        let features = FeatureVector::from_slice(&values)
            .map_err(|e| SourceError::malformed(line, e.to_string()))?;
        if let Some(name) = features.first_non_finite() {
            return Err(SourceError::malformed(line, format!("non-finite value for '{}'", name)));
        }

        Ok(Reading::new(slot_id, timestamp, features, &self.rule))
    }
}

impl<R: io::Read> Iterator for CsvFeatureSource<R> {
    type Item = Result<Reading, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (line, item) = self.next_row()?;

        Some(item.and_then(|reading| {
            if let Some(last) = self.last_timestamp {
                if reading.timestamp < last {
                    return Err(SourceError::malformed(
                        line,
                        format!(
                            "out-of-order timestamp {} for {} (previous {})",
                            reading.timestamp, reading.slot_id, last
                        ),
                    ));
                }
            }
            self.last_timestamp = Some(reading.timestamp);
            Ok(reading)
        }))
    }
}

// ============================================================================
// BUFFERED SOURCE
// ============================================================================

/// Fully loaded, timestamp-sorted readings
#[derive(Debug, Default)]
pub struct ReplaySource {
    malformed: VecDeque<SourceError>,
    readings: VecDeque<Reading>,
}

impl ReplaySource {
    pub fn len(&self) -> usize {
        self.readings.len() + self.malformed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Iterator for ReplaySource {
    type Item = Result<Reading, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.malformed.pop_front() {
            return Some(Err(err));
        }
        self.readings.pop_front().map(Ok)
    }
}

// ============================================================================
// TIMESTAMPS
// ============================================================================

/// Parse RFC 3339, common naive formats (as UTC) or epoch seconds/milliseconds
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    let epoch: f64 = raw.parse().ok()?;
    if !epoch.is_finite() {
        return None;
    }
    let millis = if epoch.abs() >= EPOCH_MILLIS_CUTOFF {
        epoch.round()
    } else {
        (epoch * 1000.0).round()
    };
    Utc.timestamp_millis_opt(millis as i64).single()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header() -> String {
        format!("timestamp,slot_id,{},extra", FEATURE_LAYOUT.join(","))
    }

    fn row(ts: &str, slot: &str, g1_min: &str) -> String {
        let values: Vec<String> = FEATURE_LAYOUT
            .iter()
            .map(|name| if *name == "g1_min" { g1_min.to_string() } else { "1.5".to_string() })
            .collect();
        format!("{},{},{},x", ts, slot, values.join(","))
    }

    fn source(rows: &[String]) -> CsvFeatureSource<Cursor<String>> {
        let mut text = header();
        for r in rows {
            text.push('\n');
            text.push_str(r);
        }
        CsvFeatureSource::from_reader(Cursor::new(text), OccupancyRule::default(), "slot1").unwrap()
    }

    #[test]
    fn test_reads_rows_in_layout_order() {
        let readings: Vec<_> = source(&[
            row("2024-05-01 12:00:00", "slot3", "120"),
            row("2024-05-01 12:00:01", "slot3", "900"),
        ])
        .collect::<Result<_, _>>()
        .unwrap();

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].slot_id, "slot3");
        assert_eq!(readings[0].features.get_by_name("g1_min"), Some(120.0));
        assert!(readings[0].occupied);
        assert!(!readings[1].occupied);
    }

    #[test]
    fn test_missing_slot_uses_default() {
        let mut readings = source(&[row("2024-05-01T12:00:00Z", "", "120")]);
        assert_eq!(readings.next().unwrap().unwrap().slot_id, "slot1");
    }

    #[test]
    fn test_missing_feature_column_is_fatal() {
        let text = "timestamp,g0_min,g1_min\n2024-05-01 12:00:00,1,2\n";
        let err = CsvFeatureSource::from_reader(Cursor::new(text), OccupancyRule::default(), "slot1")
            .err()
            .unwrap();
        assert!(matches!(err, SourceError::Header(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_malformed_rows_are_recoverable() {
        let items: Vec<_> = source(&[
            row("2024-05-01 12:00:00", "slot1", ""),
            row("not-a-time", "slot1", "100"),
            row("2024-05-01 12:00:02", "slot1", "NaN"),
            row("2024-05-01 12:00:03", "slot1", "100"),
        ])
        .collect();

        assert_eq!(items.len(), 4);
        for item in &items[..3] {
            let err = item.as_ref().unwrap_err();
            assert!(err.is_recoverable(), "{}", err);
        }
        assert!(items[3].is_ok());
    }

    #[test]
    fn test_out_of_order_rows_skipped_when_streaming() {
        let items: Vec<_> = source(&[
            row("2024-05-01 12:00:05", "slot1", "100"),
            row("2024-05-01 12:00:01", "slot1", "100"),
            row("2024-05-01 12:00:06", "slot1", "100"),
        ])
        .collect();

        assert!(items[0].is_ok());
        assert!(items[1].as_ref().unwrap_err().is_recoverable());
        assert!(items[2].is_ok());
    }

    #[test]
    fn test_into_sorted_orders_by_timestamp() {
        let sorted = source(&[
            row("2024-05-01 12:00:05", "slot1", "100"),
            row("2024-05-01 12:00:01", "slot2", "100"),
            row("bad", "slot1", "100"),
        ])
        .into_sorted()
        .unwrap();

        assert_eq!(sorted.len(), 3);
        let items: Vec<_> = sorted.collect();
        assert!(items[0].is_err());
        assert_eq!(items[1].as_ref().unwrap().slot_id, "slot2");
        assert_eq!(items[2].as_ref().unwrap().slot_id, "slot1");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-05-01T12:00:00+02:00").is_some());
        assert!(parse_timestamp("2024-05-01 12:00:00.250").is_some());
        assert_eq!(
            parse_timestamp("1714564800").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        );
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_parse_timestamp_epoch_millis() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_timestamp("1714564800000").unwrap(), expected);
        assert_eq!(parse_timestamp("1714564800.5").unwrap().timestamp_millis(), 1_714_564_800_500);
        assert_eq!(parse_timestamp("1714564800250").unwrap().timestamp_millis(), 1_714_564_800_250);
    }

    #[test]
    fn test_out_of_order_error_keeps_line_number() {
        let mut items = source(&[
            row("2024-05-01 12:00:05", "slot1", "100"),
            row("2024-05-01 12:00:01", "slot1", "100"),
        ]);

        assert!(items.next().unwrap().is_ok());
        match items.next().unwrap() {
            Err(SourceError::Malformed { line, reason }) => {
                assert_eq!(line, 3);
                assert!(reason.contains("out-of-order"));
            }
            other => panic!("expected malformed row, got {:?}", other),
        }
    }
}
