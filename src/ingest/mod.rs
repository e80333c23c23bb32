/// CSV export ingest.
///
/// Lab and logger exports arrive as CSV files in one of two layout
/// conventions, selected per run in the config:
///
/// - `down`: one row per sample, locations running down the sheet
///   (`down::scan`).
/// - `across`: one column per location, a single sample date for the whole
///   sheet (`across::scan`).
///
/// Both scanners emit flat `MeasurementRow`s; `records_from_rows` then
/// groups them into irregular `Record`s addressed by the configured block
/// label. Header matching is fixed-title only; dialect detection is out of
/// scope, and rows that don't match are skipped.

pub mod across;
pub mod down;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::config::{Layout, RunConfig};
use crate::logging::{self, Source};
use crate::record::{Record, RecordError};

// ---------------------------------------------------------------------------
// Row and summary types
// ---------------------------------------------------------------------------

/// One measurement lifted out of an export: a sample of one parameter at one
/// location at one instant. The flat shape the scanners produce before rows
/// are grouped into records.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRow {
    pub sample_time: DateTime<Utc>,
    pub site: String,
    pub location: String,
    pub parameter: String,
    pub version: String,
    pub value: f64,
    pub units: String,
}

/// Counters for an import run, serializable for the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub site: String,
    pub version: String,
    pub files_read: usize,
    pub measurements: usize,
    pub records: usize,
}

/// Everything an import run produces.
#[derive(Debug)]
pub struct ImportOutcome {
    pub rows: Vec<MeasurementRow>,
    pub records: Vec<Record>,
    pub summary: ImportSummary,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ImportError {
    /// An export file could not be read.
    Io { path: String, message: String },
    /// The CSV reader itself failed on a row.
    Csv(String),
    /// A required header row was never found in the file.
    HeaderNotFound { file: String, wanted: String },
    /// A date/time cell that must parse (e.g. the across layout's single
    /// date row) did not.
    BadTimestamp { file: String, detail: String },
    /// Grouped rows could not be turned into a record.
    Record(RecordError),
    /// The config lacks a title/format the selected layout needs. Normally
    /// caught by config validation; kept here so the scanners stand alone.
    Misconfigured(String),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::Io { path, message } => write!(f, "cannot read {}: {}", path, message),
            ImportError::Csv(msg) => write!(f, "CSV error: {}", msg),
            ImportError::HeaderNotFound { file, wanted } => {
                write!(f, "no header row with {} found in {}", wanted, file)
            }
            ImportError::BadTimestamp { file, detail } => {
                write!(f, "bad timestamp in {}: {}", file, detail)
            }
            ImportError::Record(e) => write!(f, "record construction failed: {}", e),
            ImportError::Misconfigured(msg) => write!(f, "misconfigured import: {}", msg),
        }
    }
}

impl std::error::Error for ImportError {}

impl From<csv::Error> for ImportError {
    fn from(e: csv::Error) -> Self {
        ImportError::Csv(e.to_string())
    }
}

impl From<RecordError> for ImportError {
    fn from(e: RecordError) -> Self {
        ImportError::Record(e)
    }
}

// ---------------------------------------------------------------------------
// Import driver
// ---------------------------------------------------------------------------

/// Imports every configured file and groups the result into records.
///
/// `base_dir` anchors the configured folder, normally the directory the
/// config file was loaded from.
pub fn import_files(config: &RunConfig, base_dir: &Path) -> Result<ImportOutcome, ImportError> {
    let mut rows = Vec::new();
    let mut files_read = 0;

    for file_name in &config.files {
        let path = base_dir.join(&config.folder).join(file_name);
        let text = std::fs::read_to_string(&path).map_err(|e| ImportError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let file_rows = match config.layout {
            Layout::Down => down::scan(config, &text, file_name)?,
            Layout::Across => across::scan(config, &text, file_name)?,
        };
        logging::info(
            Source::Import,
            Some(file_name),
            &format!("{} measurements", file_rows.len()),
        );
        rows.extend(file_rows);
        files_read += 1;
    }

    let records = records_from_rows(&rows, &config.interval)?;
    let summary = ImportSummary {
        site: config.site.clone(),
        version: config.version.clone(),
        files_read,
        measurements: rows.len(),
        records: records.len(),
    };

    Ok(ImportOutcome {
        rows,
        records,
        summary,
    })
}

/// Groups flat measurement rows into one irregular record per
/// location/parameter pair, samples sorted by time.
///
/// `block_label` becomes each record's ir_block_length, upper-cased so the
/// store addressing string matches the label plots look series up under
/// regardless of how the config spells it.
pub fn records_from_rows(
    rows: &[MeasurementRow],
    block_label: &str,
) -> Result<Vec<Record>, RecordError> {
    let mut groups: BTreeMap<(String, String), Vec<&MeasurementRow>> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.location.clone(), row.parameter.clone()))
            .or_default()
            .push(row);
    }

    let block_label = block_label.to_uppercase();
    let mut records = Vec::with_capacity(groups.len());
    for ((location, parameter), mut group) in groups {
        group.sort_by_key(|r| r.sample_time);
        let first = group[0];
        let record = Record::builder(&first.site, &location, &parameter, &first.version)
            .units(&first.units)
            .ir_block_length(&block_label)
            .times(group.iter().map(|r| r.sample_time).collect())
            .values(group.iter().map(|r| r.value).collect::<Vec<f64>>())
            .build()?;
        records.push(record);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Cell parsing helpers
// ---------------------------------------------------------------------------

/// Parses a measurement cell.
///
/// Blank cells mean "no measurement" and are skipped, not errors. Thousands
/// separators are stripped, and a leading `<` (below detection limit in lab
/// exports) parses as the limit value itself. Anything else unparseable is
/// treated as absent.
pub fn parse_measurement(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    let cleaned = trimmed.replace(',', "");
    let numeric = cleaned.strip_prefix('<').unwrap_or(&cleaned).trim();
    numeric.parse::<f64>().ok()
}

/// Combines a date cell and a time-of-day cell into a UTC instant.
///
/// The date format comes from the config; times accept `HH:MM:SS` or
/// `HH:MM`. Exports carry no timezone, so wall-clock time is taken as UTC.
pub fn parse_sample_time(
    date_str: &str,
    time_str: &str,
    date_fmt: &str,
) -> Result<DateTime<Utc>, String> {
    let date = NaiveDate::parse_from_str(date_str.trim(), date_fmt)
        .map_err(|e| format!("date '{}' with format '{}': {}", date_str, date_fmt, e))?;
    let time_trimmed = time_str.trim();
    let time = NaiveTime::parse_from_str(time_trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time_trimmed, "%H:%M"))
        .map_err(|e| format!("time '{}': {}", time_str, e))?;
    Ok(Utc.from_utc_datetime(&date.and_time(time)))
}

/// Index of the first cell whose trimmed content equals `title`.
pub(crate) fn find_column(row: &csv::StringRecord, title: &str) -> Option<usize> {
    row.iter().position(|cell| cell.trim() == title)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn row(location: &str, parameter: &str, day: u32, value: f64) -> MeasurementRow {
        MeasurementRow {
            sample_time: Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap(),
            site: "BLUE".to_string(),
            location: location.to_string(),
            parameter: parameter.to_string(),
            version: "RAW".to_string(),
            value,
            units: "m".to_string(),
        }
    }

    // --- Measurement cells ----------------------------------------------------

    #[test]
    fn test_parse_measurement_plain_and_padded() {
        assert_eq!(parse_measurement("1.25"), Some(1.25));
        assert_eq!(parse_measurement("  3.5 "), Some(3.5));
        assert_eq!(parse_measurement("12,400"), Some(12400.0));
    }

    #[test]
    fn test_parse_measurement_detection_limit_marker() {
        assert_eq!(parse_measurement("<0.5"), Some(0.5));
        assert_eq!(parse_measurement("< 0.5"), Some(0.5));
    }

    #[test]
    fn test_parse_measurement_blank_or_text_is_absent() {
        assert_eq!(parse_measurement(""), None);
        assert_eq!(parse_measurement("   "), None);
        assert_eq!(parse_measurement("dry"), None);
        assert_eq!(parse_measurement("n/a"), None);
    }

    // --- Timestamps -------------------------------------------------------------

    #[test]
    fn test_parse_sample_time_with_and_without_seconds() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 5, 9, 30, 0).unwrap();
        assert_eq!(
            parse_sample_time("05/03/2026", "09:30:00", "%d/%m/%Y").unwrap(),
            expected
        );
        assert_eq!(
            parse_sample_time("05/03/2026", "09:30", "%d/%m/%Y").unwrap(),
            expected
        );
    }

    #[test]
    fn test_parse_sample_time_bad_date_errors() {
        assert!(parse_sample_time("2026-03-05", "09:30:00", "%d/%m/%Y").is_err());
    }

    // --- Grouping into records ----------------------------------------------------

    #[test]
    fn test_rows_group_by_location_and_parameter() {
        let rows = vec![
            row("W1", "LEVEL", 2, 1.0),
            row("W2", "LEVEL", 2, 2.0),
            row("W1", "LEVEL", 1, 0.5),
            row("W1", "FLOW", 1, 12.0),
        ];
        let records = records_from_rows(&rows, "IR-DAY").unwrap();
        assert_eq!(records.len(), 3);

        let w1_level = records
            .iter()
            .find(|r| r.location() == "W1" && r.parameter() == "LEVEL")
            .unwrap();
        assert_eq!(w1_level.values(), &[0.5, 1.0], "samples must be time-sorted");
        assert_eq!(w1_level.full_name(), "/BLUE/W1/LEVEL//IR-DAY/RAW/");
    }

    #[test]
    fn test_grouped_records_are_irregular_spot_samples() {
        let records = records_from_rows(&[row("W1", "LEVEL", 1, 0.5)], "IR-DAY").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].origin(),
            Some(crate::record::Origin::Sample)
        );
        assert_eq!(records[0].interval_str(), "IR-DAY");
    }

    #[test]
    fn test_block_label_is_case_folded_into_the_address() {
        // Plot lookups upper-case the configured interval label, so a
        // lower-case config spelling must still land on the same address.
        let records = records_from_rows(&[row("W1", "LEVEL", 1, 0.5)], "ir-day").unwrap();
        assert_eq!(records[0].interval_str(), "IR-DAY");
        assert_eq!(records[0].full_name(), "/BLUE/W1/LEVEL//IR-DAY/RAW/");
    }

    #[test]
    fn test_no_rows_yield_no_records() {
        assert!(records_from_rows(&[], "IR-DAY").unwrap().is_empty());
    }
}
