/// Locations-down layout scanner.
///
/// The export has one row per sample. A header row names the date column,
/// the location column, optionally a time column, and one column per
/// measured parameter; the parameter columns are recognized by mapping
/// their header cells through the configured `[mapping]` table. Everything
/// above the header row (report titles, blank padding) is skipped.

use crate::config::RunConfig;
use crate::logging::{self, Source};

use super::{find_column, parse_measurement, parse_sample_time, ImportError, MeasurementRow};

/// Time-of-day applied when the export has no time column.
const DEFAULT_TIME_OF_DAY: &str = "12:00:00";

/// Resolved header positions for one file.
struct HeaderColumns {
    date: usize,
    time: Option<usize>,
    location: usize,
    /// (canonical parameter name, column index)
    params: Vec<(String, usize)>,
}

/// Scans one locations-down CSV export into measurement rows.
///
/// `file_name` is used only for log and error context.
pub fn scan(
    config: &RunConfig,
    text: &str,
    file_name: &str,
) -> Result<Vec<MeasurementRow>, ImportError> {
    let date_config = config
        .columns
        .date
        .as_ref()
        .ok_or_else(|| ImportError::Misconfigured("[columns.date] missing".to_string()))?;
    let date_fmt = date_config
        .format
        .as_deref()
        .ok_or_else(|| ImportError::Misconfigured("columns.date.format missing".to_string()))?;
    let location_title = &config
        .columns
        .location
        .as_ref()
        .ok_or_else(|| ImportError::Misconfigured("[columns.location] missing".to_string()))?
        .title;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut rows_iter = reader.records();

    // Find the header row first: it must carry both the date and the
    // location titles. Parameter columns are whatever mapped cells it holds.
    let mut header: Option<HeaderColumns> = None;
    for row in rows_iter.by_ref() {
        let row = row?;
        let (Some(date), Some(location)) = (
            find_column(&row, &date_config.title),
            find_column(&row, location_title),
        ) else {
            continue;
        };

        let time = config
            .columns
            .time
            .as_ref()
            .and_then(|t| find_column(&row, &t.title));

        let mut params = Vec::new();
        for (index, cell) in row.iter().enumerate() {
            if let Some(param) = config.mapping.get(cell.trim()) {
                if config.params.contains_key(param) {
                    params.push((param.clone(), index));
                }
            }
        }

        header = Some(HeaderColumns {
            date,
            time,
            location,
            params,
        });
        break;
    }

    let header = header.ok_or_else(|| ImportError::HeaderNotFound {
        file: file_name.to_string(),
        wanted: format!("'{}' and '{}'", date_config.title, location_title),
    })?;
    if header.params.is_empty() {
        logging::warn(
            Source::Import,
            Some(file_name),
            "header row matched but no mapped parameter columns found",
        );
    }

    // Then the actual data. Rows with an empty location cell are padding or
    // footer text; rows whose date cell won't parse are reported and skipped
    // rather than aborting the batch.
    let mut measurements = Vec::new();
    for row in rows_iter {
        let row = row?;
        let location = row.get(header.location).unwrap_or("").trim();
        if location.is_empty() {
            continue;
        }

        let date_str = row.get(header.date).unwrap_or("");
        let time_str = header
            .time
            .and_then(|c| row.get(c))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_TIME_OF_DAY);

        let sample_time = match parse_sample_time(date_str, time_str, date_fmt) {
            Ok(t) => t,
            Err(detail) => {
                logging::warn(Source::Import, Some(file_name), &format!("skipping row: {}", detail));
                continue;
            }
        };

        for (param, column) in &header.params {
            let Some(value) = row.get(*column).and_then(parse_measurement) else {
                continue;
            };
            measurements.push(MeasurementRow {
                sample_time,
                site: config.site.clone(),
                location: location.to_uppercase(),
                parameter: param.clone(),
                version: config.version.clone(),
                value,
                units: config.params[param].unit.clone(),
            });
        }
    }

    Ok(measurements)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
