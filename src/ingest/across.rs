/// Locations-across layout scanner.
///
/// The export is a lab report sheet: one column per location, one row per
/// parameter, and a single sample date for the whole sheet. Landmark rows
/// are found in order (the location row, the date row, then the
/// parameter/unit header) and everything after the header is data keyed by
/// the parameter name in the first cell.

use chrono::{DateTime, Utc};

use crate::config::RunConfig;
use crate::logging::{self, Source};

use super::{find_column, parse_measurement, parse_sample_time, ImportError, MeasurementRow};

/// Leading metadata columns on a lab sheet before the per-location columns
/// start (sample ids, lab references and the like).
const META_COLUMNS: usize = 5;

/// Lab sheets carry a date but no time of day.
const SHEET_TIME_OF_DAY: &str = "12:00:00";

/// Scans one locations-across CSV export into measurement rows.
pub fn scan(
    config: &RunConfig,
    text: &str,
    file_name: &str,
) -> Result<Vec<MeasurementRow>, ImportError> {
    let location_title = &config
        .rows
        .location
        .as_ref()
        .ok_or_else(|| ImportError::Misconfigured("[rows.location] missing".to_string()))?
        .title;
    let date_config = config
        .rows
        .date
        .as_ref()
        .ok_or_else(|| ImportError::Misconfigured("[rows.date] missing".to_string()))?;
    let date_fmt = date_config
        .format
        .as_deref()
        .ok_or_else(|| ImportError::Misconfigured("rows.date.format missing".to_string()))?;
    let parameter_title = &config
        .columns
        .parameter
        .as_ref()
        .ok_or_else(|| ImportError::Misconfigured("[columns.parameter] missing".to_string()))?
        .title;
    let unit_title = &config
        .columns
        .unit
        .as_ref()
        .ok_or_else(|| ImportError::Misconfigured("[columns.unit] missing".to_string()))?
        .title;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut rows_iter = reader.records();

    // Landmark 1: the location row. Location ids run across the sheet from
    // the first column after the metadata block.
    let mut location_columns: Vec<(String, usize)> = Vec::new();
    for row in rows_iter.by_ref() {
        let row = row?;
        if find_column(&row, location_title).is_none() {
            continue;
        }
        for (offset, cell) in row.iter().skip(META_COLUMNS).enumerate() {
            let id = cell.trim();
            if !id.is_empty() {
                location_columns.push((id.to_uppercase(), offset + META_COLUMNS));
            }
        }
        break;
    }
    if location_columns.is_empty() {
        return Err(ImportError::HeaderNotFound {
            file: file_name.to_string(),
            wanted: format!("'{}' (location row)", location_title),
        });
    }

    // Landmark 2: the date row. One date for the whole sheet, taken from the
    // first location column.
    let mut sample_time: Option<DateTime<Utc>> = None;
    for row in rows_iter.by_ref() {
        let row = row?;
        if find_column(&row, &date_config.title).is_none() {
            continue;
        }
        let date_cell = row.get(META_COLUMNS).unwrap_or("");
        sample_time = Some(
            parse_sample_time(date_cell, SHEET_TIME_OF_DAY, date_fmt).map_err(|detail| {
                ImportError::BadTimestamp {
                    file: file_name.to_string(),
                    detail,
                }
            })?,
        );
        break;
    }
    let sample_time = sample_time.ok_or_else(|| ImportError::HeaderNotFound {
        file: file_name.to_string(),
        wanted: format!("'{}' (date row)", date_config.title),
    })?;

    // Landmark 3: the parameter/unit header row. Data starts after it.
    let mut header_found = false;
    for row in rows_iter.by_ref() {
        let row = row?;
        if find_column(&row, parameter_title).is_some() && find_column(&row, unit_title).is_some() {
            header_found = true;
            break;
        }
    }
    if !header_found {
        return Err(ImportError::HeaderNotFound {
            file: file_name.to_string(),
            wanted: format!("'{}' and '{}'", parameter_title, unit_title),
        });
    }

    // Then the actual data: each row is one parameter, keyed by its first
    // cell. Rows not present in the mapping are other analytes and skipped.
    let mut measurements = Vec::new();
    for row in rows_iter {
        let row = row?;
        let key = row.get(0).unwrap_or("").trim();
        let Some(param) = config.mapping.get(key) else {
            continue;
        };
        let Some(param_config) = config.params.get(param) else {
            logging::debug(
                Source::Import,
                Some(file_name),
                &format!("mapped parameter '{}' not configured, skipping", param),
            );
            continue;
        };

        for (location, column) in &location_columns {
            let Some(value) = row.get(*column).and_then(parse_measurement) else {
                continue;
            };
            measurements.push(MeasurementRow {
                sample_time,
                site: config.site.clone(),
                location: location.clone(),
                parameter: param.clone(),
                version: config.version.clone(),
                value,
                units: param_config.unit.clone(),
            });
        }
    }

    Ok(measurements)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
