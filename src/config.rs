/// Run configuration for import and plot batches.
///
/// One TOML file drives a whole run: where the CSV exports live, how their
/// columns map onto canonical parameters, which locations to plot, and how
/// the charts should look. Cross-references (mapping targets vs. declared
/// parameters, layout-specific column titles) are validated at load time so
/// a bad config fails before any file is touched.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    Io(String),
    /// The TOML did not deserialize.
    Parse(String),
    /// The TOML deserialized but the contents are inconsistent.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "config I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "config parse error: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Config model
// ---------------------------------------------------------------------------

/// CSV layout convention of the export files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// One row per sample; locations run down the sheet.
    Down,
    /// One column per location; a single sample date for the whole sheet.
    Across,
}

/// A named column or row in the export, matched against header cells.
#[derive(Debug, Clone, Deserialize)]
pub struct Titled {
    pub title: String,
    /// chrono format string, only meaningful for date fields.
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnTitles {
    pub date: Option<Titled>,
    pub time: Option<Titled>,
    pub location: Option<Titled>,
    pub parameter: Option<Titled>,
    pub unit: Option<Titled>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RowTitles {
    pub date: Option<Titled>,
    pub location: Option<Titled>,
}

/// Y-axis scale for one parameter's charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    #[default]
    Linear,
    Log,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParamConfig {
    /// Display unit for this parameter, e.g. "m" or "l/s".
    pub unit: String,
    #[serde(default)]
    pub scale: Scale,
}

/// How plots are grouped on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotStyle {
    /// All locations overlaid on one chart per parameter.
    #[default]
    Overlay,
    /// One viewport per location, stacked, per parameter.
    Pages,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineStyle {
    /// Palette cycled through per location, as RGB triples.
    pub colours: Vec<[u8; 3]>,
    pub width: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Period {
    /// Inclusive start date, `YYYY-MM-DD`.
    pub start: String,
    /// Inclusive end date, `YYYY-MM-DD`.
    pub end: String,
}

impl Period {
    pub fn start_utc(&self) -> Result<DateTime<Utc>, ConfigError> {
        parse_period_date(&self.start)
    }

    pub fn end_utc(&self) -> Result<DateTime<Utc>, ConfigError> {
        parse_period_date(&self.end)
    }
}

fn parse_period_date(s: &str) -> Result<DateTime<Utc>, ConfigError> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| ConfigError::Invalid(format!("period date '{}': {}", s, e)))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ConfigError::Invalid(format!("period date '{}' out of range", s)))?;
    Ok(Utc.from_utc_datetime(&midnight))
}

/// The full run configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub site: String,
    pub version: String,
    /// Interval label used to address imported series in the store,
    /// e.g. "IR-DAY" for irregular spot samples.
    pub interval: String,
    pub layout: Layout,
    /// Folder the export files live in, relative to the config file.
    pub folder: PathBuf,
    pub files: Vec<String>,
    #[serde(default)]
    pub columns: ColumnTitles,
    #[serde(default)]
    pub rows: RowTitles,
    /// Export header cell → canonical parameter name.
    pub mapping: BTreeMap<String, String>,
    /// Canonical parameter name → unit and chart scale.
    pub params: BTreeMap<String, ParamConfig>,
    pub locations: Vec<String>,
    pub line: LineStyle,
    pub period: Period,
    #[serde(default)]
    pub style: PlotStyle,
    /// Folder chart files are written to, relative to the config file like
    /// `folder`.
    pub output_folder: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl RunConfig {
    /// Loads and validates a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let config: RunConfig =
            toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a config from TOML text without touching the filesystem.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: RunConfig =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.files.is_empty() {
            return Err(ConfigError::Invalid("no import files listed".to_string()));
        }
        if self.locations.is_empty() {
            return Err(ConfigError::Invalid("no locations listed".to_string()));
        }
        if self.line.colours.is_empty() {
            return Err(ConfigError::Invalid("line.colours must not be empty".to_string()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid("plot width and height must be positive".to_string()));
        }

        for (cell, param) in &self.mapping {
            if !self.params.contains_key(param) {
                return Err(ConfigError::Invalid(format!(
                    "mapping '{}' targets parameter '{}' which has no [params] entry",
                    cell, param
                )));
            }
        }

        // Check the period dates up front rather than mid-plot.
        self.period.start_utc()?;
        self.period.end_utc()?;

        match self.layout {
            Layout::Down => {
                let date = self.columns.date.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("down layout requires [columns.date]".to_string())
                })?;
                if date.format.is_none() {
                    return Err(ConfigError::Invalid(
                        "down layout requires columns.date.format".to_string(),
                    ));
                }
                if self.columns.location.is_none() {
                    return Err(ConfigError::Invalid(
                        "down layout requires [columns.location]".to_string(),
                    ));
                }
            }
            Layout::Across => {
                let date = self.rows.date.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("across layout requires [rows.date]".to_string())
                })?;
                if date.format.is_none() {
                    return Err(ConfigError::Invalid(
                        "across layout requires rows.date.format".to_string(),
                    ));
                }
                if self.rows.location.is_none() {
                    return Err(ConfigError::Invalid(
                        "across layout requires [rows.location]".to_string(),
                    ));
                }
                if self.columns.parameter.is_none() || self.columns.unit.is_none() {
                    return Err(ConfigError::Invalid(
                        "across layout requires [columns.parameter] and [columns.unit]".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
