/// Canonical time-series record for the monitoring toolkit.
///
/// One `Record` represents a single location/parameter series, whether it
/// came from a spot sample in a lab export or a continuously logged sensor.
/// The temporal basis is an explicit tagged variant: either the timestamps
/// are irregular and stored verbatim, or the series is regular and the time
/// axis is derived from a start time plus a fixed interval. Derived
/// properties (`full_name`, `interval_str`, `times`, `end_time`, `origin`)
/// work the same regardless of which basis backs the record.

use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::logging::{self, Source};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default record classification: an instantaneous value, as opposed to an
/// accumulated or averaged one. Descriptive only; nothing branches on it.
pub const DEFAULT_RECORD_TYPE: &str = "INST-VAL";

/// Default units string meaning "no units".
pub const DEFAULT_UNITS: &str = "-";

// ---------------------------------------------------------------------------
// Temporal basis
// ---------------------------------------------------------------------------

/// How the time axis of a record is represented.
///
/// Exactly one variant is active per record; the builder enforces this at
/// construction, so `times()` can derive the axis with an exhaustive match
/// instead of juggling optional fields.
#[derive(Debug, Clone, PartialEq)]
pub enum TemporalBasis {
    /// Explicit, possibly unevenly spaced timestamps, used verbatim.
    Irregular { times: Vec<DateTime<Utc>> },
    /// Start time plus fixed interval; the axis is generated on demand as
    /// start, start + interval, start + 2·interval, …
    Regular {
        start: DateTime<Utc>,
        interval_minutes: i64,
    },
}

// ---------------------------------------------------------------------------
// Origin classification
// ---------------------------------------------------------------------------

/// Whether a record is a single spot sample or a logged series.
///
/// Purely a function of value count: exactly one value means someone took a
/// sample, more than one means an instrument logged them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Sample,
    Logger,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Sample => write!(f, "sample"),
            Origin::Logger => write!(f, "logger"),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised while constructing a record or reading derived properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// Neither an interval nor explicit timestamps were supplied, so the
    /// record has no temporal basis at all.
    AmbiguousTemporalBasis,
    /// An interval was supplied without the start time the regular basis
    /// needs to anchor its progression.
    MissingStartTime,
    /// `end_time` was requested on a record with an empty time axis.
    EmptySeries { name: String },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::AmbiguousTemporalBasis => {
                write!(f, "irregular times or an interval must be specified for record")
            }
            RecordError::MissingStartTime => {
                write!(f, "an interval was given but no start time to anchor it")
            }
            RecordError::EmptySeries { name } => {
                write!(f, "record {} has no values, so no end time", name)
            }
        }
    }
}

impl std::error::Error for RecordError {}

// ---------------------------------------------------------------------------
// Scalar-or-sequence inputs
// ---------------------------------------------------------------------------

/// Values input to the builder: a bare scalar or an ordered sequence.
///
/// A scalar is normalized into a one-element sequence, and additionally
/// forces the record into the irregular basis: a single measurement cannot
/// carry a meaningful sampling interval, so the record degrades to a
/// one-point irregular series anchored at the start time. This happens once,
/// at construction; it is not a hidden setter side effect.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueInput {
    Scalar(f64),
    Series(Vec<f64>),
}

impl From<f64> for ValueInput {
    fn from(v: f64) -> Self {
        ValueInput::Scalar(v)
    }
}

impl From<Vec<f64>> for ValueInput {
    fn from(v: Vec<f64>) -> Self {
        ValueInput::Series(v)
    }
}

/// Quality flags input: scalar or sequence, same normalization as values
/// (minus the basis coercion; qualities never affect the time axis).
#[derive(Debug, Clone, PartialEq)]
pub enum QualityInput {
    Scalar(String),
    Series(Vec<String>),
}

impl From<&str> for QualityInput {
    fn from(q: &str) -> Self {
        QualityInput::Scalar(q.to_string())
    }
}

impl From<String> for QualityInput {
    fn from(q: String) -> Self {
        QualityInput::Scalar(q)
    }
}

impl From<Vec<String>> for QualityInput {
    fn from(q: Vec<String>) -> Self {
        QualityInput::Series(q)
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One identified time series. Immutable after construction; all derived
/// properties are pure functions of the stored state.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    site: String,
    location: String,
    parameter: String,
    version: String,
    units: String,
    basis: TemporalBasis,
    /// Granularity label used in place of an interval string when the basis
    /// is irregular (the external store names irregular blocks, e.g. "IR-DAY").
    ir_block_length: Option<String>,
    record_type: String,
    values: Vec<f64>,
    /// Per-sample quality flags, parallel to `values`. `None` means the
    /// source carried no quality data, which is different from empty.
    qualities: Option<Vec<String>>,
}

impl Record {
    /// Starts a builder with the four identity fields. Identity is
    /// upper-cased on entry so the addressing string is case-stable.
    pub fn builder(site: &str, location: &str, parameter: &str, version: &str) -> RecordBuilder {
        RecordBuilder {
            site: site.to_uppercase(),
            location: location.to_uppercase(),
            parameter: parameter.to_uppercase(),
            version: version.to_uppercase(),
            units: DEFAULT_UNITS.to_string(),
            start_time: None,
            interval_minutes: None,
            ir_block_length: None,
            times: None,
            values: None,
            record_type: DEFAULT_RECORD_TYPE.to_string(),
            qualities: None,
        }
    }

    // --- Identity and stored fields -----------------------------------------

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    pub fn basis(&self) -> &TemporalBasis {
        &self.basis
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn qualities(&self) -> Option<&[String]> {
        self.qualities.as_deref()
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    // --- Derived properties --------------------------------------------------

    /// Sample vs. logger classification, `None` for a record with no values.
    pub fn origin(&self) -> Option<Origin> {
        match self.values.len() {
            0 => None,
            1 => Some(Origin::Sample),
            _ => Some(Origin::Logger),
        }
    }

    /// Canonical hierarchical identifier:
    /// `/SITE/LOCATION/PARAMETER//INTERVAL/VERSION/`.
    ///
    /// The empty fifth segment is intentional: the external store's
    /// addressing convention reserves it, and lookups are done with this
    /// exact string.
    pub fn full_name(&self) -> String {
        format!(
            "/{}/{}/{}//{}/{}/",
            self.site,
            self.location,
            self.parameter,
            self.interval_str(),
            self.version
        )
    }

    /// Interval rendered as a compact store label.
    ///
    /// Intervals are stored as integer minutes. Below an hour they render as
    /// `<N>MIN`, below a day as `<N/60>HOUR`, and anything from a day up as
    /// `<N/1440>DAY` (integer division throughout, no upper bound on the day
    /// count). An irregular record renders its block-length label instead,
    /// or an empty segment when none was recorded.
    pub fn interval_str(&self) -> String {
        match &self.basis {
            TemporalBasis::Regular { interval_minutes, .. } => {
                interval_label(*interval_minutes)
            }
            TemporalBasis::Irregular { .. } => {
                self.ir_block_length.clone().unwrap_or_default()
            }
        }
    }

    /// Materialized time axis.
    ///
    /// Recomputed on every call rather than cached: the axis of a regular
    /// record is a function of start and interval, and keeping it lazy means
    /// there is no stale materialization to invalidate.
    pub fn times(&self) -> Vec<DateTime<Utc>> {
        match &self.basis {
            TemporalBasis::Irregular { times } => times.clone(),
            TemporalBasis::Regular {
                start,
                interval_minutes,
            } => match self.values.len() {
                0 => Vec::new(),
                1 => vec![*start],
                n => (0..n as i64)
                    .map(|k| *start + Duration::minutes(interval_minutes * k))
                    .collect(),
            },
        }
    }

    /// Last element of the time axis.
    ///
    /// Callers holding a possibly empty record should check `len() > 0`
    /// first; an empty axis is an error here, not a silent default.
    pub fn end_time(&self) -> Result<DateTime<Utc>, RecordError> {
        self.times()
            .last()
            .copied()
            .ok_or_else(|| RecordError::EmptySeries {
                name: self.full_name(),
            })
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.origin() {
            Some(origin) => write!(f, "Record: {} data at {}", origin, self.location),
            None => write!(f, "Record: empty at {}", self.location),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Construction contract for `Record`.
///
/// Temporal basis resolution, in order:
/// 1. Neither an interval nor explicit times → `AmbiguousTemporalBasis`.
/// 2. Both supplied → non-fatal warning; the interval + start time win and
///    the explicit sequence is discarded.
/// 3. A scalar `values` input collapses a regular basis to a one-point
///    irregular series anchored at the start time (see `ValueInput`).
///
/// A non-positive interval is the "no interval" sentinel carried over from
/// the store's conventions, equivalent to not setting one.
pub struct RecordBuilder {
    site: String,
    location: String,
    parameter: String,
    version: String,
    units: String,
    start_time: Option<DateTime<Utc>>,
    interval_minutes: Option<i64>,
    ir_block_length: Option<String>,
    times: Option<Vec<DateTime<Utc>>>,
    values: Option<ValueInput>,
    record_type: String,
    qualities: Option<QualityInput>,
}

impl RecordBuilder {
    pub fn units(mut self, units: &str) -> Self {
        self.units = units.to_string();
        self
    }

    pub fn start_time(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self
    }

    /// Sets the sampling interval in minutes. Values below 1 mean
    /// "no interval" and leave the builder in irregular mode.
    pub fn interval_minutes(mut self, minutes: i64) -> Self {
        self.interval_minutes = if minutes > 0 { Some(minutes) } else { None };
        self
    }

    pub fn ir_block_length(mut self, label: &str) -> Self {
        self.ir_block_length = Some(label.to_string());
        self
    }

    pub fn times(mut self, times: Vec<DateTime<Utc>>) -> Self {
        self.times = Some(times);
        self
    }

    pub fn values(mut self, values: impl Into<ValueInput>) -> Self {
        self.values = Some(values.into());
        self
    }

    pub fn record_type(mut self, record_type: &str) -> Self {
        self.record_type = record_type.to_string();
        self
    }

    pub fn qualities(mut self, qualities: impl Into<QualityInput>) -> Self {
        self.qualities = Some(qualities.into());
        self
    }

    pub fn build(self) -> Result<Record, RecordError> {
        let has_times = self.times.as_ref().is_some_and(|t| !t.is_empty());

        let mut basis = match (self.interval_minutes, has_times) {
            (None, false) => return Err(RecordError::AmbiguousTemporalBasis),
            (None, true) => TemporalBasis::Irregular {
                times: self.times.unwrap_or_default(),
            },
            (Some(interval_minutes), both) => {
                if both {
                    logging::warn(
                        Source::System,
                        None,
                        "both interval and times specified; using interval and start time",
                    );
                }
                let start = self.start_time.ok_or(RecordError::MissingStartTime)?;
                TemporalBasis::Regular {
                    start,
                    interval_minutes,
                }
            }
        };

        let values = match self.values {
            None => Vec::new(),
            Some(ValueInput::Series(v)) => v,
            Some(ValueInput::Scalar(v)) => {
                // A single measurement has no sampling interval. Degrade a
                // regular basis to a one-point irregular series at the start
                // time; an already-irregular basis keeps its timestamps.
                let anchor = match &basis {
                    TemporalBasis::Regular { start, .. } => Some(*start),
                    TemporalBasis::Irregular { .. } => None,
                };
                if let Some(start) = anchor {
                    basis = TemporalBasis::Irregular { times: vec![start] };
                }
                vec![v]
            }
        };

        let qualities = self.qualities.map(|q| match q {
            QualityInput::Scalar(q) => vec![q],
            QualityInput::Series(q) => q,
        });

        Ok(Record {
            site: self.site,
            location: self.location,
            parameter: self.parameter,
            version: self.version,
            units: self.units,
            basis,
            ir_block_length: self.ir_block_length,
            record_type: self.record_type,
            values,
            qualities,
        })
    }
}

// ---------------------------------------------------------------------------
// Interval formatting
// ---------------------------------------------------------------------------

/// Renders an interval in minutes as the store's compact label form.
fn interval_label(minutes: i64) -> String {
    if minutes < 60 {
        format!("{}MIN", minutes)
    } else if minutes < 1440 {
        format!("{}HOUR", minutes / 60)
    } else {
        // No unit above DAY: a 10-day interval renders as "10DAY".
        format!("{}DAY", minutes / 1440)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
