/// Series store seam.
///
/// The real time-series store is external; the only contract this system
/// owns is the addressing string (a record's `full_name`) that series are
/// looked up under. `SeriesStore` is that seam, and `InMemoryStore` is the
/// implementation used for batch runs and tests.

use std::collections::HashMap;

use crate::record::Record;

/// Read access to stored series, keyed by the
/// `/SITE/LOCATION/PARAMETER//INTERVAL/VERSION/` addressing string.
pub trait SeriesStore {
    fn get(&self, path: &str) -> Option<&Record>;
}

/// In-memory store for single-run batch processing.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    series: HashMap<String, Record>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record under its own full name. A record with the same
    /// address replaces the previous one.
    pub fn put(&mut self, record: Record) {
        self.series.insert(record.full_name(), record);
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl SeriesStore for InMemoryStore {
    fn get(&self, path: &str) -> Option<&Record> {
        self.series.get(path)
    }
}
