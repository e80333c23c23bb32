//! Water monitoring toolkit: CSV export ingest, canonical time-series
//! records, and parameter-grouped chart output.
//!
//! The flow of a batch run is linear: `config` describes the run, `ingest`
//! turns CSV exports into `record::Record`s, `store` holds them under their
//! addressing strings, and `plot` renders them. `record` is the core: a
//! value type that reconciles irregular explicit timestamps and regular
//! start+interval sampling behind one interface.

pub mod config;
pub mod ingest;
pub mod logging;
pub mod plot;
pub mod record;
pub mod store;
