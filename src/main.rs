//! Batch entry point.
//!
//! `hydromon run <config.toml>` imports the configured CSV exports, loads
//! the resulting records into the in-memory store, and renders the
//! configured plots. `hydromon import <config.toml>` stops after import and
//! prints the JSON summary.

use std::path::Path;
use std::process::ExitCode;

use hydromon::config::{PlotStyle, RunConfig};
use hydromon::ingest::{import_files, ImportOutcome};
use hydromon::logging::{self, LogLevel, Source};
use hydromon::plot;
use hydromon::store::InMemoryStore;

fn main() -> ExitCode {
    logging::init_logger(LogLevel::Info, None);

    let args: Vec<String> = std::env::args().collect();
    let (command, config_path) = match (args.get(1), args.get(2)) {
        (Some(command), Some(path)) => (command.as_str(), Path::new(path)),
        _ => {
            eprintln!("usage: hydromon <run|import> <config.toml>");
            return ExitCode::from(2);
        }
    };

    let result = match command {
        "run" => run(config_path),
        "import" => import_only(config_path),
        other => {
            eprintln!("unknown command '{}'; expected 'run' or 'import'", other);
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logging::error(Source::System, None, &e.to_string());
            ExitCode::FAILURE
        }
    }
}

/// Import, store, plot.
fn run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = RunConfig::load(config_path)?;
    let base_dir = config_dir(config_path);

    let outcome = import_files(&config, base_dir)?;
    log_summary(&outcome);

    let mut store = InMemoryStore::new();
    for record in outcome.records {
        store.put(record);
    }

    let (plotted, messages) = match config.style {
        PlotStyle::Overlay => plot::one_per_param(&config, &store, base_dir)?,
        PlotStyle::Pages => plot::param_per_page(&config, &store, base_dir)?,
    };
    for message in &messages {
        logging::warn(Source::Plot, None, message);
    }
    logging::info(Source::Plot, None, &format!("{} plots exported", plotted));

    Ok(())
}

/// Import only; print the summary as JSON for downstream tooling.
fn import_only(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = RunConfig::load(config_path)?;
    let base_dir = config_dir(config_path);

    let outcome = import_files(&config, base_dir)?;
    log_summary(&outcome);
    println!("{}", serde_json::to_string_pretty(&outcome.summary)?);

    Ok(())
}

/// Paths in the config are relative to the config file itself.
fn config_dir(config_path: &Path) -> &Path {
    config_path.parent().unwrap_or(Path::new("."))
}

fn log_summary(outcome: &ImportOutcome) {
    logging::info(
        Source::Import,
        None,
        &format!(
            "{} files, {} measurements, {} records",
            outcome.summary.files_read, outcome.summary.measurements, outcome.summary.records
        ),
    );
}
