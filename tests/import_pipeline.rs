//! Import pipeline integration tests.
//!
//! Each test writes a config file and CSV fixtures into its own temp
//! directory, then runs the import through the public crate API exactly the
//! way the binary does: load config, import files, group into records,
//! load the store, and look series back up by their addressing strings.

use chrono::{TimeZone, Utc};
use std::fs;
use std::path::PathBuf;

use hydromon::config::RunConfig;
use hydromon::ingest::import_files;
use hydromon::record::Origin;
use hydromon::store::{InMemoryStore, SeriesStore};

/// Creates an empty scratch directory unique to one test.
fn scratch_dir(test_name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("hydromon-tests")
        .join(format!("{}-{}", test_name, std::process::id()));
    if dir.exists() {
        fs::remove_dir_all(&dir).expect("stale scratch dir should be removable");
    }
    fs::create_dir_all(dir.join("data")).expect("scratch dir should be creatable");
    dir
}

const DOWN_CONFIG: &str = r#"
site = "blue"
version = "raw"
interval = "IR-DAY"
layout = "down"
folder = "data"
files = ["q1.csv", "q2.csv"]
locations = ["W1", "W2"]
output_folder = "plots"
width = 800
height = 600

[columns.date]
title = "Sample Date"
format = "%d/%m/%Y"

[columns.time]
title = "Sample Time"

[columns.location]
title = "Location ID"

[mapping]
"Water Level (m)" = "level"
"Flow (l/s)" = "flow"

[params.level]
unit = "m"

[params.flow]
unit = "l/s"
scale = "log"

[line]
colours = [[31, 119, 180], [255, 127, 14]]
width = 2

[period]
start = "2026-01-01"
end = "2026-04-01"
"#;

const Q1_CSV: &str = "\
Quarterly export Q1,,,,\n\
Location ID,Sample Date,Sample Time,Water Level (m),Flow (l/s)\n\
w1,05/01/2026,09:15:00,1.25,14.2\n\
w2,05/01/2026,10:40:00,0.80,3.1\n";

const Q2_CSV: &str = "\
Quarterly export Q2,,,,\n\
Location ID,Sample Date,Sample Time,Water Level (m),Flow (l/s)\n\
w1,09/02/2026,09:30:00,1.31,15.0\n\
w2,09/02/2026,11:05:00,0.85,\n";

#[test]
fn test_down_layout_import_builds_addressable_records() {
    let dir = scratch_dir("down-import");
    fs::write(dir.join("config.toml"), DOWN_CONFIG).unwrap();
    fs::write(dir.join("data/q1.csv"), Q1_CSV).unwrap();
    fs::write(dir.join("data/q2.csv"), Q2_CSV).unwrap();

    let config = RunConfig::load(&dir.join("config.toml")).expect("config should load");
    let outcome = import_files(&config, &dir).expect("import should succeed");

    assert_eq!(outcome.summary.files_read, 2);
    // q1: 4 measurements, q2: 3 (blank flow at w2).
    assert_eq!(outcome.summary.measurements, 7);
    // w1/level, w1/flow, w2/level, w2/flow.
    assert_eq!(outcome.summary.records, 4);

    let mut store = InMemoryStore::new();
    for record in outcome.records {
        store.put(record);
    }

    let w1_level = store
        .get("/BLUE/W1/LEVEL//IR-DAY/RAW/")
        .expect("w1 level must be addressable by its full name");
    assert_eq!(w1_level.values(), &[1.25, 1.31]);
    assert_eq!(w1_level.origin(), Some(Origin::Logger));
    assert_eq!(
        w1_level.end_time().unwrap(),
        Utc.with_ymd_and_hms(2026, 2, 9, 9, 30, 0).unwrap()
    );

    let w2_flow = store
        .get("/BLUE/W2/FLOW//IR-DAY/RAW/")
        .expect("w2 flow must be addressable");
    assert_eq!(w2_flow.values(), &[3.1], "the blank q2 cell contributes nothing");
    assert_eq!(w2_flow.origin(), Some(Origin::Sample));
}

#[test]
fn test_missing_export_file_fails_the_import() {
    let dir = scratch_dir("missing-file");
    fs::write(dir.join("config.toml"), DOWN_CONFIG).unwrap();
    fs::write(dir.join("data/q1.csv"), Q1_CSV).unwrap();
    // q2.csv deliberately absent.

    let config = RunConfig::load(&dir.join("config.toml")).unwrap();
    let err = import_files(&config, &dir).unwrap_err();
    assert!(
        err.to_string().contains("q2.csv"),
        "error should name the missing file, got: {}",
        err
    );
}

const ACROSS_CONFIG: &str = r#"
site = "blue"
version = "lab"
interval = "IR-DAY"
layout = "across"
folder = "data"
files = ["sheet.csv"]
locations = ["W1", "W2"]
output_folder = "plots"
width = 800
height = 600

[rows.location]
title = "Monitoring point"

[rows.date]
title = "Date sampled"
format = "%d/%m/%Y"

[columns.parameter]
title = "Analyte"

[columns.unit]
title = "Units"

[mapping]
"Ammoniacal Nitrogen" = "ammonia"

[params.ammonia]
unit = "mg/l"

[line]
colours = [[31, 119, 180]]
width = 2

[period]
start = "2026-01-01"
end = "2026-04-01"
"#;

const SHEET_CSV: &str = "\
Lab report,,,,,,\n\
Monitoring point,,,,,w1,w2\n\
Date sampled,,,,,12/01/2026,12/01/2026\n\
Analyte,Method,LOD,Units,Accreditation,,\n\
Ammoniacal Nitrogen,ISO 11732,0.05,mg/l,UKAS,0.22,1.40\n";

#[test]
fn test_across_layout_import_round_trips_through_the_store() {
    let dir = scratch_dir("across-import");
    fs::write(dir.join("config.toml"), ACROSS_CONFIG).unwrap();
    fs::write(dir.join("data/sheet.csv"), SHEET_CSV).unwrap();

    let config = RunConfig::load(&dir.join("config.toml")).unwrap();
    let outcome = import_files(&config, &dir).expect("import should succeed");

    assert_eq!(outcome.summary.measurements, 2);
    assert_eq!(outcome.summary.records, 2);

    let mut store = InMemoryStore::new();
    for record in outcome.records {
        store.put(record);
    }

    let w2 = store
        .get("/BLUE/W2/AMMONIA//IR-DAY/LAB/")
        .expect("w2 ammonia must be addressable");
    assert_eq!(w2.values(), &[1.40]);
    assert_eq!(w2.units(), "mg/l");
    assert_eq!(
        w2.times(),
        vec![Utc.with_ymd_and_hms(2026, 1, 12, 12, 0, 0).unwrap()],
        "the sheet date applies to every sample",
    );
}

#[test]
fn test_import_summary_serializes_to_json() {
    let dir = scratch_dir("summary-json");
    fs::write(dir.join("config.toml"), ACROSS_CONFIG).unwrap();
    fs::write(dir.join("data/sheet.csv"), SHEET_CSV).unwrap();

    let config = RunConfig::load(&dir.join("config.toml")).unwrap();
    let outcome = import_files(&config, &dir).unwrap();

    let json = serde_json::to_value(&outcome.summary).unwrap();
    assert_eq!(json["site"], "blue");
    assert_eq!(json["version"], "lab");
    assert_eq!(json["files_read"], 1);
    assert_eq!(json["measurements"], 2);
    assert_eq!(json["records"], 2);
}
