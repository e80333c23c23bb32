/// Chart rendering for stored series.
///
/// Plots are grouped by parameter: `one_per_param` overlays every
/// configured location on a single chart per parameter, `param_per_page`
/// gives each location its own viewport with a shared y range. Series are
/// looked up in the store by the same `/SITE/LOCATION/PARAMETER//INTERVAL/
/// VERSION/` addressing string the import side writes them under.
///
/// Parameters with no stored data are skipped and reported as messages, not
/// errors, since a quarterly export routinely covers only a subset of
/// analytes.

use chrono::{DateTime, Utc};
use plotters::coord::ranged1d::{AsRangedCoord, Ranged, ValueFormatter};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::collections::HashMap;
use std::error::Error;
use std::ops::Range;
use std::path::Path;

use crate::config::{RunConfig, Scale};
use crate::logging::{self, Source};
use crate::record::Record;
use crate::store::SeriesStore;

// ---------------------------------------------------------------------------
// Colour assignment
// ---------------------------------------------------------------------------

/// Assigns a fixed colour to each configured location, cycling through the
/// configured palette. Stable across runs so a location keeps its colour
/// from one report to the next.
pub fn colours_by_location(config: &RunConfig) -> HashMap<String, RGBColor> {
    let palette = &config.line.colours;
    let mut colours = HashMap::new();
    for (index, location) in config.locations.iter().enumerate() {
        let [r, g, b] = palette[index % palette.len()];
        colours.insert(location.to_uppercase(), RGBColor(r, g, b));
    }
    colours
}

/// Store addressing string for one configured location/parameter pair.
pub fn series_path(config: &RunConfig, location: &str, param: &str) -> String {
    format!(
        "/{}/{}/{}//{}/{}/",
        config.site.to_uppercase(),
        location.to_uppercase(),
        param.to_uppercase(),
        config.interval.to_uppercase(),
        config.version.to_uppercase()
    )
}

// ---------------------------------------------------------------------------
// Chart drivers
// ---------------------------------------------------------------------------

/// Renders one chart per parameter with every location's series overlaid.
///
/// `base_dir` anchors the configured output folder, normally the directory
/// the config file was loaded from. Returns the number of chart files
/// written and the skip messages for parameters that had no data.
pub fn one_per_param(
    config: &RunConfig,
    store: &dyn SeriesStore,
    base_dir: &Path,
) -> Result<(usize, Vec<String>), Box<dyn Error>> {
    let output_folder = base_dir.join(&config.output_folder);
    std::fs::create_dir_all(&output_folder)?;
    let colours = colours_by_location(config);
    let x_range = config.period.start_utc()?..config.period.end_utc()?;

    let mut plotted = 0;
    let mut messages = Vec::new();

    for (param, param_config) in &config.params {
        let datasets = collect_datasets(config, store, param);
        if datasets.is_empty() {
            messages.push(format!("No data for parameter '{}'.", param));
            continue;
        }

        let series: Vec<(&Record, RGBColor)> = datasets
            .iter()
            .map(|record| {
                let colour = colours
                    .get(record.location())
                    .copied()
                    .unwrap_or(RGBColor(0, 0, 0));
                (*record, colour)
            })
            .collect();

        let out_path = output_folder.join(format!("{}_{}.png", config.version, param));
        let root = BitMapBackend::new(&out_path, (config.width, config.height))
            .into_drawing_area();
        root.fill(&WHITE)?;

        let (y_min, y_max) = value_range(&datasets);
        match param_config.scale {
            Scale::Linear => render_chart(
                &root,
                param,
                x_range.clone(),
                y_min..y_max,
                &param_config.unit,
                &series,
                config.line.width,
                true,
            )?,
            Scale::Log => {
                let (lo, hi) = log_safe_range(y_min, y_max);
                render_chart(
                    &root,
                    param,
                    x_range.clone(),
                    (lo..hi).log_scale(),
                    &param_config.unit,
                    &series,
                    config.line.width,
                    true,
                )?;
            }
        }
        root.present()?;

        logging::info(
            Source::Plot,
            Some(param),
            &format!("{} series -> {}", series.len(), out_path.display()),
        );
        plotted += 1;
    }

    Ok((plotted, messages))
}

/// Renders one chart file per parameter with one viewport per location,
/// stacked vertically, all sharing the same y range so levels are
/// comparable across locations. `base_dir` anchors the configured output
/// folder as in `one_per_param`.
pub fn param_per_page(
    config: &RunConfig,
    store: &dyn SeriesStore,
    base_dir: &Path,
) -> Result<(usize, Vec<String>), Box<dyn Error>> {
    let output_folder = base_dir.join(&config.output_folder);
    std::fs::create_dir_all(&output_folder)?;
    let colours = colours_by_location(config);
    let x_range = config.period.start_utc()?..config.period.end_utc()?;

    let mut plotted = 0;
    let mut messages = Vec::new();

    for (param, param_config) in &config.params {
        let datasets = collect_datasets(config, store, param);
        if datasets.is_empty() {
            messages.push(format!("No data for parameter '{}'.", param));
            continue;
        }

        let out_path = output_folder.join(format!("{}_{}.png", config.version, param));
        let root = BitMapBackend::new(&out_path, (config.width, config.height))
            .into_drawing_area();
        root.fill(&WHITE)?;

        // One shared y range across every viewport.
        let (y_min, y_max) = value_range(&datasets);
        let viewports = root.split_evenly((datasets.len(), 1));

        for (record, area) in datasets.iter().zip(viewports.iter()) {
            let colour = colours
                .get(record.location())
                .copied()
                .unwrap_or(RGBColor(0, 0, 0));
            let caption = format!("{} at {}", param, record.location());
            let series = [(*record, colour)];
            match param_config.scale {
                Scale::Linear => render_chart(
                    area,
                    &caption,
                    x_range.clone(),
                    y_min..y_max,
                    &param_config.unit,
                    &series,
                    config.line.width,
                    false,
                )?,
                Scale::Log => {
                    let (lo, hi) = log_safe_range(y_min, y_max);
                    render_chart(
                        area,
                        &caption,
                        x_range.clone(),
                        (lo..hi).log_scale(),
                        &param_config.unit,
                        &series,
                        config.line.width,
                        false,
                    )?;
                }
            }
        }
        root.present()?;

        logging::info(
            Source::Plot,
            Some(param),
            &format!("{} viewports -> {}", datasets.len(), out_path.display()),
        );
        plotted += 1;
    }

    Ok((plotted, messages))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Looks up every configured location's series for one parameter, keeping
/// only those that exist and hold values.
fn collect_datasets<'a>(
    config: &RunConfig,
    store: &'a dyn SeriesStore,
    param: &str,
) -> Vec<&'a Record> {
    config
        .locations
        .iter()
        .filter_map(|location| store.get(&series_path(config, location, param)))
        .filter(|record| !record.is_empty())
        .collect()
}

/// Padded min/max over every value in the datasets.
fn value_range(datasets: &[&Record]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for record in datasets {
        for value in record.values() {
            min = min.min(*value);
            max = max.max(*value);
        }
    }
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let span = max - min;
    let pad = if span > 0.0 {
        span * 0.05
    } else {
        // Flat series: open up a band around the value.
        min.abs().max(1.0) * 0.05
    };
    (min - pad, max + pad)
}

/// Clamps a range so it is valid on a logarithmic axis.
fn log_safe_range(min: f64, max: f64) -> (f64, f64) {
    let lo = if min > 0.0 { min } else { 1e-3 };
    let hi = if max > lo { max } else { lo * 10.0 };
    (lo, hi)
}

/// Draws one cartesian chart onto `area`: time on x, values on y, one line
/// per dataset. Generic over the y coordinate so linear and logarithmic
/// charts share the drawing code.
#[allow(clippy::too_many_arguments)]
fn render_chart<YS>(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    caption: &str,
    x_range: Range<DateTime<Utc>>,
    y_spec: YS,
    y_label: &str,
    datasets: &[(&Record, RGBColor)],
    line_width: u32,
    with_legend: bool,
) -> Result<(), Box<dyn Error>>
where
    YS: AsRangedCoord<Value = f64>,
    YS::CoordDescType: Ranged<ValueType = f64> + ValueFormatter<f64>,
{
    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_spec)?;

    chart
        .configure_mesh()
        .y_desc(y_label)
        .x_labels(6)
        .draw()?;

    for (record, colour) in datasets {
        let colour = *colour;
        let points = record
            .times()
            .into_iter()
            .zip(record.values().iter().copied());
        let drawn = chart.draw_series(LineSeries::new(points, colour.stroke_width(line_width)))?;
        if with_legend {
            drawn
                .label(record.location().to_string())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], colour.stroke_width(line_width))
                });
        }
    }

    if with_legend {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
