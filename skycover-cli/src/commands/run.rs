//! Run command - estimate coverage for a region.

use std::path::{Path, PathBuf};

use skycover::config::CoverageConfig;
use skycover::coverage::CoverageExport;
use skycover::engine::{CoverageRun, CoverageSource};
use skycover::region::Region;
use skycover::render::{draw, GeoJsonSurface};
use tokio_util::sync::CancellationToken;

use super::common::{cancel_on_interrupt, print_top_cells, LayerArg};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the run command.
pub struct RunArgs {
    pub region: PathBuf,
    pub region_id: Option<String>,
    pub inclination_min: Option<f64>,
    pub inclination_max: Option<f64>,
    pub preview: bool,
    pub minutes_from_now: Option<i64>,
    pub resolution: Option<u8>,
    pub footprint_km: Option<f64>,
    pub steps: Option<usize>,
    pub step_minutes: Option<i64>,
    pub refresh: bool,
    pub export: Option<PathBuf>,
    pub geojson: Option<PathBuf>,
    pub layer: LayerArg,
    pub top: usize,
    pub verbose: bool,
}

/// Run the run command.
pub fn run(args: RunArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.verbose)?;
    runner.log_startup("run");

    let region = Region::load(&args.region)?;
    let config = resolve_config(&args, &region, &runner.config().coverage);
    config.validate()?;

    println!("SkyCover v{}", skycover::VERSION);
    println!("============");
    println!();
    println!("Region:      {} ({})", config.region_id, args.region.display());
    println!(
        "Satellites:  inclination {}..{}°, cap {} ({} mode)",
        config.inclination_min,
        config.inclination_max,
        config.satellite_cap(),
        config.render_mode()
    );
    println!(
        "Horizon:     {} samples every {} min, starting in {} min",
        config.horizon_steps, config.step_minutes, config.minutes_from_now
    );
    println!();

    let engine = runner.create_engine()?;
    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone())?;

    let run = runner.runtime().block_on(async {
        if args.refresh {
            engine.invalidate(&config.region_id).await;
        }
        engine.run(&region, &config, &cancel).await
    })?;

    print_run(&run);

    if let Some(path) = &args.export {
        CoverageExport::from(&run.aggregate).write_to(path)?;
        println!("Export written to {}", path.display());
    }
    if let Some(path) = &args.geojson {
        write_geojson(&run, args.layer, path)?;
        println!("GeoJSON written to {}", path.display());
    }
    if run.has_data() && args.top > 0 {
        println!();
        println!("Top {} cells by weighted score", args.top);
        print_top_cells(&CoverageExport::from(&run.aggregate).top_weighted(args.top));
    }
    Ok(())
}

/// Config file values overridden by CLI arguments.
///
/// Without `--region-id` the region file name is the cache key.
fn resolve_config(args: &RunArgs, region: &Region, base: &CoverageConfig) -> CoverageConfig {
    let mut config = base.clone().with_region_id(
        args.region_id
            .clone()
            .unwrap_or_else(|| region.name.clone()),
    );
    if args.inclination_min.is_some() || args.inclination_max.is_some() {
        let min = args.inclination_min.unwrap_or(config.inclination_min);
        let max = args.inclination_max.unwrap_or(config.inclination_max);
        config = config.with_inclination(min, max);
    }
    if args.preview {
        config = config.with_limit_satellites(true);
    }
    if let Some(minutes) = args.minutes_from_now {
        config = config.with_minutes_from_now(minutes);
    }
    if let Some(resolution) = args.resolution {
        config = config.with_resolution(resolution);
    }
    if let Some(radius) = args.footprint_km {
        config = config.with_footprint_radius_km(radius);
    }
    if args.steps.is_some() || args.step_minutes.is_some() {
        let steps = args.steps.unwrap_or(config.horizon_steps);
        let step_minutes = args.step_minutes.unwrap_or(config.step_minutes);
        config = config.with_horizon(steps, step_minutes);
    }
    config
}

fn print_run(run: &CoverageRun) {
    match run.source {
        CoverageSource::Cache => println!("Result: served from cache"),
        CoverageSource::Computed => println!(
            "Result: computed from {} satellites",
            run.satellites
        ),
        CoverageSource::NoData => {
            println!("Result: no data (no cells or no satellites available)");
        }
    }
    println!(
        "Cells: {} total, {} covered",
        run.cells.len(),
        run.aggregate.iter().filter(|(_, c)| c.average > 0.0).count()
    );
    println!();

    let report = run.report();
    report.log();
    print!("{}", report);
}

fn write_geojson(run: &CoverageRun, layer: LayerArg, path: &Path) -> Result<(), CliError> {
    let mut surface = GeoJsonSurface::new();
    draw(&run.rendered(), layer.into(), &mut surface);
    surface.write_to(path).map_err(|source| CliError::Output {
        path: path.to_path_buf(),
        source,
    })
}
