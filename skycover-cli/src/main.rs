//! SkyCover CLI - Command-line interface
//!
//! Estimates satellite constellation coverage over a region and manages the
//! coverage cache and configuration.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::analyze::AnalyzeArgs;
use commands::cache::CacheAction;
use commands::common::LayerArg;
use commands::config::ConfigCommands;
use commands::export::ExportArgs;
use commands::run::RunArgs;

#[derive(Debug, Parser)]
#[command(name = "skycover", version, about = "Satellite constellation coverage estimation")]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Estimate coverage for a region (served from cache while fresh)
    Run {
        /// GeoJSON file with the region boundary
        region: PathBuf,

        /// Cache key for the region [default: region file name]
        #[arg(long)]
        region_id: Option<String>,

        /// Lowest satellite inclination in degrees
        #[arg(long)]
        inclination_min: Option<f64>,

        /// Highest satellite inclination in degrees
        #[arg(long)]
        inclination_max: Option<f64>,

        /// Use the preview satellite cap and color scale
        #[arg(long)]
        preview: bool,

        /// Start the horizon this many minutes from now
        #[arg(long)]
        minutes_from_now: Option<i64>,

        /// Tessellation resolution (0-15)
        #[arg(long)]
        resolution: Option<u8>,

        /// Satellite footprint radius in km
        #[arg(long)]
        footprint_km: Option<f64>,

        /// Number of horizon samples
        #[arg(long)]
        steps: Option<usize>,

        /// Minutes between horizon samples
        #[arg(long)]
        step_minutes: Option<i64>,

        /// Ignore any cached result and recompute
        #[arg(long)]
        refresh: bool,

        /// Write the coverage export document to this file
        #[arg(long)]
        export: Option<PathBuf>,

        /// Write rendered cells as GeoJSON to this file
        #[arg(long)]
        geojson: Option<PathBuf>,

        /// Layer to color in the GeoJSON output
        #[arg(long, value_enum, default_value = "coverage")]
        layer: LayerArg,

        /// Print the N best cells by weighted score
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Write the cached coverage of a region as a JSON export document
    Export {
        /// Region cache key [default: coverage.region_id from config]
        #[arg(long)]
        region_id: Option<String>,

        /// Output file
        #[arg(short, long, default_value = skycover::coverage::DEFAULT_EXPORT_FILE)]
        output: PathBuf,

        /// Export even if the cached entry is older than the freshness window
        #[arg(long)]
        allow_stale: bool,
    },

    /// Summarize an export document
    Analyze {
        /// Export document to read
        #[arg(default_value = skycover::coverage::DEFAULT_EXPORT_FILE)]
        input: PathBuf,

        /// Number of top cells by weighted score to list
        #[arg(long, default_value = "20")]
        top: usize,

        /// Color scale for the legend
        #[arg(long)]
        preview: bool,
    },

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Inspect and maintain the coverage cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            region,
            region_id,
            inclination_min,
            inclination_max,
            preview,
            minutes_from_now,
            resolution,
            footprint_km,
            steps,
            step_minutes,
            refresh,
            export,
            geojson,
            layer,
            top,
        } => commands::run::run(RunArgs {
            region,
            region_id,
            inclination_min,
            inclination_max,
            preview,
            minutes_from_now,
            resolution,
            footprint_km,
            steps,
            step_minutes,
            refresh,
            export,
            geojson,
            layer,
            top,
            verbose: cli.verbose,
        }),
        Commands::Export {
            region_id,
            output,
            allow_stale,
        } => commands::export::run(ExportArgs {
            region_id,
            output,
            allow_stale,
            verbose: cli.verbose,
        }),
        Commands::Analyze { input, top, preview } => {
            commands::analyze::run(AnalyzeArgs { input, top, preview })
        }
        Commands::Config { command } => commands::config::run(command),
        Commands::Cache { action } => commands::cache::run(action, cli.verbose),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "skycover",
            "run",
            "ethiopia.geojson",
            "--preview",
            "--inclination-min",
            "50",
            "--steps",
            "6",
            "--layer",
            "stability",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                region,
                preview,
                inclination_min,
                steps,
                layer,
                ..
            } => {
                assert_eq!(region, PathBuf::from("ethiopia.geojson"));
                assert!(preview);
                assert_eq!(inclination_min, Some(50.0));
                assert_eq!(steps, Some(6));
                assert_eq!(layer, LayerArg::Stability);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_export_defaults_to_standard_file_name() {
        let cli = Cli::try_parse_from(["skycover", "export"]).unwrap();
        match cli.command {
            Commands::Export { output, allow_stale, .. } => {
                assert_eq!(output, PathBuf::from("coverage_data.json"));
                assert!(!allow_stale);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
