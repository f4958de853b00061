//! Analyze command - summarize a coverage export document.

use std::path::PathBuf;

use skycover::coverage::{CoverageExport, ExportError};
use skycover::render::{CoverageReport, RenderMode};

use super::common::{print_legend, print_top_cells};
use crate::error::CliError;

/// Arguments for the analyze command.
pub struct AnalyzeArgs {
    pub input: PathBuf,
    pub top: usize,
    pub preview: bool,
}

/// Run the analyze command.
pub fn run(args: AnalyzeArgs) -> Result<(), CliError> {
    let text = std::fs::read_to_string(&args.input).map_err(ExportError::Io)?;
    let export = CoverageExport::from_json(&text)?;
    let mode = if args.preview {
        RenderMode::Preview
    } else {
        RenderMode::Full
    };

    println!("{} ({} cells)", args.input.display(), export.coverage_map.len());
    println!();
    print!("{}", CoverageReport::from_aggregate(&export.to_aggregate()));
    println!();
    print_legend(&mode.scale());

    if args.top > 0 {
        println!();
        println!("Top {} cells by weighted score", args.top);
        print_top_cells(&export.top_weighted(args.top));
    }
    Ok(())
}
