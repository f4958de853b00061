//! Common types and utilities shared across CLI commands.

use clap::ValueEnum;
use skycover::coverage::CellCoverage;
use skycover::geometry::CellId;
use skycover::render::{ColorScale, Layer};
use tokio_util::sync::CancellationToken;

use crate::error::CliError;

/// Map layer selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum LayerArg {
    /// Color by weighted coverage score
    Coverage,
    /// Color by stability score
    Stability,
}

impl From<LayerArg> for Layer {
    fn from(arg: LayerArg) -> Self {
        match arg {
            LayerArg::Coverage => Layer::Coverage,
            LayerArg::Stability => Layer::Stability,
        }
    }
}

/// Cancel `token` on Ctrl+C.
pub fn cancel_on_interrupt(token: CancellationToken) -> Result<(), CliError> {
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received interrupt, stopping after the current sample...");
        token.cancel();
    })
    .map_err(|e| CliError::Runtime(format!("Failed to set signal handler: {}", e)))
}

/// Print a ranked table of cells.
pub fn print_top_cells(cells: &[(CellId, CellCoverage)]) {
    if cells.is_empty() {
        return;
    }
    println!("{:<4} {:<18} {:>9} {:>10} {:>9}", "#", "Cell", "Average", "Stability", "Weighted");
    for (rank, (id, coverage)) in cells.iter().enumerate() {
        println!(
            "{:<4} {:<18} {:>9.2} {:>10.4} {:>9.2}",
            rank + 1,
            id,
            coverage.average,
            coverage.stability,
            coverage.weighted()
        );
    }
}

/// Print the thresholds of a color scale, highest first.
pub fn print_legend(scale: &ColorScale) {
    println!("Legend (weighted score)");
    for (threshold, color) in scale.steps() {
        println!("  >= {:<5} {}", threshold, color);
    }
    println!("  below   {}", scale.fallback());
}
