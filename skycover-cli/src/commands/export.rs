//! Export command - write cached coverage as a JSON export document.

use std::path::PathBuf;

use skycover::clock::{Clock, SystemClock};
use skycover::coverage::CoverageExport;
use tracing::warn;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the export command.
pub struct ExportArgs {
    pub region_id: Option<String>,
    pub output: PathBuf,
    pub allow_stale: bool,
    pub verbose: bool,
}

/// Run the export command.
pub fn run(args: ExportArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.verbose)?;
    runner.log_startup("export");

    let region_id = args
        .region_id
        .unwrap_or_else(|| runner.config().coverage.region_id.clone());
    let client = runner.cache_client()?;

    let entry = runner
        .runtime()
        .block_on(client.entry(&region_id))
        .ok_or_else(|| CliError::NoCachedCoverage(region_id.clone()))?;

    let now_ms = SystemClock.now_millis();
    if !entry.is_fresh(now_ms, client.freshness_window_ms()) {
        if !args.allow_stale {
            return Err(CliError::NoCachedCoverage(region_id));
        }
        warn!(region = %region_id, age_ms = entry.age_ms(now_ms), "Exporting stale coverage");
    }

    CoverageExport::from(&entry.aggregate).write_to(&args.output)?;
    println!(
        "Exported {} cells for '{}' to {}",
        entry.aggregate.len(),
        region_id,
        args.output.display()
    );
    Ok(())
}
