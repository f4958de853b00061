//! Cache management CLI commands.

use clap::Subcommand;
use skycover::cache::{Cache, CacheEntry};
use skycover::clock::{timestamp_from_millis, Clock, SystemClock};
use skycover::config::format_size;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show coverage cache statistics
    Stats,
    /// Show the cached entry for a region
    Show {
        /// Region cache key
        region_id: String,
    },
    /// Remove the cached entry for a region
    Invalidate {
        /// Region cache key
        region_id: String,
    },
    /// Remove leftover temp files and evict entries over the size budget
    Gc,
    /// Remove every cached entry
    Clear,
}

/// Run a cache subcommand.
pub fn run(action: CacheAction, verbose: bool) -> Result<(), CliError> {
    let runner = CliRunner::new(verbose)?;
    let rt = runner.runtime();

    match action {
        CacheAction::Stats => {
            let store = runner.open_store()?;
            println!("Coverage cache: {}", store.root().display());
            println!("  Entries: {}", store.entry_count());
            println!(
                "  Size:    {} of {}",
                format_size(store.size_bytes()),
                format_size(store.max_size_bytes())
            );
        }
        CacheAction::Show { region_id } => {
            let client = runner.cache_client()?;
            let entry = rt
                .block_on(client.entry(&region_id))
                .ok_or_else(|| CliError::NoCachedCoverage(region_id.clone()))?;
            print_entry(&entry, client.freshness_window_ms());
        }
        CacheAction::Invalidate { region_id } => {
            let client = runner.cache_client()?;
            if rt.block_on(client.invalidate(&region_id)) {
                println!("Removed cached coverage for '{}'", region_id);
            } else {
                println!("No cached coverage for '{}'", region_id);
            }
        }
        CacheAction::Gc => {
            let store = runner.open_store()?;
            let result = rt.block_on(store.gc())?;
            println!(
                "Removed {} files, freed {}",
                result.entries_removed,
                format_size(result.bytes_freed)
            );
        }
        CacheAction::Clear => {
            let store = runner.open_store()?;
            println!("Clearing coverage cache at: {}", store.root().display());
            let result = rt.block_on(store.clear())?;
            println!(
                "Deleted {} files, freed {}",
                result.entries_removed,
                format_size(result.bytes_freed)
            );
        }
    }
    Ok(())
}

fn print_entry(entry: &CacheEntry, window_ms: i64) {
    let now_ms = SystemClock.now_millis();
    let age_min = entry.age_ms(now_ms) / 60_000;
    let state = if entry.is_fresh(now_ms, window_ms) {
        "fresh"
    } else {
        "stale"
    };

    println!("Region:  {}", entry.region_key);
    println!("Cells:   {}", entry.aggregate.len());
    println!("Age:     {} min ({})", age_min, state);
    if let Some(stored) = timestamp_from_millis(entry.timestamp_ms) {
        println!("Stored:  {}", stored.to_rfc3339());
    }
}
