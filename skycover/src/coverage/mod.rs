//! Coverage estimation core.
//!
//! A run turns a region's cells, a satellite list, and a time horizon into
//! per-cell statistics:
//!
//! ```text
//! Horizon ──► CoverageSampler ──► CoverageAccumulator ──► aggregate() ──► Aggregate
//!               (rayon, per sample)    (cell → hits per sample)           (cell → avg, stability)
//! ```
//!
//! # Modules
//!
//! - [`horizon`]: the sampled instants
//! - [`sampler`]: footprint hit counting
//! - [`accumulator`]: hit storage and merging
//! - [`aggregate`]: average and stability reduction
//! - [`export`]: JSON export document

pub mod accumulator;
pub mod aggregate;
pub mod export;
pub mod horizon;
pub mod sampler;

pub use accumulator::{CellHits, CoverageAccumulator, SampleHits};
pub use aggregate::{aggregate, population_variance, Aggregate, CellCoverage};
pub use export::{CoverageExport, ExportError, DEFAULT_EXPORT_FILE};
pub use horizon::{Horizon, TimeSample, DEFAULT_STEPS, DEFAULT_STEP_MINUTES};
pub use sampler::{CentroidIndex, CoverageSampler, SamplerConfig, DEFAULT_FOOTPRINT_RADIUS_KM};

use thiserror::Error;

/// Errors that end a coverage run early.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoverageError {
    /// The run's cancellation token fired.
    #[error("coverage run cancelled before sample {sample}")]
    Cancelled { sample: usize },

    /// The blocking sampling task failed.
    #[error("sampling worker failed: {0}")]
    Worker(String),
}
