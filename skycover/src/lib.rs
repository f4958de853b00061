//! SkyCover - Constellation coverage estimation for geographic regions
//!
//! This library estimates how well a satellite constellation covers a region
//! over a time horizon. The region is tessellated into cells, every active
//! satellite is propagated at each hourly sample, and per-cell hit counts are
//! reduced into an average visibility count and a stability score.
//!
//! # Pipeline
//!
//! ```text
//! Region ──► geometry::tessellate_region ──► Vec<Cell>
//!                                               │
//! SatelliteCatalog ──► Vec<SatelliteRecord> ────┤
//!                                               ▼
//!                          coverage::CoverageSampler (time × satellites × cells)
//!                                               │
//!                                               ▼
//!                          coverage::aggregate ──► Aggregate
//!                                               │
//!                     cache::CoverageCacheClient ◄──┴──► render::render
//! ```
//!
//! The [`engine::CoverageEngine`] wires these stages together and serves
//! cached aggregates while they are fresh.

pub mod cache;
pub mod clock;
pub mod config;
pub mod coord;
pub mod coverage;
pub mod engine;
pub mod geometry;
pub mod logging;
pub mod region;
pub mod render;
pub mod satellite;

/// Library version, embedded in cache entries and exports.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
