//! Coverage sampling: time × satellites × cells.
//!
//! For every time sample the sampler propagates each satellite to its ground
//! point and counts, per cell, how many satellites have the cell centroid
//! within their footprint. Samples are independent, so they run in parallel
//! on the rayon pool; each produces a [`SampleHits`] vector that is folded
//! into the [`CoverageAccumulator`] afterwards in sample order.
//!
//! Candidate cells for a ground point come from a latitude-sorted
//! [`CentroidIndex`], narrowed by a [`FootprintBounds`] box before the
//! haversine test.

use std::sync::Arc;

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::accumulator::{CoverageAccumulator, SampleHits};
use super::horizon::{Horizon, TimeSample};
use super::CoverageError;
use crate::coord::{haversine_km, FootprintBounds, GeoPoint};
use crate::geometry::{Cell, CellId, Propagator};
use crate::satellite::SatelliteRecord;

/// Default footprint radius around the sub-satellite point (km).
pub const DEFAULT_FOOTPRINT_RADIUS_KM: f64 = 600.0;

/// Sampler settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerConfig {
    /// A cell is covered when its centroid lies within this distance of the
    /// ground point.
    pub footprint_radius_km: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            footprint_radius_km: DEFAULT_FOOTPRINT_RADIUS_KM,
        }
    }
}

impl SamplerConfig {
    pub fn with_footprint_radius_km(mut self, radius_km: f64) -> Self {
        self.footprint_radius_km = radius_km;
        self
    }
}

/// Cell centroids sorted by latitude.
pub struct CentroidIndex {
    /// `(latitude, position in the cell list)`, ascending by latitude.
    by_lat: Vec<(f64, usize)>,
    centroids: Vec<GeoPoint>,
}

impl CentroidIndex {
    /// Index the centroids of `cells`. Non-finite centroids are left out.
    pub fn new(cells: &[Cell]) -> Self {
        let centroids: Vec<GeoPoint> = cells.iter().map(|c| c.centroid).collect();
        let mut by_lat: Vec<(f64, usize)> = centroids
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_finite())
            .map(|(i, p)| (p.lat, i))
            .collect();
        by_lat.sort_by(|a, b| a.0.total_cmp(&b.0));

        Self { by_lat, centroids }
    }

    pub fn len(&self) -> usize {
        self.by_lat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_lat.is_empty()
    }

    /// Positions of cells whose centroid is within `radius_km` of `center`.
    pub fn within<'a>(
        &'a self,
        center: &'a GeoPoint,
        radius_km: f64,
    ) -> impl Iterator<Item = usize> + 'a {
        let bounds = FootprintBounds::around(center, radius_km);
        let lo = self.by_lat.partition_point(|(lat, _)| *lat < bounds.min_lat());
        let hi = self.by_lat.partition_point(|(lat, _)| *lat <= bounds.max_lat());
        let band = self.by_lat.get(lo..hi).unwrap_or(&[]);

        band.iter().filter_map(move |&(_, i)| {
            let centroid = &self.centroids[i];
            (bounds.contains(centroid) && haversine_km(center, centroid) <= radius_km)
                .then_some(i)
        })
    }
}

/// Computes hit counts for a set of cells over a horizon.
pub struct CoverageSampler {
    propagator: Arc<dyn Propagator>,
    config: SamplerConfig,
}

impl CoverageSampler {
    pub fn new(propagator: Arc<dyn Propagator>) -> Self {
        Self::with_config(propagator, SamplerConfig::default())
    }

    pub fn with_config(propagator: Arc<dyn Propagator>, config: SamplerConfig) -> Self {
        Self { propagator, config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Sample every instant of `horizon`.
    ///
    /// Satellites the propagator cannot place at an instant are skipped for
    /// that instant. Empty `cells` or `satellites` yield an empty
    /// accumulator.
    ///
    /// # Errors
    ///
    /// Returns [`CoverageError::Cancelled`] if `cancel` fires; the token is
    /// checked before each sample.
    pub fn sample(
        &self,
        cells: &[Cell],
        satellites: &[SatelliteRecord],
        horizon: &Horizon,
        cancel: &CancellationToken,
    ) -> Result<CoverageAccumulator, CoverageError> {
        let accumulator = CoverageAccumulator::new(horizon.len());
        if cells.is_empty() || satellites.is_empty() || horizon.is_empty() {
            debug!(
                cells = cells.len(),
                satellites = satellites.len(),
                samples = horizon.len(),
                "Nothing to sample"
            );
            return Ok(accumulator);
        }

        let ids: Vec<CellId> = cells.iter().map(|c| c.id.clone()).collect();
        let index = CentroidIndex::new(cells);
        let samples: Vec<TimeSample> = horizon.samples().collect();

        let partials = samples
            .par_iter()
            .map(|sample| {
                if cancel.is_cancelled() {
                    return Err(CoverageError::Cancelled {
                        sample: sample.index,
                    });
                }
                Ok(self.sample_instant(&index, satellites, sample))
            })
            .collect::<Result<Vec<SampleHits>, CoverageError>>()?;

        let accumulator = partials
            .iter()
            .fold(accumulator, |acc, partial| acc.record_sample(&ids, partial));

        debug!(
            cells = cells.len(),
            satellites = satellites.len(),
            samples = samples.len(),
            covered_cells = accumulator.len(),
            "Coverage sampled"
        );
        Ok(accumulator)
    }

    fn sample_instant(
        &self,
        index: &CentroidIndex,
        satellites: &[SatelliteRecord],
        sample: &TimeSample,
    ) -> SampleHits {
        let mut counts = vec![0u32; index.centroids.len()];
        let mut placed = 0usize;

        for satellite in satellites {
            let Some(ground) = self.propagator.propagate(satellite, sample.timestamp) else {
                continue;
            };
            placed += 1;
            for i in index.within(&ground, self.config.footprint_radius_km) {
                counts[i] += 1;
            }
        }

        trace!(
            sample = sample.index,
            placed,
            skipped = satellites.len() - placed,
            "Sampled instant"
        );
        SampleHits {
            index: sample.index,
            counts,
        }
    }
}
