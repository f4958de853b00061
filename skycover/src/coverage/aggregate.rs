//! Reduction of hit counts into per-cell coverage statistics.
//!
//! For each cell:
//!
//! ```text
//! average   = total / horizon_len
//! variance  = Σ (hits[i] − average)² / per_sample.len()
//! stability = 1 / (variance + 1)
//! ```
//!
//! Stability is 1 for perfectly steady coverage and approaches 0 as the
//! per-sample counts swing further from the average.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::accumulator::CoverageAccumulator;
use crate::geometry::CellId;

/// Coverage statistics for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellCoverage {
    /// Mean number of covering satellites per sample. Never negative.
    pub average: f64,
    /// Temporal stability in `(0, 1]`.
    pub stability: f64,
}

impl CellCoverage {
    /// Statistics of a cell that was never covered.
    pub const UNCOVERED: CellCoverage = CellCoverage {
        average: 0.0,
        stability: 1.0,
    };

    /// Average scaled by stability.
    pub fn weighted(&self) -> f64 {
        self.average * self.stability
    }
}

/// Coverage statistics for every cell of a region.
///
/// Ordered by cell id so serialized output is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Aggregate {
    cells: BTreeMap<CellId, CellCoverage>,
}

impl Aggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: CellId, coverage: CellCoverage) {
        self.cells.insert(id, coverage);
    }

    pub fn get(&self, id: &CellId) -> Option<&CellCoverage> {
        self.cells.get(id)
    }

    /// Statistics for `id`, or [`CellCoverage::UNCOVERED`] if absent.
    pub fn get_or_uncovered(&self, id: &CellId) -> CellCoverage {
        self.cells.get(id).copied().unwrap_or(CellCoverage::UNCOVERED)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellId, &CellCoverage)> {
        self.cells.iter()
    }
}

impl FromIterator<(CellId, CellCoverage)> for Aggregate {
    fn from_iter<T: IntoIterator<Item = (CellId, CellCoverage)>>(iter: T) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

/// Reduce `accumulator` into statistics for every id in `cells`.
///
/// Cells the accumulator never saw get [`CellCoverage::UNCOVERED`]. A zero
/// `horizon_len` makes every cell uncovered.
pub fn aggregate(
    accumulator: &CoverageAccumulator,
    cells: &[CellId],
    horizon_len: usize,
) -> Aggregate {
    cells
        .iter()
        .map(|id| {
            let coverage = match accumulator.get(id) {
                Some(hits) if horizon_len > 0 => {
                    let average = hits.total as f64 / horizon_len as f64;
                    let variance = population_variance(&hits.per_sample, average);
                    CellCoverage {
                        average,
                        stability: 1.0 / (variance + 1.0),
                    }
                }
                _ => CellCoverage::UNCOVERED,
            };
            (id.clone(), coverage)
        })
        .collect()
}

/// Mean squared deviation of `values` from `mean`.
///
/// `mean` is supplied by the caller rather than recomputed. Empty input
/// yields 0.
pub fn population_variance(values: &[u32], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values
        .iter()
        .map(|&v| {
            let d = f64::from(v) - mean;
            d * d
        })
        .sum();
    sum / values.len() as f64
}
