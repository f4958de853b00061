//! Per-cell hit counts across a horizon.

use std::collections::HashMap;

use crate::geometry::CellId;

/// Hits recorded for one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellHits {
    /// Sum of `per_sample`.
    pub total: u64,
    /// Satellites covering the cell at each sample; length equals the
    /// horizon length.
    pub per_sample: Vec<u32>,
}

impl CellHits {
    fn new(horizon_len: usize) -> Self {
        Self {
            total: 0,
            per_sample: vec![0; horizon_len],
        }
    }
}

/// Hit counts produced by one time sample.
///
/// `counts[i]` belongs to the `i`-th cell id the sampler was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleHits {
    pub index: usize,
    pub counts: Vec<u32>,
}

/// Mapping from cell id to its hit history.
///
/// Only cells hit at least once have an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageAccumulator {
    horizon_len: usize,
    cells: HashMap<CellId, CellHits>,
}

impl CoverageAccumulator {
    pub fn new(horizon_len: usize) -> Self {
        Self {
            horizon_len,
            cells: HashMap::new(),
        }
    }

    pub fn horizon_len(&self) -> usize {
        self.horizon_len
    }

    /// Record `count` satellites over `cell` at `sample_index`.
    ///
    /// Zero counts and indices outside the horizon are ignored.
    pub fn record_hits(&mut self, cell: &CellId, sample_index: usize, count: u32) {
        if count == 0 || sample_index >= self.horizon_len {
            return;
        }
        let horizon_len = self.horizon_len;
        let hits = self
            .cells
            .entry(cell.clone())
            .or_insert_with(|| CellHits::new(horizon_len));
        hits.per_sample[sample_index] += count;
        hits.total += u64::from(count);
    }

    /// Fold one sample's counts into the accumulator.
    ///
    /// `ids` must be the cell list the sample was computed against.
    pub fn record_sample(mut self, ids: &[CellId], sample: &SampleHits) -> Self {
        for (id, &count) in ids.iter().zip(&sample.counts) {
            self.record_hits(id, sample.index, count);
        }
        self
    }

    /// Combine two accumulators over the same horizon.
    pub fn merge(mut self, other: CoverageAccumulator) -> Self {
        for (id, hits) in other.cells {
            for (index, &count) in hits.per_sample.iter().enumerate() {
                self.record_hits(&id, index, count);
            }
        }
        self
    }

    pub fn get(&self, cell: &CellId) -> Option<&CellHits> {
        self.cells.get(cell)
    }

    /// Number of cells hit at least once.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellId, &CellHits)> {
        self.cells.iter()
    }
}
