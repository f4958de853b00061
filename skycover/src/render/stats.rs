//! Descriptive statistics over rendered scores.

use std::fmt;

use tracing::{info, warn};

use super::RenderedCell;
use crate::coverage::Aggregate;

/// Summary of a list of values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescriptiveStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Middle value; mean of the two middle values for even counts.
    pub median: f64,
    /// Most frequent value; the smallest one on ties.
    pub mode: f64,
    pub mode_count: usize,
}

impl DescriptiveStats {
    /// Statistics of `values`, or `None` when there are no finite values.
    ///
    /// Non-finite values are ignored.
    pub fn compute(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        // Sorted input makes equal values adjacent; only a strictly longer
        // run replaces the current mode.
        let mut mode = sorted[0];
        let mut mode_count = 0;
        let mut run_start = 0;
        for i in 1..=n {
            if i == n || sorted[i] != sorted[run_start] {
                let run = i - run_start;
                if run > mode_count {
                    mode = sorted[run_start];
                    mode_count = run;
                }
                run_start = i;
            }
        }

        Some(Self {
            count: n,
            min: sorted[0],
            max: sorted[n - 1],
            mean,
            median,
            mode,
            mode_count,
        })
    }

    /// Render with a fixed number of decimals.
    pub fn display(&self, decimals: usize) -> StatsDisplay<'_> {
        StatsDisplay {
            stats: self,
            decimals,
        }
    }
}

/// [`DescriptiveStats`] formatted with a chosen precision.
pub struct StatsDisplay<'a> {
    stats: &'a DescriptiveStats,
    decimals: usize,
}

impl fmt::Display for StatsDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.decimals;
        let s = self.stats;
        write!(
            f,
            "min {:.d$}, max {:.d$}, mean {:.d$}, median {:.d$}, mode {:.d$} (appears {} times)",
            s.min,
            s.max,
            s.mean,
            s.median,
            s.mode,
            s.mode_count,
            d = d
        )
    }
}

/// Statistics over one coverage render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageReport {
    pub average: Option<DescriptiveStats>,
    pub stability: Option<DescriptiveStats>,
    pub weighted: Option<DescriptiveStats>,
}

impl CoverageReport {
    const SCORE_DECIMALS: usize = 2;
    const STABILITY_DECIMALS: usize = 4;

    pub fn from_rendered(cells: &[RenderedCell]) -> Self {
        Self::from_series(cells.iter().map(|c| (c.average, c.stability, c.weighted)))
    }

    /// Statistics over every cell stored in `aggregate`.
    pub fn from_aggregate(aggregate: &Aggregate) -> Self {
        Self::from_series(
            aggregate
                .iter()
                .map(|(_, c)| (c.average, c.stability, c.weighted())),
        )
    }

    fn from_series(series: impl Iterator<Item = (f64, f64, f64)>) -> Self {
        let mut average = Vec::new();
        let mut stability = Vec::new();
        let mut weighted = Vec::new();
        for (a, s, w) in series {
            average.push(a);
            stability.push(s);
            weighted.push(w);
        }

        Self {
            average: DescriptiveStats::compute(&average),
            stability: DescriptiveStats::compute(&stability),
            weighted: DescriptiveStats::compute(&weighted),
        }
    }

    /// Log every section at info level.
    pub fn log(&self) {
        for (label, stats, decimals) in self.sections() {
            match stats {
                Some(stats) => info!(
                    label,
                    count = stats.count,
                    "{} stats: {}",
                    label,
                    stats.display(decimals)
                ),
                None => warn!(label, "No {} data to analyze", label.to_lowercase()),
            }
        }
    }

    fn sections(&self) -> [(&'static str, Option<DescriptiveStats>, usize); 3] {
        [
            ("Coverage average", self.average, Self::SCORE_DECIMALS),
            ("Stability score", self.stability, Self::STABILITY_DECIMALS),
            ("Weighted score", self.weighted, Self::SCORE_DECIMALS),
        ]
    }
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, stats, decimals) in self.sections() {
            match stats {
                Some(stats) => writeln!(f, "{}: {}", label, stats.display(decimals))?,
                None => writeln!(f, "{}: no data", label)?,
            }
        }
        Ok(())
    }
}
