//! JSON export of a coverage aggregate.
//!
//! The export document keeps averages and stabilities in two parallel maps:
//!
//! ```json
//! {
//!   "coverageMap": { "85283473fffffff": 1.25 },
//!   "coverageStability": { "85283473fffffff": 0.8421 }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::aggregate::{Aggregate, CellCoverage};
use crate::geometry::CellId;

/// Default export file name.
pub const DEFAULT_EXPORT_FILE: &str = "coverage_data.json";

/// Errors writing or reading an export document.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Exportable form of an [`Aggregate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageExport {
    pub coverage_map: BTreeMap<CellId, f64>,
    pub coverage_stability: BTreeMap<CellId, f64>,
}

impl From<&Aggregate> for CoverageExport {
    fn from(aggregate: &Aggregate) -> Self {
        let mut export = CoverageExport::default();
        for (id, coverage) in aggregate.iter() {
            export.coverage_map.insert(id.clone(), coverage.average);
            export
                .coverage_stability
                .insert(id.clone(), coverage.stability);
        }
        export
    }
}

impl CoverageExport {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write pretty-printed JSON to `path`, replacing any existing file.
    pub fn write_to(&self, path: &Path) -> Result<(), ExportError> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        info!(path = %path.display(), cells = self.coverage_map.len(), "Coverage exported");
        Ok(())
    }

    /// Rebuild the aggregate. Cells missing a stability value get 1.
    pub fn to_aggregate(&self) -> Aggregate {
        self.coverage_map
            .iter()
            .map(|(id, &average)| (id.clone(), self.coverage_of(id, average)))
            .collect()
    }

    /// The `n` cells with the highest weighted score, best first.
    ///
    /// Ties are broken by cell id so the ranking is deterministic.
    pub fn top_weighted(&self, n: usize) -> Vec<(CellId, CellCoverage)> {
        let mut ranked: Vec<(CellId, CellCoverage)> = self
            .coverage_map
            .iter()
            .map(|(id, &average)| (id.clone(), self.coverage_of(id, average)))
            .collect();
        ranked.sort_by(|(a_id, a), (b_id, b)| {
            b.weighted()
                .total_cmp(&a.weighted())
                .then_with(|| a_id.cmp(b_id))
        });
        ranked.truncate(n);
        ranked
    }

    fn coverage_of(&self, id: &CellId, average: f64) -> CellCoverage {
        CellCoverage {
            average,
            stability: self.coverage_stability.get(id).copied().unwrap_or(1.0),
        }
    }
}
