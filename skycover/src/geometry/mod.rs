//! Geometry adapter: tessellation and orbital propagation.
//!
//! The coverage core never talks to a hexagon library or an orbit model
//! directly. It goes through two small traits:
//!
//! - [`Tessellator`]: region ring + resolution → cell ids; cell id → [`Cell`]
//! - [`Propagator`]: satellite + timestamp → sub-satellite ground point
//!
//! Production implementations are [`H3Tessellator`] (H3 hexagons via `h3o`)
//! and [`Sgp4Propagator`] (SGP4 via `sgp4`). Tests substitute deterministic
//! fakes.
//!
//! # Axis Order
//!
//! Region files in the wild disagree about `(lon, lat)` vs `(lat, lon)`
//! order. [`tessellate_region`] tries the boundary as given and, if that
//! yields no cells at all, retries once with every vertex's axes swapped.

mod h3_tessellator;
mod sgp4_propagator;

pub use h3_tessellator::H3Tessellator;
pub use sgp4_propagator::Sgp4Propagator;

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::coord::GeoPoint;
use crate::satellite::SatelliteRecord;

/// Default tessellation resolution (H3 resolution 5, ~250 km² hexagons).
pub const DEFAULT_RESOLUTION: u8 = 5;

/// Errors raised by geometry backends.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("invalid tessellation resolution: {0}")]
    InvalidResolution(u8),

    #[error("invalid region geometry: {0}")]
    InvalidGeometry(String),

    #[error("propagation model error: {0}")]
    Propagation(String),
}

/// Stable identifier of a tessellation cell.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(String);

impl CellId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CellId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CellId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One tessellation unit covering part of a region.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Identifier, unique within a tessellation.
    pub id: CellId,
    /// Center of the cell; coverage is evaluated at this point.
    pub centroid: GeoPoint,
    /// Closed boundary ring (first vertex repeated at the end).
    pub boundary: Vec<GeoPoint>,
}

/// An ordered ring of vertices.
pub type Ring = Vec<GeoPoint>;

/// Outer boundary of a region.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionBoundary {
    /// A single outer ring.
    Polygon(Ring),
    /// Several disjoint outer rings.
    MultiPolygon(Vec<Ring>),
}

impl RegionBoundary {
    /// All outer rings of the boundary.
    pub fn rings(&self) -> &[Ring] {
        match self {
            RegionBoundary::Polygon(ring) => std::slice::from_ref(ring),
            RegionBoundary::MultiPolygon(rings) => rings,
        }
    }

    /// Returns true if there are no rings or every ring is empty.
    pub fn is_empty(&self) -> bool {
        self.rings().iter().all(|r| r.is_empty())
    }
}

/// Converts region rings to cells and cells to geometry.
///
/// Implementations read vertices as `GeoPoint { lat, lon }`; they must not
/// attempt to guess the axis order themselves.
pub trait Tessellator: Send + Sync {
    /// Ids of all cells whose centroid lies inside the closed `ring`.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError` if the ring or resolution is rejected by the
    /// backend. Callers treat this as "no cells for this ring".
    fn polygon_to_cells(&self, ring: &[GeoPoint], resolution: u8)
        -> Result<Vec<CellId>, GeometryError>;

    /// Centroid and boundary for a cell id, or `None` if the id is unknown.
    fn cell(&self, id: &CellId) -> Option<Cell>;
}

/// Computes a satellite's ground position at an instant.
pub trait Propagator: Send + Sync {
    /// Sub-satellite point at `at`, or `None` if the model cannot place the
    /// satellite (decayed, invalid elements, numerical failure).
    ///
    /// `None` is a normal outcome; the sampler skips that satellite for that
    /// instant.
    fn propagate(&self, satellite: &SatelliteRecord, at: DateTime<Utc>) -> Option<GeoPoint>;
}

/// Close a ring by repeating its first vertex if needed.
pub fn close_ring(ring: &[GeoPoint]) -> Ring {
    let mut closed = ring.to_vec();
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if first != last {
            closed.push(*first);
        }
    }
    closed
}

/// Tessellate a region into cells.
///
/// Every outer ring is closed and handed to the tessellator. Rings the
/// backend rejects are logged and skipped. Duplicate ids across rings are
/// collapsed, keeping first-seen order. If no ring produces any cell, the
/// whole boundary is retried with swapped axes.
pub fn tessellate_region(
    tessellator: &dyn Tessellator,
    boundary: &RegionBoundary,
    resolution: u8,
) -> Vec<Cell> {
    let mut ids = cells_for_rings(tessellator, boundary.rings(), resolution, false);

    if ids.is_empty() {
        warn!("No cells found with boundary as given, retrying with swapped axes");
        ids = cells_for_rings(tessellator, boundary.rings(), resolution, true);
    }

    let cells: Vec<Cell> = ids
        .iter()
        .filter_map(|id| {
            let cell = tessellator.cell(id);
            if cell.is_none() {
                warn!(cell = %id, "Tessellator returned an id it cannot describe");
            }
            cell
        })
        .collect();

    info!(
        cells = cells.len(),
        resolution = resolution,
        "Region tessellated"
    );
    cells
}

fn cells_for_rings(
    tessellator: &dyn Tessellator,
    rings: &[Ring],
    resolution: u8,
    swap_axes: bool,
) -> Vec<CellId> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for (ring_index, ring) in rings.iter().enumerate() {
        if ring.is_empty() {
            warn!(ring = ring_index, "Skipping empty ring");
            continue;
        }

        let oriented: Ring = if swap_axes {
            ring.iter().map(GeoPoint::swapped).collect()
        } else {
            ring.clone()
        };
        let closed = close_ring(&oriented);
        if closed.len() < 4 {
            warn!(
                ring = ring_index,
                vertices = ring.len(),
                "Skipping ring with fewer than three distinct vertices"
            );
            continue;
        }

        match tessellator.polygon_to_cells(&closed, resolution) {
            Ok(ring_ids) => {
                debug!(ring = ring_index, cells = ring_ids.len(), swap_axes, "Ring tessellated");
                for id in ring_ids {
                    if seen.insert(id.clone()) {
                        ids.push(id);
                    }
                }
            }
            Err(e) => {
                warn!(ring = ring_index, error = %e, swap_axes, "Tessellation of ring failed");
            }
        }
    }

    ids
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Grid tessellator over whole-degree squares.
    ///
    /// Only accepts rings whose vertices are valid `(lat, lon)` within the
    /// configured latitude limit; anything else yields no cells, which mimics
    /// a real backend receiving swapped axes for a region far from the equator.
    pub struct GridTessellator {
        pub max_abs_lat: f64,
    }

    impl GridTessellator {
        pub fn cell_id(lat: i32, lon: i32) -> CellId {
            CellId::new(format!("g:{}:{}", lat, lon))
        }
    }

    impl Tessellator for GridTessellator {
        fn polygon_to_cells(
            &self,
            ring: &[GeoPoint],
            resolution: u8,
        ) -> Result<Vec<CellId>, GeometryError> {
            if resolution > 15 {
                return Err(GeometryError::InvalidResolution(resolution));
            }
            if ring.iter().any(|p| p.lat.abs() > self.max_abs_lat) {
                return Ok(Vec::new());
            }
            let min_lat = ring.iter().map(|p| p.lat).fold(f64::INFINITY, f64::min);
            let max_lat = ring.iter().map(|p| p.lat).fold(f64::NEG_INFINITY, f64::max);
            let min_lon = ring.iter().map(|p| p.lon).fold(f64::INFINITY, f64::min);
            let max_lon = ring.iter().map(|p| p.lon).fold(f64::NEG_INFINITY, f64::max);

            let mut ids = Vec::new();
            for lat in min_lat.floor() as i32..max_lat.ceil() as i32 {
                for lon in min_lon.floor() as i32..max_lon.ceil() as i32 {
                    ids.push(Self::cell_id(lat, lon));
                }
            }
            Ok(ids)
        }

        fn cell(&self, id: &CellId) -> Option<Cell> {
            let mut parts = id.as_str().strip_prefix("g:")?.split(':');
            let lat: f64 = parts.next()?.parse().ok()?;
            let lon: f64 = parts.next()?.parse().ok()?;
            Some(Cell {
                id: id.clone(),
                centroid: GeoPoint::new(lat + 0.5, lon + 0.5),
                boundary: close_ring(&[
                    GeoPoint::new(lat, lon),
                    GeoPoint::new(lat + 1.0, lon),
                    GeoPoint::new(lat + 1.0, lon + 1.0),
                    GeoPoint::new(lat, lon + 1.0),
                ]),
            })
        }
    }

    /// Tessellator returning canned ids per call and recording every ring.
    struct RecordingTessellator {
        calls: parking_lot::Mutex<Vec<Ring>>,
        responses: HashMap<usize, Result<Vec<CellId>, GeometryError>>,
    }

    impl Tessellator for RecordingTessellator {
        fn polygon_to_cells(
            &self,
            ring: &[GeoPoint],
            _resolution: u8,
        ) -> Result<Vec<CellId>, GeometryError> {
            let mut calls = self.calls.lock();
            let index = calls.len();
            calls.push(ring.to_vec());
            self.responses
                .get(&index)
                .cloned()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        fn cell(&self, id: &CellId) -> Option<Cell> {
            Some(Cell {
                id: id.clone(),
                centroid: GeoPoint::new(0.0, 0.0),
                boundary: Vec::new(),
            })
        }
    }

    /// Square around Ethiopia in (lat, lon).
    fn ethiopia_ring() -> Ring {
        vec![
            GeoPoint::new(4.0, 34.0),
            GeoPoint::new(14.0, 34.0),
            GeoPoint::new(14.0, 47.0),
            GeoPoint::new(4.0, 47.0),
        ]
    }

    #[test]
    fn test_close_ring_appends_first_vertex() {
        let ring = ethiopia_ring();
        let closed = close_ring(&ring);
        assert_eq!(closed.len(), ring.len() + 1);
        assert_eq!(closed.first(), closed.last());
    }

    #[test]
    fn test_close_ring_keeps_closed_ring() {
        let closed = close_ring(&ethiopia_ring());
        assert_eq!(close_ring(&closed), closed);
    }

    #[test]
    fn test_tessellate_polygon() {
        let tessellator = GridTessellator { max_abs_lat: 20.0 };
        let boundary = RegionBoundary::Polygon(ethiopia_ring());

        let cells = tessellate_region(&tessellator, &boundary, DEFAULT_RESOLUTION);
        assert_eq!(cells.len(), 10 * 13);
        assert!(cells
            .iter()
            .any(|c| c.id == GridTessellator::cell_id(9, 38)));
    }

    #[test]
    fn test_axis_swap_retry() {
        // Boundary supplied as (lon, lat) pairs stored into lat/lon slots:
        // latitudes of 34..47 exceed the grid's limit, so the first attempt
        // is empty and the swapped retry succeeds.
        let tessellator = GridTessellator { max_abs_lat: 20.0 };
        let swapped: Ring = ethiopia_ring().iter().map(GeoPoint::swapped).collect();
        let boundary = RegionBoundary::Polygon(swapped);

        let cells = tessellate_region(&tessellator, &boundary, DEFAULT_RESOLUTION);
        assert_eq!(cells.len(), 10 * 13);
    }

    #[test]
    fn test_retry_only_when_first_attempt_empty() {
        let mut responses = HashMap::new();
        responses.insert(0, Ok(vec![CellId::from("a"), CellId::from("b")]));
        let tessellator = RecordingTessellator {
            calls: parking_lot::Mutex::new(Vec::new()),
            responses,
        };

        let cells = tessellate_region(
            &tessellator,
            &RegionBoundary::Polygon(ethiopia_ring()),
            DEFAULT_RESOLUTION,
        );
        assert_eq!(cells.len(), 2);
        assert_eq!(tessellator.calls.lock().len(), 1);
    }

    #[test]
    fn test_retry_passes_swapped_closed_ring() {
        let mut responses = HashMap::new();
        responses.insert(1, Ok(vec![CellId::from("x")]));
        let tessellator = RecordingTessellator {
            calls: parking_lot::Mutex::new(Vec::new()),
            responses,
        };

        let ring = ethiopia_ring();
        let cells = tessellate_region(
            &tessellator,
            &RegionBoundary::Polygon(ring.clone()),
            DEFAULT_RESOLUTION,
        );
        assert_eq!(cells.len(), 1);

        let calls = tessellator.calls.lock();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1][0], ring[0].swapped());
        assert_eq!(calls[1].first(), calls[1].last());
    }

    #[test]
    fn test_multipolygon_deduplicates_ids() {
        let mut responses = HashMap::new();
        responses.insert(0, Ok(vec![CellId::from("a"), CellId::from("b")]));
        responses.insert(1, Ok(vec![CellId::from("b"), CellId::from("c")]));
        let tessellator = RecordingTessellator {
            calls: parking_lot::Mutex::new(Vec::new()),
            responses,
        };

        let boundary = RegionBoundary::MultiPolygon(vec![ethiopia_ring(), ethiopia_ring()]);
        let cells = tessellate_region(&tessellator, &boundary, DEFAULT_RESOLUTION);
        let ids: Vec<&str> = cells.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_failing_ring_is_skipped() {
        let mut responses = HashMap::new();
        responses.insert(
            0,
            Err(GeometryError::InvalidGeometry("self-intersecting".to_string())),
        );
        responses.insert(1, Ok(vec![CellId::from("z")]));
        let tessellator = RecordingTessellator {
            calls: parking_lot::Mutex::new(Vec::new()),
            responses,
        };

        let boundary = RegionBoundary::MultiPolygon(vec![ethiopia_ring(), ethiopia_ring()]);
        let cells = tessellate_region(&tessellator, &boundary, DEFAULT_RESOLUTION);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].id.as_str(), "z");
    }

    #[test]
    fn test_degenerate_ring_is_skipped() {
        let tessellator = GridTessellator { max_abs_lat: 20.0 };
        let boundary = RegionBoundary::Polygon(vec![
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(2.0, 2.0),
        ]);
        assert!(tessellate_region(&tessellator, &boundary, DEFAULT_RESOLUTION).is_empty());
    }

    #[test]
    fn test_empty_boundary() {
        let boundary = RegionBoundary::MultiPolygon(Vec::new());
        assert!(boundary.is_empty());
        let tessellator = GridTessellator { max_abs_lat: 90.0 };
        assert!(tessellate_region(&tessellator, &boundary, DEFAULT_RESOLUTION).is_empty());
    }
}
