//! H3 hexagon tessellation backed by `h3o`.

use geo::{LineString, Polygon};
use h3o::geom::{ContainmentMode, TilerBuilder};
use h3o::{CellIndex, LatLng, Resolution};

use super::{close_ring, Cell, CellId, GeometryError, Tessellator};
use crate::coord::GeoPoint;

/// Tessellator producing H3 cells.
///
/// A cell belongs to a ring when its centroid lies inside the ring, matching
/// the classic H3 polyfill behavior. Cell ids are the lowercase hex form of
/// the H3 index, so they are stable across runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct H3Tessellator;

impl H3Tessellator {
    pub fn new() -> Self {
        Self
    }
}

impl Tessellator for H3Tessellator {
    fn polygon_to_cells(
        &self,
        ring: &[GeoPoint],
        resolution: u8,
    ) -> Result<Vec<CellId>, GeometryError> {
        let resolution = Resolution::try_from(resolution)
            .map_err(|_| GeometryError::InvalidResolution(resolution))?;

        // geo uses (x, y) = (lon, lat)
        let exterior: LineString<f64> = ring
            .iter()
            .map(|p| (p.lon, p.lat))
            .collect::<Vec<_>>()
            .into();
        let polygon = Polygon::new(exterior, Vec::new());

        let mut tiler = TilerBuilder::new(resolution)
            .containment_mode(ContainmentMode::ContainsCentroid)
            .build();
        tiler
            .add(polygon)
            .map_err(|e| GeometryError::InvalidGeometry(e.to_string()))?;

        Ok(tiler
            .into_coverage()
            .map(|cell| CellId::new(cell.to_string()))
            .collect())
    }

    fn cell(&self, id: &CellId) -> Option<Cell> {
        let index: CellIndex = id.as_str().parse().ok()?;
        let center = LatLng::from(index);

        let vertices: Vec<GeoPoint> = index
            .boundary()
            .iter()
            .map(|ll| GeoPoint::new(ll.lat(), ll.lng()))
            .collect();

        Some(Cell {
            id: id.clone(),
            centroid: GeoPoint::new(center.lat(), center.lng()),
            boundary: close_ring(&vertices),
        })
    }
}
