//! Region boundaries loaded from GeoJSON.
//!
//! A region file is a GeoJSON `FeatureCollection` (a lone `Feature` is also
//! accepted). Every `Polygon` and `MultiPolygon` feature contributes its
//! outer rings; holes are ignored. Features without geometry, with another
//! geometry type, or with malformed rings are logged and skipped.
//!
//! Positions are read in GeoJSON order, `[lon, lat]`. Files that store
//! `[lat, lon]` are handled later by the tessellation axis-swap retry.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::coord::GeoPoint;
use crate::geometry::{RegionBoundary, Ring};

/// Errors loading a region.
#[derive(Debug, Error)]
pub enum RegionError {
    #[error("failed to read region file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid GeoJSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON contains no features")]
    NoFeatures,

    #[error("GeoJSON contains no usable polygon rings")]
    NoPolygons,
}

/// A named region and its outer boundary rings.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    pub boundary: RegionBoundary,
}

impl Region {
    pub fn new(name: impl Into<String>, boundary: RegionBoundary) -> Self {
        Self {
            name: name.into(),
            boundary,
        }
    }

    /// Load a region file. The region name is the file stem.
    pub fn load(path: &Path) -> Result<Self, RegionError> {
        let text = std::fs::read_to_string(path).map_err(|source| RegionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("region")
            .to_string();

        let region = Self::from_geojson_str(name, &text)?;
        info!(
            path = %path.display(),
            region = %region.name,
            rings = region.boundary.rings().len(),
            "Region loaded"
        );
        Ok(region)
    }

    /// Parse GeoJSON text into a region called `name`.
    pub fn from_geojson_str(name: impl Into<String>, text: &str) -> Result<Self, RegionError> {
        let document: Value = serde_json::from_str(text)?;

        let features: Vec<&Value> = match document.get("type").and_then(Value::as_str) {
            Some("Feature") => vec![&document],
            _ => document
                .get("features")
                .and_then(Value::as_array)
                .map(|f| f.iter().collect())
                .unwrap_or_default(),
        };
        if features.is_empty() {
            return Err(RegionError::NoFeatures);
        }

        let rings: Vec<Ring> = features
            .iter()
            .enumerate()
            .flat_map(|(index, feature)| feature_rings(index, feature))
            .collect();

        match rings.len() {
            0 => Err(RegionError::NoPolygons),
            1 => Ok(Self::new(
                name,
                RegionBoundary::Polygon(rings.into_iter().next().unwrap_or_default()),
            )),
            _ => Ok(Self::new(name, RegionBoundary::MultiPolygon(rings))),
        }
    }
}

/// Outer rings of one feature; empty if the feature is skipped.
fn feature_rings(index: usize, feature: &Value) -> Vec<Ring> {
    let Some(geometry) = feature.get("geometry").filter(|g| !g.is_null()) else {
        warn!(feature = index, "Skipping feature: missing geometry");
        return Vec::new();
    };
    let Some(coordinates) = geometry.get("coordinates").filter(|c| c.is_array()) else {
        warn!(feature = index, "Skipping feature: missing coordinates");
        return Vec::new();
    };

    let geometry_type = geometry.get("type").and_then(Value::as_str).unwrap_or("");
    let polygons: Vec<&Value> = match geometry_type {
        "Polygon" => vec![coordinates],
        "MultiPolygon" => coordinates.as_array().into_iter().flatten().collect(),
        other => {
            warn!(feature = index, geometry_type = other, "Skipping feature: unsupported geometry type");
            return Vec::new();
        }
    };

    polygons
        .iter()
        .enumerate()
        .filter_map(|(polygon, value)| {
            let outer = value.as_array().and_then(|rings| rings.first());
            match outer.and_then(parse_ring) {
                Some(ring) => {
                    debug!(feature = index, polygon, vertices = ring.len(), "Outer ring read");
                    Some(ring)
                }
                None => {
                    warn!(feature = index, polygon, "Skipping polygon: outer ring is invalid");
                    None
                }
            }
        })
        .collect()
}

/// Parse `[[lon, lat], ...]`. Any malformed position rejects the ring.
fn parse_ring(value: &Value) -> Option<Ring> {
    let positions = value.as_array()?;
    if positions.is_empty() {
        return None;
    }
    positions
        .iter()
        .map(|position| {
            let pair = position.as_array()?;
            let lon = pair.first()?.as_f64()?;
            let lat = pair.get(1)?.as_f64()?;
            Some(GeoPoint::new(lat, lon))
        })
        .collect()
}
