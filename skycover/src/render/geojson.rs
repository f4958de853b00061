//! GeoJSON render surface.

use std::path::Path;

use serde_json::{json, Value};

use super::{Drawable, RenderSurface};

/// Collects drawables as GeoJSON polygon features.
///
/// Colors are written as simplestyle properties (`stroke`, `fill`,
/// `fill-opacity`, `stroke-width`), which most GeoJSON viewers honor.
#[derive(Debug, Default)]
pub struct GeoJsonSurface {
    features: Vec<Value>,
}

impl GeoJsonSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// The collected features as a `FeatureCollection`.
    pub fn to_feature_collection(&self) -> Value {
        json!({
            "type": "FeatureCollection",
            "features": self.features,
        })
    }

    /// Write the feature collection to `path` as pretty-printed JSON.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&self.to_feature_collection())
            .map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

impl RenderSurface for GeoJsonSurface {
    fn clear(&mut self) {
        self.features.clear();
    }

    fn draw(&mut self, drawable: Drawable) {
        // GeoJSON positions are [lon, lat]
        let ring: Vec<[f64; 2]> = drawable.boundary.iter().map(|p| [p.lon, p.lat]).collect();

        self.features.push(json!({
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [ring],
            },
            "properties": {
                "cell": drawable.cell_id,
                "value": drawable.value,
                "stroke": drawable.stroke_color,
                "stroke-width": drawable.stroke_weight,
                "fill": drawable.fill_color,
                "fill-opacity": drawable.fill_opacity,
            },
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::GeoPoint;
    use crate::geometry::CellId;

    fn drawable() -> Drawable {
        Drawable {
            cell_id: CellId::from("85283473fffffff"),
            boundary: vec![
                GeoPoint::new(10.0, 20.0),
                GeoPoint::new(11.0, 20.0),
                GeoPoint::new(11.0, 21.0),
                GeoPoint::new(10.0, 20.0),
            ],
            stroke_color: "green".to_string(),
            fill_color: "green".to_string(),
            fill_opacity: 0.6,
            stroke_weight: 1.0,
            value: 1.2,
        }
    }

    #[test]
    fn test_feature_uses_lon_lat_order() {
        let mut surface = GeoJsonSurface::new();
        surface.draw(drawable());

        let collection = surface.to_feature_collection();
        let first = &collection["features"][0];
        assert_eq!(first["geometry"]["coordinates"][0][0], json!([20.0, 10.0]));
        assert_eq!(first["properties"]["fill"], "green");
        assert_eq!(first["properties"]["cell"], "85283473fffffff");
    }

    #[test]
    fn test_clear_drops_features() {
        let mut surface = GeoJsonSurface::new();
        surface.draw(drawable());
        surface.clear();
        assert!(surface.is_empty());
        assert_eq!(surface.to_feature_collection()["features"], json!([]));
    }

    #[test]
    fn test_write_to() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coverage.geojson");
        let mut surface = GeoJsonSurface::new();
        surface.draw(drawable());

        surface.write_to(&path).unwrap();
        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["type"], "FeatureCollection");
    }
}
