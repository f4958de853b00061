//! Great-circle geometry on a spherical Earth.
//!
//! Provides the haversine distance used to decide whether a cell centroid
//! lies inside a satellite footprint, and a conservative bounding box used to
//! skip the trigonometry for cells that are obviously out of reach.

mod types;

pub use types::{
    CoordError, GeoPoint, EARTH_RADIUS_KM, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON,
};

use std::f64::consts::PI;

/// Slack added to bounding boxes so rounding never excludes a point that the
/// haversine test would accept.
const BOUNDS_EPSILON_DEG: f64 = 1e-6;

/// Great-circle distance between two points in kilometers.
///
/// Uses the haversine formula on a mean Earth radius of 6371 km. Non-finite
/// input yields NaN rather than an error; NaN never compares `<=` to a radius,
/// so callers testing footprint membership treat it as "not visible".
#[inline]
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    EARTH_RADIUS_KM * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Latitude/longitude box enclosing a footprint circle.
///
/// The box is a superset of the circle: every point within `radius_km` of the
/// center is inside the box. Points inside the box still need the haversine
/// test. When the circle reaches a pole the box spans every longitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootprintBounds {
    min_lat: f64,
    max_lat: f64,
    center_lon: f64,
    half_width_lon: f64,
}

impl FootprintBounds {
    /// Compute the box around `center` for a footprint of `radius_km`.
    pub fn around(center: &GeoPoint, radius_km: f64) -> Self {
        let delta = radius_km / EARTH_RADIUS_KM;
        if !delta.is_finite() || delta < 0.0 || !center.is_finite() {
            // Nothing can be inside an undefined footprint.
            return Self {
                min_lat: f64::NAN,
                max_lat: f64::NAN,
                center_lon: center.lon,
                half_width_lon: 0.0,
            };
        }

        if delta >= PI {
            return Self::whole_globe(center.lon);
        }

        let delta_deg = delta.to_degrees();
        let min_lat = center.lat - delta_deg - BOUNDS_EPSILON_DEG;
        let max_lat = center.lat + delta_deg + BOUNDS_EPSILON_DEG;

        if min_lat <= MIN_LAT || max_lat >= MAX_LAT {
            return Self {
                min_lat: min_lat.max(MIN_LAT),
                max_lat: max_lat.min(MAX_LAT),
                center_lon: center.lon,
                half_width_lon: 180.0,
            };
        }

        let ratio = delta.sin() / center.lat.to_radians().cos();
        let half_width_lon = if ratio >= 1.0 {
            180.0
        } else {
            ratio.asin().to_degrees() + BOUNDS_EPSILON_DEG
        };

        Self {
            min_lat,
            max_lat,
            center_lon: center.lon,
            half_width_lon,
        }
    }

    fn whole_globe(center_lon: f64) -> Self {
        Self {
            min_lat: MIN_LAT,
            max_lat: MAX_LAT,
            center_lon,
            half_width_lon: 180.0,
        }
    }

    /// Southern edge of the box in degrees.
    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    /// Northern edge of the box in degrees.
    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    /// Returns true if the box spans every longitude.
    pub fn spans_all_longitudes(&self) -> bool {
        self.half_width_lon >= 180.0
    }

    /// Returns true if `point` falls inside the box.
    ///
    /// Longitude comparison wraps across the antimeridian.
    #[inline]
    pub fn contains(&self, point: &GeoPoint) -> bool {
        if !(point.lat >= self.min_lat && point.lat <= self.max_lat) {
            return false;
        }
        if self.spans_all_longitudes() {
            return point.lon.is_finite();
        }

        let mut d_lon = (point.lon - self.center_lon).abs() % 360.0;
        if d_lon > 180.0 {
            d_lon = 360.0 - d_lon;
        }
        d_lon <= self.half_width_lon
    }
}
