//! SGP4 propagation to sub-satellite points.
//!
//! Element sets are turned into SGP4 models lazily, once per element set,
//! and reused for every time sample. Positions come out of SGP4 in the TEME
//! frame; they are rotated into an Earth-fixed frame by Greenwich mean
//! sidereal time (IAU 1982) and converted to WGS-84 geodetic latitude and
//! longitude.

use std::f64::consts::TAU;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use dashmap::DashMap;
use tracing::warn;

use super::{GeometryError, Propagator};
use crate::coord::GeoPoint;
use crate::satellite::SatelliteRecord;

/// WGS-84 equatorial radius (km).
const WGS84_A: f64 = 6378.137;
/// WGS-84 polar radius (km).
const WGS84_B: f64 = 6356.752_314_2;

/// Julian date of the Unix epoch.
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
/// Julian date of J2000.0.
const J2000_JD: f64 = 2_451_545.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

const GEODETIC_ITERATIONS: usize = 20;

struct Sgp4Model {
    epoch: NaiveDateTime,
    constants: sgp4::Constants,
}

/// Propagator backed by the `sgp4` crate.
///
/// Models are cached by element-set line 1 (catalog number plus epoch). A set
/// that SGP4 rejects is cached as `None` and logged once.
#[derive(Default)]
pub struct Sgp4Propagator {
    models: DashMap<String, Option<Arc<Sgp4Model>>>,
}

impl Sgp4Propagator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of element sets seen so far (including rejected ones).
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    fn model_for(&self, satellite: &SatelliteRecord) -> Option<Arc<Sgp4Model>> {
        let key = satellite.elements().line1();
        if let Some(entry) = self.models.get(key) {
            return entry.value().clone();
        }

        let model = match build_model(satellite) {
            Ok(model) => Some(Arc::new(model)),
            Err(e) => {
                warn!(satellite = %satellite.name(), error = %e, "Failed to initialize SGP4 model");
                None
            }
        };
        self.models.insert(key.to_string(), model.clone());
        model
    }
}

impl Propagator for Sgp4Propagator {
    fn propagate(&self, satellite: &SatelliteRecord, at: DateTime<Utc>) -> Option<GeoPoint> {
        let model = self.model_for(satellite)?;

        let minutes = (at.naive_utc() - model.epoch).num_milliseconds() as f64 / 60_000.0;
        let prediction = model
            .constants
            .propagate(sgp4::MinutesSinceEpoch(minutes))
            .ok()?;

        let point = teme_to_geodetic(prediction.position, gmst_radians(at));
        point.is_finite().then_some(point)
    }
}

fn build_model(satellite: &SatelliteRecord) -> Result<Sgp4Model, GeometryError> {
    let elements = satellite.elements();
    let parsed = sgp4::Elements::from_tle(
        Some(satellite.name().to_string()),
        elements.line1().as_bytes(),
        elements.line2().as_bytes(),
    )
    .map_err(|e| GeometryError::Propagation(e.to_string()))?;
    let constants = sgp4::Constants::from_elements(&parsed)
        .map_err(|e| GeometryError::Propagation(e.to_string()))?;

    Ok(Sgp4Model {
        epoch: parsed.datetime,
        constants,
    })
}

/// Greenwich mean sidereal time (IAU 1982) in radians.
fn gmst_radians(at: DateTime<Utc>) -> f64 {
    let jd = at.timestamp_millis() as f64 / (SECONDS_PER_DAY * 1000.0) + UNIX_EPOCH_JD;
    let t = (jd - J2000_JD) / 36_525.0;

    let seconds = 67_310.548_41 + (876_600.0 * 3600.0 + 8_640_184.812_866) * t
        + 0.093_104 * t * t
        - 6.2e-6 * t * t * t;

    (seconds / SECONDS_PER_DAY * TAU).rem_euclid(TAU)
}

/// Rotate a TEME position into Earth-fixed axes and convert to geodetic.
fn teme_to_geodetic(position: [f64; 3], gmst: f64) -> GeoPoint {
    let (sin_t, cos_t) = gmst.sin_cos();
    let x = cos_t * position[0] + sin_t * position[1];
    let y = -sin_t * position[0] + cos_t * position[1];
    let z = position[2];

    let lon = y.atan2(x);
    let r = x.hypot(y);

    let f = (WGS84_A - WGS84_B) / WGS84_A;
    let e2 = 2.0 * f - f * f;

    let mut lat = z.atan2(r);
    for _ in 0..GEODETIC_ITERATIONS {
        let sin_lat = lat.sin();
        let c = 1.0 / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        lat = (z + WGS84_A * c * e2 * sin_lat).atan2(r);
    }

    GeoPoint::new(lat.to_degrees(), lon.to_degrees())
}
