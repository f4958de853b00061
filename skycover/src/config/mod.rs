//! Configuration.
//!
//! [`CoverageConfig`] holds the parameters of a coverage run. [`ConfigFile`]
//! is the persisted INI form (coverage parameters plus cache and source
//! settings), and [`ConfigKey`] gives the CLI typed get/set access to every
//! setting by `section.key` name.

mod file;
mod keys;

pub use file::{
    config_file_path, default_cache_dir, CacheSettings, ConfigFile, SourceSettings,
    DEFAULT_CACHE_MAX_SIZE,
};
pub use keys::ConfigKey;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::cache::DEFAULT_FRESHNESS_WINDOW_MS;
use crate::coverage::{
    Horizon, SamplerConfig, DEFAULT_FOOTPRINT_RADIUS_KM, DEFAULT_STEPS, DEFAULT_STEP_MINUTES,
};
use crate::geometry::DEFAULT_RESOLUTION;
use crate::render::RenderMode;
use crate::satellite::{InclinationRange, DEFAULT_MAX_RECORDS};

/// Default satellite cap in preview mode.
pub const DEFAULT_PREVIEW_SATELLITES: usize = 800;

/// Default region key.
pub const DEFAULT_REGION_ID: &str = "default";

/// Finest H3 resolution.
const MAX_RESOLUTION: u8 = 15;

/// Most samples a horizon may hold.
pub const MAX_HORIZON_STEPS: usize = 1000;

/// Widest spacing between samples (one week).
pub const MAX_STEP_MINUTES: i64 = 7 * 24 * 60;

/// Furthest the first sample may sit from the run start (one year).
pub const MAX_START_OFFSET_MINUTES: i64 = 366 * 24 * 60;

/// Human-readable byte count, e.g. `1.5 MB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(String),

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parameters of a coverage run.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageConfig {
    /// Lowest satellite inclination considered (degrees).
    pub inclination_min: f64,
    /// Highest satellite inclination considered (degrees).
    pub inclination_max: f64,
    /// Use the preview satellite cap and color scale.
    pub limit_satellites: bool,
    /// Offset of the first sample from the run start.
    pub minutes_from_now: i64,
    /// Cache key for the region.
    ///
    /// Only the region id keys the cache, so a preview run and a full run of
    /// the same region share one entry within the freshness window. Whichever
    /// ran last is served, colored with the current run's scale.
    pub region_id: String,
    /// Tessellation resolution.
    pub resolution: u8,
    pub footprint_radius_km: f64,
    pub freshness_window_ms: i64,
    /// Satellite cap in full mode.
    pub max_satellites: usize,
    /// Satellite cap in preview mode.
    pub preview_satellites: usize,
    pub horizon_steps: usize,
    pub step_minutes: i64,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            inclination_min: 0.0,
            inclination_max: 180.0,
            limit_satellites: false,
            minutes_from_now: 0,
            region_id: DEFAULT_REGION_ID.to_string(),
            resolution: DEFAULT_RESOLUTION,
            footprint_radius_km: DEFAULT_FOOTPRINT_RADIUS_KM,
            freshness_window_ms: DEFAULT_FRESHNESS_WINDOW_MS,
            max_satellites: DEFAULT_MAX_RECORDS,
            preview_satellites: DEFAULT_PREVIEW_SATELLITES,
            horizon_steps: DEFAULT_STEPS,
            step_minutes: DEFAULT_STEP_MINUTES,
        }
    }
}

impl CoverageConfig {
    pub fn with_inclination(mut self, min_deg: f64, max_deg: f64) -> Self {
        self.inclination_min = min_deg;
        self.inclination_max = max_deg;
        self
    }

    pub fn with_limit_satellites(mut self, limit: bool) -> Self {
        self.limit_satellites = limit;
        self
    }

    pub fn with_minutes_from_now(mut self, minutes: i64) -> Self {
        self.minutes_from_now = minutes;
        self
    }

    pub fn with_region_id(mut self, region_id: impl Into<String>) -> Self {
        self.region_id = region_id.into();
        self
    }

    pub fn with_resolution(mut self, resolution: u8) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_footprint_radius_km(mut self, radius_km: f64) -> Self {
        self.footprint_radius_km = radius_km;
        self
    }

    pub fn with_freshness_window_ms(mut self, window_ms: i64) -> Self {
        self.freshness_window_ms = window_ms;
        self
    }

    pub fn with_max_satellites(mut self, max: usize) -> Self {
        self.max_satellites = max;
        self
    }

    pub fn with_preview_satellites(mut self, max: usize) -> Self {
        self.preview_satellites = max;
        self
    }

    pub fn with_horizon(mut self, steps: usize, step_minutes: i64) -> Self {
        self.horizon_steps = steps;
        self.step_minutes = step_minutes;
        self
    }

    /// Satellite cap for the current mode.
    pub fn satellite_cap(&self) -> usize {
        if self.limit_satellites {
            self.preview_satellites
        } else {
            self.max_satellites
        }
    }

    pub fn render_mode(&self) -> RenderMode {
        if self.limit_satellites {
            RenderMode::Preview
        } else {
            RenderMode::Full
        }
    }

    pub fn inclination_range(&self) -> InclinationRange {
        InclinationRange::new(self.inclination_min, self.inclination_max)
    }

    /// Horizon starting at `origin`.
    pub fn horizon(&self, origin: DateTime<Utc>) -> Horizon {
        Horizon::new(origin)
            .with_start_offset_minutes(self.minutes_from_now)
            .with_steps(self.horizon_steps)
            .with_step_minutes(self.step_minutes)
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig::default().with_footprint_radius_km(self.footprint_radius_km)
    }

    /// Check ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let inclination = 0.0..=180.0;
        if !inclination.contains(&self.inclination_min) {
            return Err(ConfigError::invalid(
                "coverage.inclination_min",
                self.inclination_min,
                "must be within 0..=180",
            ));
        }
        if !inclination.contains(&self.inclination_max) {
            return Err(ConfigError::invalid(
                "coverage.inclination_max",
                self.inclination_max,
                "must be within 0..=180",
            ));
        }
        if self.inclination_min > self.inclination_max {
            return Err(ConfigError::invalid(
                "coverage.inclination_min",
                self.inclination_min,
                "must not exceed inclination_max",
            ));
        }
        if self.region_id.trim().is_empty() {
            return Err(ConfigError::invalid(
                "coverage.region_id",
                &self.region_id,
                "must not be empty",
            ));
        }
        if self.resolution > MAX_RESOLUTION {
            return Err(ConfigError::invalid(
                "coverage.resolution",
                self.resolution,
                "must be within 0..=15",
            ));
        }
        if !(self.footprint_radius_km.is_finite() && self.footprint_radius_km > 0.0) {
            return Err(ConfigError::invalid(
                "coverage.footprint_radius_km",
                self.footprint_radius_km,
                "must be a positive number",
            ));
        }
        if self.freshness_window_ms <= 0 {
            return Err(ConfigError::invalid(
                "cache.freshness_window_ms",
                self.freshness_window_ms,
                "must be positive",
            ));
        }
        if !(1..=MAX_STEP_MINUTES).contains(&self.step_minutes) {
            return Err(ConfigError::invalid(
                "horizon.step_minutes",
                self.step_minutes,
                format!("must be within 1..={}", MAX_STEP_MINUTES),
            ));
        }
        if self.horizon_steps > MAX_HORIZON_STEPS {
            return Err(ConfigError::invalid(
                "horizon.steps",
                self.horizon_steps,
                format!("must not exceed {}", MAX_HORIZON_STEPS),
            ));
        }
        if self.minutes_from_now.unsigned_abs() > MAX_START_OFFSET_MINUTES.unsigned_abs() {
            return Err(ConfigError::invalid(
                "coverage.minutes_from_now",
                self.minutes_from_now,
                format!("must be within ±{}", MAX_START_OFFSET_MINUTES),
            ));
        }
        Ok(())
    }
}
