//! Typed access to configuration settings by `section.key` name.

use std::path::PathBuf;
use std::str::FromStr;

use super::{ConfigError, ConfigFile};

/// A single configuration setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    CoverageInclinationMin,
    CoverageInclinationMax,
    CoverageLimitSatellites,
    CoverageMinutesFromNow,
    CoverageRegionId,
    CoverageResolution,
    CoverageFootprintRadiusKm,
    CoverageMaxSatellites,
    CoveragePreviewSatellites,
    HorizonSteps,
    HorizonStepMinutes,
    CacheDirectory,
    CacheMaxSizeBytes,
    CacheTimeoutSecs,
    CacheFreshnessWindowMs,
    SourceUrl,
    SourceElementsFile,
    SourceTimeoutSecs,
}

impl ConfigKey {
    const ALL: [ConfigKey; 18] = [
        ConfigKey::CoverageInclinationMin,
        ConfigKey::CoverageInclinationMax,
        ConfigKey::CoverageLimitSatellites,
        ConfigKey::CoverageMinutesFromNow,
        ConfigKey::CoverageRegionId,
        ConfigKey::CoverageResolution,
        ConfigKey::CoverageFootprintRadiusKm,
        ConfigKey::CoverageMaxSatellites,
        ConfigKey::CoveragePreviewSatellites,
        ConfigKey::HorizonSteps,
        ConfigKey::HorizonStepMinutes,
        ConfigKey::CacheDirectory,
        ConfigKey::CacheMaxSizeBytes,
        ConfigKey::CacheTimeoutSecs,
        ConfigKey::CacheFreshnessWindowMs,
        ConfigKey::SourceUrl,
        ConfigKey::SourceElementsFile,
        ConfigKey::SourceTimeoutSecs,
    ];

    /// Every key, grouped by section in file order.
    pub fn all() -> impl Iterator<Item = ConfigKey> {
        Self::ALL.into_iter()
    }

    pub fn section(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            CoverageInclinationMin
            | CoverageInclinationMax
            | CoverageLimitSatellites
            | CoverageMinutesFromNow
            | CoverageRegionId
            | CoverageResolution
            | CoverageFootprintRadiusKm
            | CoverageMaxSatellites
            | CoveragePreviewSatellites => "coverage",
            HorizonSteps | HorizonStepMinutes => "horizon",
            CacheDirectory | CacheMaxSizeBytes | CacheTimeoutSecs | CacheFreshnessWindowMs => {
                "cache"
            }
            SourceUrl | SourceElementsFile | SourceTimeoutSecs => "source",
        }
    }

    pub fn key_name(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            CoverageInclinationMin => "inclination_min",
            CoverageInclinationMax => "inclination_max",
            CoverageLimitSatellites => "limit_satellites",
            CoverageMinutesFromNow => "minutes_from_now",
            CoverageRegionId => "region_id",
            CoverageResolution => "resolution",
            CoverageFootprintRadiusKm => "footprint_radius_km",
            CoverageMaxSatellites => "max_satellites",
            CoveragePreviewSatellites => "preview_satellites",
            HorizonSteps => "steps",
            HorizonStepMinutes => "step_minutes",
            CacheDirectory => "directory",
            CacheMaxSizeBytes => "max_size_bytes",
            CacheTimeoutSecs | SourceTimeoutSecs => "timeout_secs",
            CacheFreshnessWindowMs => "freshness_window_ms",
            SourceUrl => "url",
            SourceElementsFile => "elements_file",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as text; empty when an optional setting is unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        use ConfigKey::*;
        let coverage = &config.coverage;
        match self {
            CoverageInclinationMin => coverage.inclination_min.to_string(),
            CoverageInclinationMax => coverage.inclination_max.to_string(),
            CoverageLimitSatellites => coverage.limit_satellites.to_string(),
            CoverageMinutesFromNow => coverage.minutes_from_now.to_string(),
            CoverageRegionId => coverage.region_id.clone(),
            CoverageResolution => coverage.resolution.to_string(),
            CoverageFootprintRadiusKm => coverage.footprint_radius_km.to_string(),
            CoverageMaxSatellites => coverage.max_satellites.to_string(),
            CoveragePreviewSatellites => coverage.preview_satellites.to_string(),
            HorizonSteps => coverage.horizon_steps.to_string(),
            HorizonStepMinutes => coverage.step_minutes.to_string(),
            CacheDirectory => config.cache.directory.display().to_string(),
            CacheMaxSizeBytes => config.cache.max_size_bytes.to_string(),
            CacheTimeoutSecs => config.cache.timeout_secs.to_string(),
            CacheFreshnessWindowMs => coverage.freshness_window_ms.to_string(),
            SourceUrl => config.source.url.clone(),
            SourceElementsFile => config
                .source
                .elements_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            SourceTimeoutSecs => config.source.timeout_secs.to_string(),
        }
    }

    /// Parse `value` and store it.
    ///
    /// Coverage and horizon settings are range-checked against the rest of
    /// the configuration. An empty `source.elements_file` clears it.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        use ConfigKey::*;
        let value = value.trim();
        let coverage = &mut config.coverage;
        match self {
            CoverageInclinationMin => coverage.inclination_min = self.parse(value)?,
            CoverageInclinationMax => coverage.inclination_max = self.parse(value)?,
            CoverageLimitSatellites => coverage.limit_satellites = self.parse_bool(value)?,
            CoverageMinutesFromNow => coverage.minutes_from_now = self.parse(value)?,
            CoverageRegionId => coverage.region_id = value.to_string(),
            CoverageResolution => coverage.resolution = self.parse(value)?,
            CoverageFootprintRadiusKm => coverage.footprint_radius_km = self.parse(value)?,
            CoverageMaxSatellites => coverage.max_satellites = self.parse(value)?,
            CoveragePreviewSatellites => coverage.preview_satellites = self.parse(value)?,
            HorizonSteps => coverage.horizon_steps = self.parse(value)?,
            HorizonStepMinutes => coverage.step_minutes = self.parse(value)?,
            CacheFreshnessWindowMs => coverage.freshness_window_ms = self.parse(value)?,
            CacheDirectory => {
                if value.is_empty() {
                    return Err(ConfigError::invalid(&self.name(), value, "must not be empty"));
                }
                config.cache.directory = PathBuf::from(value);
                return Ok(());
            }
            CacheMaxSizeBytes => {
                config.cache.max_size_bytes = self.parse(value)?;
                return Ok(());
            }
            CacheTimeoutSecs => {
                config.cache.timeout_secs = self.parse_positive(value)?;
                return Ok(());
            }
            SourceUrl => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(ConfigError::invalid(
                        &self.name(),
                        value,
                        "must be an http(s) URL",
                    ));
                }
                config.source.url = value.to_string();
                return Ok(());
            }
            SourceElementsFile => {
                config.source.elements_file =
                    (!value.is_empty()).then(|| PathBuf::from(value));
                return Ok(());
            }
            SourceTimeoutSecs => {
                config.source.timeout_secs = self.parse_positive(value)?;
                return Ok(());
            }
        }
        config.coverage.validate()
    }

    fn parse<T>(&self, value: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        value
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(&self.name(), value, e.to_string()))
    }

    fn parse_positive(&self, value: &str) -> Result<u64, ConfigError> {
        match self.parse::<u64>(value)? {
            0 => Err(ConfigError::invalid(&self.name(), value, "must be positive")),
            n => Ok(n),
        }
    }

    fn parse_bool(&self, value: &str) -> Result<bool, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(ConfigError::invalid(&self.name(), value, "expected true or false")),
        }
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConfigKey::all()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique_and_parse_back() {
        let names: std::collections::HashSet<String> = ConfigKey::all().map(|k| k.name()).collect();
        assert_eq!(names.len(), ConfigKey::ALL.len());
        for key in ConfigKey::all() {
            assert_eq!(key.name().parse::<ConfigKey>().unwrap(), key);
        }
    }

    #[test]
    fn test_unknown_key() {
        assert!(matches!(
            "coverage.colour".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_set_and_get() {
        let mut config = ConfigFile::default();
        ConfigKey::CoverageResolution.set(&mut config, "6").unwrap();
        ConfigKey::CoverageLimitSatellites.set(&mut config, "yes").unwrap();
        ConfigKey::HorizonStepMinutes.set(&mut config, " 30 ").unwrap();

        assert_eq!(config.coverage.resolution, 6);
        assert!(config.coverage.limit_satellites);
        assert_eq!(ConfigKey::HorizonStepMinutes.get(&config), "30");
    }

    #[test]
    fn test_set_rejects_out_of_range() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::CoverageResolution.set(&mut config, "20").is_err());
        assert!(ConfigKey::CoverageInclinationMax.set(&mut config, "-5").is_err());
        assert!(ConfigKey::SourceTimeoutSecs.set(&mut config, "0").is_err());
        assert!(ConfigKey::SourceUrl.set(&mut config, "ftp://example.com").is_err());
        assert!(ConfigKey::CoverageLimitSatellites.set(&mut config, "maybe").is_err());
    }

    #[test]
    fn test_elements_file_can_be_cleared() {
        let mut config = ConfigFile::default();
        ConfigKey::SourceElementsFile.set(&mut config, "/tmp/tle.txt").unwrap();
        assert_eq!(ConfigKey::SourceElementsFile.get(&config), "/tmp/tle.txt");

        ConfigKey::SourceElementsFile.set(&mut config, "").unwrap();
        assert!(config.source.elements_file.is_none());
        assert_eq!(ConfigKey::SourceElementsFile.get(&config), "");
    }

    #[test]
    fn test_sections_in_file_order() {
        let sections: Vec<&str> = ConfigKey::all().map(|k| k.section()).collect();
        let mut deduped = sections.clone();
        deduped.dedup();
        assert_eq!(deduped, vec!["coverage", "horizon", "cache", "source"]);
    }
}
