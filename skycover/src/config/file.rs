//! INI configuration file.
//!
//! ```ini
//! [coverage]
//! inclination_min = 0
//! inclination_max = 180
//! region_id = default
//! resolution = 5
//!
//! [horizon]
//! steps = 24
//! step_minutes = 60
//!
//! [cache]
//! directory = ~/.cache/skycover
//! freshness_window_ms = 7200000
//!
//! [source]
//! url = https://celestrak.org/...
//! ```
//!
//! Every setting is read and written through [`ConfigKey`], so the file and
//! the `config get/set` commands accept exactly the same keys and values.

use std::path::{Path, PathBuf};

use ini::Ini;
use tracing::debug;

use super::{ConfigError, ConfigKey, CoverageConfig};
use crate::cache::DEFAULT_STORE_TIMEOUT;
use crate::satellite::{DEFAULT_ELEMENTS_URL, DEFAULT_FETCH_TIMEOUT_SECS};

/// Default disk cache budget (256 MiB).
pub const DEFAULT_CACHE_MAX_SIZE: u64 = 256 * 1024 * 1024;

/// `~/.config/skycover/config.ini` (platform equivalent).
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skycover")
        .join("config.ini")
}

/// `~/.cache/skycover` (platform equivalent).
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skycover")
}

/// `[cache]` settings other than the freshness window.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub directory: PathBuf,
    pub max_size_bytes: u64,
    /// Bound on every store call, in seconds.
    pub timeout_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
            max_size_bytes: DEFAULT_CACHE_MAX_SIZE,
            timeout_secs: DEFAULT_STORE_TIMEOUT.as_secs(),
        }
    }
}

/// `[source]` settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    pub url: String,
    /// Local element-set file used instead of `url` when set.
    pub elements_file: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_ELEMENTS_URL.to_string(),
            elements_file: None,
            timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

/// Persisted configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub coverage: CoverageConfig,
    pub cache: CacheSettings,
    pub source: SourceSettings,
}

impl ConfigFile {
    /// Load from [`config_file_path`]. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`. A missing file yields defaults; unknown keys are
    /// ignored.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(io) => ConfigError::Io(io),
            ini::Error::Parse(parse) => ConfigError::Parse(parse.to_string()),
        })?;

        let mut config = Self::default();
        for key in ConfigKey::all() {
            if let Some(value) = ini.get_from(Some(key.section()), key.key_name()) {
                key.set(&mut config, value)?;
            }
        }
        debug!(path = %path.display(), "Config file loaded");
        Ok(config)
    }

    /// Save to [`config_file_path`].
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Write every setting to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        ini.write_to_file(path)?;
        debug!(path = %path.display(), "Config file saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigFile::load_from(&dir.path().join("absent.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.coverage = config
            .coverage
            .with_region_id("ethiopia")
            .with_inclination(50.0, 60.0)
            .with_limit_satellites(true)
            .with_horizon(12, 30);
        config.cache.directory = dir.path().join("cache");
        config.source.elements_file = Some(dir.path().join("starlink.txt"));
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[horizon]\nsteps = 6\n\n[unknown]\nfoo = bar\n").unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.coverage.horizon_steps, 6);
        assert_eq!(config.coverage.step_minutes, 60);
        assert_eq!(config.source.url, DEFAULT_ELEMENTS_URL);
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[coverage]\nresolution = fine\n").unwrap();

        assert!(matches!(
            ConfigFile::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_config_path_is_named_config_ini() {
        let path = config_file_path();
        assert!(path.ends_with("skycover/config.ini"));
    }
}
