//! Shared setup for commands that talk to the engine or the cache.
//!
//! Loads the config file, installs logging, owns the tokio runtime, and
//! builds the production engine (H3 tessellation, SGP4 propagation, disk
//! cache, HTTP or file element source).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use skycover::cache::{CoverageCacheClient, DiskCacheProvider};
use skycover::clock::SystemClock;
use skycover::config::ConfigFile;
use skycover::engine::CoverageEngine;
use skycover::geometry::{H3Tessellator, Sgp4Propagator};
use skycover::logging::{self, LoggingGuard};
use skycover::satellite::{
    ElementSetSource, FileElementSource, HttpElementSource, SatelliteCatalog,
};
use tokio::runtime::Runtime;
use tracing::info;

use crate::error::CliError;

/// Subdirectory of the cache directory holding coverage entries.
const COVERAGE_DIR: &str = "coverage";

/// Subdirectory of the cache directory holding log files.
const LOG_DIR: &str = "logs";

pub struct CliRunner {
    config: ConfigFile,
    runtime: Runtime,
    _logging: LoggingGuard,
}

impl CliRunner {
    pub fn new(verbose: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;
        let logging = logging::init(Some(&config.cache.directory.join(LOG_DIR)), verbose)?;
        let runtime = Runtime::new().map_err(|e| CliError::Runtime(e.to_string()))?;
        Ok(Self {
            config,
            runtime,
            _logging: logging,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn log_startup(&self, command: &str) {
        info!(
            command,
            version = skycover::VERSION,
            cache_dir = %self.config.cache.directory.display(),
            "SkyCover starting"
        );
    }

    pub fn coverage_dir(&self) -> PathBuf {
        self.config.cache.directory.join(COVERAGE_DIR)
    }

    pub fn open_store(&self) -> Result<Arc<DiskCacheProvider>, CliError> {
        let store = DiskCacheProvider::open(self.coverage_dir(), self.config.cache.max_size_bytes)?;
        Ok(Arc::new(store))
    }

    pub fn cache_client(&self) -> Result<CoverageCacheClient, CliError> {
        let client = CoverageCacheClient::new(self.open_store()?, Arc::new(SystemClock))
            .with_freshness_window_ms(self.config.coverage.freshness_window_ms)
            .with_timeout(Duration::from_secs(self.config.cache.timeout_secs));
        Ok(client)
    }

    pub fn create_engine(&self) -> Result<CoverageEngine, CliError> {
        let clock = Arc::new(SystemClock);
        let source = self.element_source()?;
        info!(source = %source.describe(), "Element-set source");

        let catalog = SatelliteCatalog::new(source, clock.clone())
            .with_max_records(self.config.coverage.max_satellites)
            .with_fetch_timeout(Duration::from_secs(self.config.source.timeout_secs));

        Ok(CoverageEngine::new(
            Arc::new(H3Tessellator::new()),
            Arc::new(Sgp4Propagator::new()),
            Arc::new(catalog),
            self.cache_client()?,
            clock,
        ))
    }

    fn element_source(&self) -> Result<Arc<dyn ElementSetSource>, CliError> {
        let source = &self.config.source;
        match &source.elements_file {
            Some(path) => Ok(Arc::new(FileElementSource::new(path.clone()))),
            None => {
                let http = HttpElementSource::with_timeout(
                    source.url.clone(),
                    Duration::from_secs(source.timeout_secs),
                )?;
                Ok(Arc::new(http))
            }
        }
    }
}
