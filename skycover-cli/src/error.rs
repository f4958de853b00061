//! CLI error type.

use std::fmt;
use std::path::PathBuf;

use skycover::cache::ServiceCacheError;
use skycover::config::ConfigError;
use skycover::coverage::ExportError;
use skycover::engine::EngineError;
use skycover::logging::LoggingError;
use skycover::region::RegionError;
use skycover::satellite::FetchError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Invalid or unusable configuration.
    Config(String),
    /// Region file could not be loaded.
    Region(RegionError),
    /// Coverage run failed.
    Engine(EngineError),
    /// Element-set source could not be set up.
    Source(FetchError),
    /// Cache store failure.
    Cache(ServiceCacheError),
    /// Export document could not be read or written.
    Export(ExportError),
    /// Failed to write an output file.
    Output { path: PathBuf, source: std::io::Error },
    /// Logging or runtime setup failed.
    Runtime(String),
    /// No cached coverage for a region.
    NoCachedCoverage(String),
    /// Run interrupted by Ctrl+C.
    Interrupted,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Region(e) => write!(f, "Region error: {}", e),
            CliError::Engine(e) => write!(f, "Coverage run failed: {}", e),
            CliError::Source(e) => write!(f, "Element-set source error: {}", e),
            CliError::Cache(e) => write!(f, "Cache error: {}", e),
            CliError::Export(e) => write!(f, "Export error: {}", e),
            CliError::Output { path, source } => {
                write!(f, "Failed to write {}: {}", path.display(), source)
            }
            CliError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
            CliError::NoCachedCoverage(region) => write!(
                f,
                "No cached coverage for region '{}'. Run 'skycover run' first.",
                region
            ),
            CliError::Interrupted => write!(f, "Interrupted"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<RegionError> for CliError {
    fn from(e: RegionError) -> Self {
        CliError::Region(e)
    }
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Coverage(skycover::coverage::CoverageError::Cancelled { .. }) => {
                CliError::Interrupted
            }
            EngineError::Config(e) => CliError::Config(e.to_string()),
            other => CliError::Engine(other),
        }
    }
}

impl From<FetchError> for CliError {
    fn from(e: FetchError) -> Self {
        CliError::Source(e)
    }
}

impl From<ServiceCacheError> for CliError {
    fn from(e: ServiceCacheError) -> Self {
        CliError::Cache(e)
    }
}

impl From<ExportError> for CliError {
    fn from(e: ExportError) -> Self {
        CliError::Export(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Runtime(e.to_string())
    }
}
