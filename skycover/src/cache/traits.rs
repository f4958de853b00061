//! Core traits for the key-value cache layer.
//!
//! The [`Cache`] trait is a domain-agnostic store: string keys, raw byte
//! values. Domain clients such as
//! [`CoverageCacheClient`](super::CoverageCacheClient) handle key formats and
//! serialization on top of it.
//!
//! Async methods return [`BoxFuture`] so the trait stays dyn-compatible and
//! providers can be shared as `Arc<dyn Cache>`.
//!
//! # Example
//!
//! ```ignore
//! use skycover::cache::{Cache, MemoryCacheProvider};
//!
//! let cache = MemoryCacheProvider::new(64 * 1024 * 1024);
//! cache.set("coverage:ethiopia", bytes).await?;
//! let value = cache.get("coverage:ethiopia").await?;
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Result of a garbage collection pass.
#[derive(Debug, Clone, Default)]
pub struct GcResult {
    /// Entries removed during GC.
    pub entries_removed: usize,
    /// Bytes freed during GC.
    pub bytes_freed: u64,
    /// Wall time of the pass in milliseconds.
    pub duration_ms: u64,
}

impl fmt::Display for GcResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GC: removed {} entries, freed {} bytes in {}ms",
            self.entries_removed, self.bytes_freed, self.duration_ms
        )
    }
}

/// Errors raised by cache providers.
#[derive(Debug, Error)]
pub enum ServiceCacheError {
    /// I/O error in a durable provider.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key is empty or otherwise unusable.
    #[error("Invalid cache key: {0:?}")]
    InvalidKey(String),

    /// Value exceeds the provider's size limit.
    #[error("Value too large: {size} bytes (max: {max})")]
    ValueTooLarge { size: usize, max: u64 },

    /// Provider-specific failure.
    #[error("Provider error: {0}")]
    Provider(String),
}

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Generic key-value store.
///
/// Implementations must be `Send + Sync`; one provider instance is shared by
/// every client and task in the process.
pub trait Cache: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, Result<(), ServiceCacheError>>;

    /// Retrieve the value for `key`, `Ok(None)` when absent.
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, ServiceCacheError>>;

    /// Delete `key`. Returns whether it existed.
    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>>;

    /// Check for `key` without reading its value.
    fn contains(&self, key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>>;

    /// Current stored size in bytes.
    fn size_bytes(&self) -> u64;

    /// Current number of entries.
    fn entry_count(&self) -> u64;

    /// Configured size limit in bytes.
    fn max_size_bytes(&self) -> u64;

    /// Change the size limit. Applies to later writes; stored entries stay.
    fn set_max_size(&self, size_bytes: u64) -> BoxFuture<'_, Result<(), ServiceCacheError>>;

    /// Run a garbage collection pass.
    ///
    /// The memory provider only drops expired entries; the disk provider
    /// removes abandoned temp files and then the oldest entries while over
    /// its limit. Writes never remove other entries.
    fn gc(&self) -> BoxFuture<'_, Result<GcResult, ServiceCacheError>>;
}

/// Reject keys no provider can store.
pub(crate) fn validate_key(key: &str) -> Result<(), ServiceCacheError> {
    if key.trim().is_empty() {
        return Err(ServiceCacheError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gc_result_display() {
        let result = GcResult {
            entries_removed: 3,
            bytes_freed: 2048,
            duration_ms: 7,
        };
        let display = format!("{}", result);
        assert!(display.contains("3 entries"));
        assert!(display.contains("2048"));
        assert!(display.contains("7ms"));
    }

    #[test]
    fn test_cache_error_display() {
        let err = ServiceCacheError::ValueTooLarge { size: 100, max: 50 };
        assert!(format!("{}", err).contains("100"));
        assert!(format!("{}", err).contains("50"));
    }

    #[test]
    fn test_cache_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let cache_err: ServiceCacheError = io_err.into();
        assert!(matches!(cache_err, ServiceCacheError::Io(_)));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("coverage:default").is_ok());
        assert!(matches!(
            validate_key("  "),
            Err(ServiceCacheError::InvalidKey(_))
        ));
    }
}
