//! Cache layer.
//!
//! - [`Cache`]: generic async key-value trait (string keys, byte values)
//! - [`MemoryCacheProvider`] / [`DiskCacheProvider`]: implementations
//! - [`CoverageCacheClient`]: region-keyed coverage results with a
//!   freshness window
//!
//! Only one entry is kept per region; storing a new result overwrites the
//! previous one.

pub mod clients;
pub mod providers;
mod traits;

pub use clients::{
    CacheEntry, CoverageCacheClient, DEFAULT_FRESHNESS_WINDOW_MS, DEFAULT_STORE_TIMEOUT,
};
pub use providers::{DiskCacheProvider, MemoryCacheProvider};
pub use traits::{BoxFuture, Cache, GcResult, ServiceCacheError};
