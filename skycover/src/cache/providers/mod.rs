//! Cache provider implementations.
//!
//! - [`MemoryCacheProvider`]: in-memory LRU cache using moka
//! - [`DiskCacheProvider`]: file-per-key store that survives restarts

mod disk;
mod memory;

pub use disk::DiskCacheProvider;
pub use memory::MemoryCacheProvider;
