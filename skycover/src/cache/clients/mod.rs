//! Domain-specific cache clients.
//!
//! Clients wrap the generic [`Cache`](super::Cache) with key translation
//! and encoding for one kind of value.
//!
//! ```text
//! ┌─────────────────────────────┐
//! │    CoverageCacheClient      │
//! │                             │
//! │ region → "coverage:{region}"│
//! │ Aggregate ⇄ JSON CacheEntry │
//! │ freshness window, timeout   │
//! └──────────────┬──────────────┘
//!                ▼
//! ┌─────────────────────────────┐
//! │       Arc<dyn Cache>        │
//! │  string → Vec<u8> store     │
//! └─────────────────────────────┘
//! ```

mod coverage;

pub use coverage::{
    CacheEntry, CoverageCacheClient, DEFAULT_FRESHNESS_WINDOW_MS, DEFAULT_STORE_TIMEOUT,
};
