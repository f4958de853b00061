//! Coverage cache client.
//!
//! Wraps a generic [`Cache`] with:
//! - Key translation: region key → `"coverage:{region}"`
//! - JSON encoding of a timestamped [`CacheEntry`]
//! - Freshness: an entry is served only while younger than the window
//!
//! Store failures never reach the caller. A failed or timed-out read, or a
//! payload that does not decode, is logged and reported as a miss; a failed
//! write is logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::traits::Cache;
use crate::clock::Clock;
use crate::coverage::Aggregate;

/// Default freshness window: 2 hours.
pub const DEFAULT_FRESHNESS_WINDOW_MS: i64 = 2 * 60 * 60 * 1000;

/// Default bound on a single store operation.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// One stored coverage result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub region_key: String,
    pub aggregate: Aggregate,
    /// Milliseconds since the Unix epoch when the result was stored.
    pub timestamp_ms: i64,
}

impl CacheEntry {
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.timestamp_ms
    }

    /// Fresh iff strictly younger than `window_ms`.
    pub fn is_fresh(&self, now_ms: i64, window_ms: i64) -> bool {
        self.age_ms(now_ms) < window_ms
    }
}

/// Region-keyed coverage cache with freshness.
pub struct CoverageCacheClient {
    cache: Arc<dyn Cache>,
    clock: Arc<dyn Clock>,
    freshness_window_ms: i64,
    timeout: Duration,
}

impl CoverageCacheClient {
    pub fn new(cache: Arc<dyn Cache>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache,
            clock,
            freshness_window_ms: DEFAULT_FRESHNESS_WINDOW_MS,
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_freshness_window_ms(mut self, window_ms: i64) -> Self {
        self.freshness_window_ms = window_ms;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn freshness_window_ms(&self) -> i64 {
        self.freshness_window_ms
    }

    /// Fresh aggregate for `region_key`, or `None`.
    pub async fn get(&self, region_key: &str) -> Option<Aggregate> {
        let entry = self.entry(region_key).await?;
        let now_ms = self.clock.now_millis();

        if entry.is_fresh(now_ms, self.freshness_window_ms) {
            debug!(region = %region_key, age_ms = entry.age_ms(now_ms), "Coverage cache hit");
            Some(entry.aggregate)
        } else {
            debug!(region = %region_key, age_ms = entry.age_ms(now_ms), "Coverage cache entry is stale");
            None
        }
    }

    /// Stored entry for `region_key` regardless of age.
    pub async fn entry(&self, region_key: &str) -> Option<CacheEntry> {
        let key = Self::region_to_key(region_key);

        let bytes = match tokio::time::timeout(self.timeout, self.cache.get(&key)).await {
            Ok(Ok(Some(bytes))) => bytes,
            Ok(Ok(None)) => return None,
            Ok(Err(e)) => {
                warn!(error = %e, key = %key, "Coverage cache get failed");
                return None;
            }
            Err(_) => {
                warn!(key = %key, timeout = ?self.timeout, "Coverage cache get timed out");
                return None;
            }
        };

        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) if entry.region_key == region_key => Some(entry),
            Ok(entry) => {
                warn!(key = %key, stored = %entry.region_key, "Coverage cache entry belongs to another region");
                None
            }
            Err(e) => {
                warn!(error = %e, key = %key, "Coverage cache entry failed to decode");
                None
            }
        }
    }

    /// Store `aggregate` for `region_key`, stamped with the current time.
    pub async fn put(&self, region_key: &str, aggregate: &Aggregate) {
        let key = Self::region_to_key(region_key);
        let entry = CacheEntry {
            region_key: region_key.to_string(),
            aggregate: aggregate.clone(),
            timestamp_ms: self.clock.now_millis(),
        };

        let bytes = match serde_json::to_vec(&entry) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, key = %key, "Coverage cache entry failed to encode");
                return;
            }
        };

        match tokio::time::timeout(self.timeout, self.cache.set(&key, bytes)).await {
            Ok(Ok(())) => debug!(region = %region_key, cells = aggregate.len(), "Coverage cached"),
            Ok(Err(e)) => warn!(error = %e, key = %key, "Coverage cache set failed"),
            Err(_) => warn!(key = %key, timeout = ?self.timeout, "Coverage cache set timed out"),
        }
    }

    /// Remove the entry for `region_key`. Returns whether one existed.
    pub async fn invalidate(&self, region_key: &str) -> bool {
        let key = Self::region_to_key(region_key);
        match tokio::time::timeout(self.timeout, self.cache.delete(&key)).await {
            Ok(Ok(existed)) => existed,
            Ok(Err(e)) => {
                warn!(error = %e, key = %key, "Coverage cache delete failed");
                false
            }
            Err(_) => {
                warn!(key = %key, timeout = ?self.timeout, "Coverage cache delete timed out");
                false
            }
        }
    }

    /// Format: `coverage:{region_key}`
    pub fn region_to_key(region_key: &str) -> String {
        format!("coverage:{}", region_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::traits::{BoxFuture, GcResult, ServiceCacheError};
    use crate::cache::MemoryCacheProvider;
    use crate::clock::ManualClock;
    use crate::coverage::CellCoverage;
    use crate::geometry::CellId;
    use chrono::TimeZone;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            chrono::Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ))
    }

    fn aggregate() -> Aggregate {
        vec![
            (
                CellId::from("85283473fffffff"),
                CellCoverage {
                    average: 0.1 + 0.2,
                    stability: 1.0 / 3.0,
                },
            ),
            (CellId::from("8528347bfffffff"), CellCoverage::UNCOVERED),
        ]
        .into_iter()
        .collect()
    }

    /// Store whose every operation fails.
    struct BrokenCache;

    impl Cache for BrokenCache {
        fn set(&self, _key: &str, _value: Vec<u8>) -> BoxFuture<'_, Result<(), ServiceCacheError>> {
            Box::pin(async { Err(ServiceCacheError::Provider("disk full".to_string())) })
        }
        fn get(&self, _key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, ServiceCacheError>> {
            Box::pin(async { Err(ServiceCacheError::Provider("unreadable".to_string())) })
        }
        fn delete(&self, _key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>> {
            Box::pin(async { Err(ServiceCacheError::Provider("unreadable".to_string())) })
        }
        fn contains(&self, _key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>> {
            Box::pin(async { Ok(false) })
        }
        fn size_bytes(&self) -> u64 {
            0
        }
        fn entry_count(&self) -> u64 {
            0
        }
        fn max_size_bytes(&self) -> u64 {
            0
        }
        fn set_max_size(&self, _size_bytes: u64) -> BoxFuture<'_, Result<(), ServiceCacheError>> {
            Box::pin(async { Ok(()) })
        }
        fn gc(&self) -> BoxFuture<'_, Result<GcResult, ServiceCacheError>> {
            Box::pin(async { Ok(GcResult::default()) })
        }
    }

    /// Store that never answers a read in time.
    struct StalledCache;

    impl Cache for StalledCache {
        fn set(&self, _key: &str, _value: Vec<u8>) -> BoxFuture<'_, Result<(), ServiceCacheError>> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
        }
        fn get(&self, _key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, ServiceCacheError>> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(None)
            })
        }
        fn delete(&self, _key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>> {
            Box::pin(async { Ok(false) })
        }
        fn contains(&self, _key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>> {
            Box::pin(async { Ok(false) })
        }
        fn size_bytes(&self) -> u64 {
            0
        }
        fn entry_count(&self) -> u64 {
            0
        }
        fn max_size_bytes(&self) -> u64 {
            0
        }
        fn set_max_size(&self, _size_bytes: u64) -> BoxFuture<'_, Result<(), ServiceCacheError>> {
            Box::pin(async { Ok(()) })
        }
        fn gc(&self) -> BoxFuture<'_, Result<GcResult, ServiceCacheError>> {
            Box::pin(async { Ok(GcResult::default()) })
        }
    }

    #[test]
    fn test_key_format() {
        assert_eq!(
            CoverageCacheClient::region_to_key("ethiopia"),
            "coverage:ethiopia"
        );
    }

    #[test]
    fn test_entry_freshness_is_strict() {
        let entry = CacheEntry {
            region_key: "default".to_string(),
            aggregate: Aggregate::new(),
            timestamp_ms: 1_000,
        };
        assert!(entry.is_fresh(1_000 + DEFAULT_FRESHNESS_WINDOW_MS - 1, DEFAULT_FRESHNESS_WINDOW_MS));
        assert!(!entry.is_fresh(1_000 + DEFAULT_FRESHNESS_WINDOW_MS, DEFAULT_FRESHNESS_WINDOW_MS));
    }

    #[tokio::test]
    async fn test_put_then_get_round_trips_exactly() {
        let client = CoverageCacheClient::new(Arc::new(MemoryCacheProvider::new(1 << 20)), clock());

        client.put("default", &aggregate()).await;
        assert_eq!(client.get("default").await, Some(aggregate()));
    }

    #[tokio::test]
    async fn test_entry_goes_stale_after_window() {
        let clock = clock();
        let client =
            CoverageCacheClient::new(Arc::new(MemoryCacheProvider::new(1 << 20)), clock.clone());
        client.put("default", &aggregate()).await;

        clock.advance(chrono::Duration::minutes(119));
        assert!(client.get("default").await.is_some());

        clock.advance(chrono::Duration::minutes(1));
        assert!(client.get("default").await.is_none());
        assert!(client.entry("default").await.is_some(), "stale entry is kept");
    }

    #[tokio::test]
    async fn test_regions_are_independent() {
        let client = CoverageCacheClient::new(Arc::new(MemoryCacheProvider::new(1 << 20)), clock());
        client.put("kenya", &aggregate()).await;

        assert!(client.get("ethiopia").await.is_none());
        assert!(client.get("kenya").await.is_some());
    }

    #[tokio::test]
    async fn test_store_errors_are_misses() {
        let client = CoverageCacheClient::new(Arc::new(BrokenCache), clock());

        client.put("default", &aggregate()).await;
        assert!(client.get("default").await.is_none());
        assert!(!client.invalidate("default").await);
    }

    #[tokio::test]
    async fn test_store_timeouts_are_misses() {
        let client = CoverageCacheClient::new(Arc::new(StalledCache), clock())
            .with_timeout(Duration::from_millis(20));

        client.put("default", &aggregate()).await;
        assert!(client.get("default").await.is_none());
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_a_miss() {
        let cache = Arc::new(MemoryCacheProvider::new(1 << 20));
        cache
            .set("coverage:default", b"{not json".to_vec())
            .await
            .unwrap();
        let client = CoverageCacheClient::new(cache, clock());

        assert!(client.get("default").await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate() {
        let client = CoverageCacheClient::new(Arc::new(MemoryCacheProvider::new(1 << 20)), clock());
        client.put("default", &aggregate()).await;

        assert!(client.invalidate("default").await);
        assert!(client.get("default").await.is_none());
        assert!(!client.invalidate("default").await);
    }

    #[tokio::test]
    async fn test_custom_freshness_window() {
        let clock = clock();
        let client =
            CoverageCacheClient::new(Arc::new(MemoryCacheProvider::new(1 << 20)), clock.clone())
                .with_freshness_window_ms(60_000);
        client.put("default", &aggregate()).await;

        clock.advance(chrono::Duration::seconds(61));
        assert!(client.get("default").await.is_none());
    }
}
